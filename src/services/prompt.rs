//! Instruction text for every generation step.
//!
//! All builders are pure: the same inputs always produce the same text.

use crate::core::catalog::FixtureCatalog;
use crate::core::state::{CastContext, StoryBrief};
use serde_json::json;

pub const NOVELIST_SYSTEM: &str = "You are a bestselling Star Wars novelist. Write vivid, original prose.";
pub const EDITOR_SYSTEM: &str = "You are a precise story editor. Answer exactly in the requested format.";

/// Categories offered to the model when choosing the cast.
const SELECTION_CATEGORIES: &[&str] = &["people", "planets", "starships", "films"];

pub fn selection_prompt(brief: &StoryBrief, catalog: &FixtureCatalog) -> String {
    let mut summary = serde_json::Map::new();
    for category in SELECTION_CATEGORIES {
        summary.insert(category.to_string(), json!(catalog.names(category)));
    }
    let available = serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "{}".to_string());

    format!(
        r#"Based on the user's story prompt, select a small, coherent set of entities from the provided JSON data.
This will be the "cast" for the entire novel. Choose a few main characters, a primary setting (planet), and a few relevant starships.

USER PROMPT: "{prompt}"

AVAILABLE DATA:
{available}

Your task:
Respond with a JSON object containing the *names* of the entities to use.
The JSON object should have keys: "people", "planets", "starships".
Example Response:
{{
  "people": ["Luke Skywalker", "Darth Vader", "Leia Organa"],
  "planets": ["Tatooine", "Alderaan"],
  "starships": ["X-wing", "TIE Advanced x1"]
}}
"#,
        prompt = brief.prompt,
        available = available,
    )
}

fn cast_sentence(cast: &CastContext) -> String {
    let people = cast.names("people");
    let planets = cast.names("planets");
    if people.is_empty() && planets.is_empty() {
        return String::new();
    }
    format!(
        "The story will feature: {} on the planet {}.",
        people.join(", "),
        planets.join(", ")
    )
}

pub fn book_title_prompt(brief: &StoryBrief) -> String {
    format!(
        "Generate a short, creative, and evocative book title for a Star Wars story about: '{}'.\n\
         The title should sound like a real novel. Do not include 'Star Wars:' in the title itself.\n\
         Only return the title, with no extra text or quotation marks.",
        brief.prompt
    )
}

pub fn chapter_titles_prompt(brief: &StoryBrief, count: u32, cast: &CastContext) -> String {
    format!(
        "I am writing a {count}-chapter Star Wars novel about: '{prompt}'.\n\
         {featuring}\n\
         CAST (JSON):\n{cast}\n\
         Please generate a list of {count} creative and sequential chapter titles for this story.\n\
         Return them as a numbered list (e.g., '1. The Awakening', '2. A Fading Hope').",
        count = count,
        prompt = brief.prompt,
        featuring = cast_sentence(cast),
        cast = cast.to_prompt_json(),
    )
}

pub fn section_prompt(
    brief: &StoryBrief,
    block_title: &str,
    previous_summary: &str,
    cast: &CastContext,
    word_target: u32,
) -> String {
    let style = match brief.writing_sample.as_deref().map(str::trim) {
        Some(sample) if !sample.is_empty() => format!(
            "\nSTYLE GUIDE: Match the voice, rhythm and vocabulary of this writing sample without copying it:\n\"\"\"\n{}\n\"\"\"\n",
            sample
        ),
        _ => String::new(),
    };

    format!(
        r#"You are a novelist writing a Star Wars story in the second person ("You feel...", "You see...").
Your task is to write a single, detailed section of the novel.

**CRITICAL INSTRUCTION: You MUST base your writing *exclusively* on the data provided in the "DATA CONTEXT" section. Do not invent new characters, planets, or major technologies. Weave the provided data into a narrative.**

STORY THEME: "{prompt}"
CURRENT CHAPTER: "{block_title}"
CONTINUITY: The previous section of the story concluded with the following events: "{previous_summary}"
{style}
DATA CONTEXT (Your only source of truth for names, places, and specs):
---
{cast}
---

Your task:
Write the next section of the chapter, continuing from the summary. Make it detailed, descriptive, and approximately {word_target} words long.
Begin writing the content directly. Do not repeat the chapter title.
"#,
        prompt = brief.prompt,
        block_title = block_title,
        previous_summary = previous_summary,
        style = style,
        cast = cast.to_prompt_json(),
        word_target = word_target,
    )
}

pub fn summary_prompt(section_text: &str) -> String {
    format!(
        "Summarize the following block of text in 2-3 sentences. Focus on the key actions, character movements, \
         and plot developments. This summary will be used as a continuity guide for the next block of writing.\n\n\
         TEXT TO SUMMARIZE:\n---\n{}\n---\n",
        section_text
    )
}

pub fn cover_prompt(brief: &StoryBrief, title: &str, cast: &CastContext) -> String {
    let mut subjects: Vec<&str> = cast.names("people");
    subjects.extend(cast.names("planets"));
    subjects.extend(cast.names("starships"));
    let subjects = if subjects.is_empty() {
        "an original scene".to_string()
    } else {
        subjects.join(", ")
    };

    format!(
        "Dramatic, painterly book cover illustration for a Star Wars novel titled \"{}\". \
         Story premise: {}. Featuring {}. Cinematic lighting, rich color, no text or lettering.",
        title, brief.prompt, subjects
    )
}
