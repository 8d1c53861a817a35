use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One fixture record. Free-form fields; at minimum a `name` or `title`.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct Entity(pub serde_json::Map<String, serde_json::Value>);

impl Entity {
    pub fn display_name(&self) -> Option<&str> {
        self.0
            .get("name")
            .or_else(|| self.0.get("title"))
            .and_then(|v| v.as_str())
    }
}

/// Entities chosen as canon for one story, keyed by category.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct CastContext {
    pub categories: BTreeMap<String, Vec<Entity>>,
}

impl CastContext {
    pub fn names(&self, category: &str) -> Vec<&str> {
        self.categories
            .get(category)
            .map(|items| items.iter().filter_map(Entity::display_name).collect())
            .unwrap_or_default()
    }

    pub fn len(&self, category: &str) -> usize {
        self.categories.get(category).map_or(0, Vec::len)
    }

    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.categories).unwrap_or_else(|_| "{}".to_string())
    }
}

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct ContentBlock {
    pub title: String,
    pub body: String,
}

/// Raw diagnostic text carried through to the document's first pages.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct TraceEntry {
    pub label: String,
    pub text: String,
}

/// The user's request as seen by every prompt.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct StoryBrief {
    pub prompt: String,
    pub writing_sample: Option<String>,
}

impl StoryBrief {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            writing_sample: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BookManuscript {
    pub title: String,
    pub cover_image: Option<String>,
    pub prologue: ContentBlock,
    pub chapters: Vec<ContentBlock>,
    pub epilogue: ContentBlock,
    pub trace: Vec<TraceEntry>,
}

impl BookManuscript {
    /// All blocks in reading order.
    pub fn blocks(&self) -> impl Iterator<Item = &ContentBlock> {
        std::iter::once(&self.prologue)
            .chain(self.chapters.iter())
            .chain(std::iter::once(&self.epilogue))
    }

    /// Plain-text rendition: `## Heading` followed by the body, per block.
    pub fn to_text(&self) -> String {
        self.blocks()
            .map(|b| format!("## {}\n\n{}", b.title, b.body))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
