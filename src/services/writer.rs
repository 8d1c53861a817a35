use crate::core::catalog::FixtureCatalog;
use crate::core::io::Storage;
use crate::core::state::{BookManuscript, CastContext, ContentBlock, StoryBrief, TraceEntry};
use crate::services::cast::CastSelector;
use crate::services::chain::SectionChain;
use crate::services::image::ImageGenerator;
use crate::services::llm::{ChatOptions, LlmClient};
use crate::services::pacing::PacingPolicy;
use crate::services::prompt;
use anyhow::Result;
use log::{info, warn};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

pub const TITLE_OPTIONS: ChatOptions = ChatOptions::new(0.8).with_max_tokens(20);
/// Per-chapter token allowance for the chapter title list.
pub const CHAPTER_TITLE_TOKENS: u32 = 60;

pub const PROLOGUE: &str = "Prologue";
pub const EPILOGUE: &str = "Epilogue";
pub const UNTITLED: &str = "Untitled";

static NUMBERED_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\d+[.)][ \t]*(.+?)[ \t]*$").expect("valid regex"));

/// Trims the model's title answer down to a bare title.
pub fn clean_title(raw: &str) -> String {
    let first_line = raw.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let stripped: String = first_line
        .chars()
        .filter(|c| !matches!(c, '"' | '#' | '\u{201C}' | '\u{201D}'))
        .collect();
    let title = stripped.trim().trim_matches(['\'', '*']).trim();
    if title.is_empty() {
        UNTITLED.to_string()
    } else {
        title.to_string()
    }
}

/// Reads `N. Title` lines; the result always has exactly `count` entries.
pub fn parse_chapter_titles(raw: &str, count: u32) -> Vec<String> {
    let count = count as usize;
    let mut titles: Vec<String> = NUMBERED_LINE_RE
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim_matches(['"', '*']).trim().to_string())
        .filter(|t| !t.is_empty())
        .take(count)
        .collect();

    for i in titles.len()..count {
        titles.push(format!("Chapter {}", i + 1));
    }
    titles
}

/// Everything that depends only on the cast and title, produced concurrently.
#[derive(Debug, Clone)]
pub struct IndependentParts {
    pub cover_image: Option<String>,
    pub prologue: String,
    pub epilogue: String,
    pub chapter_titles: Vec<String>,
}

/// Drives one manuscript from brief to finished blocks.
pub struct BookWriter<'a> {
    llm: &'a dyn LlmClient,
    image: Option<&'a dyn ImageGenerator>,
    storage: &'a dyn Storage,
    catalog: &'a FixtureCatalog,
    policy: &'a PacingPolicy,
    image_folder: &'a str,
}

impl<'a> BookWriter<'a> {
    pub fn new(
        llm: &'a dyn LlmClient,
        image: Option<&'a dyn ImageGenerator>,
        storage: &'a dyn Storage,
        catalog: &'a FixtureCatalog,
        policy: &'a PacingPolicy,
        image_folder: &'a str,
    ) -> Self {
        Self {
            llm,
            image,
            storage,
            catalog,
            policy,
            image_folder,
        }
    }

    pub async fn write(&self, brief: &StoryBrief, pages: u32) -> Result<BookManuscript> {
        info!("Step 1: selecting the cast");
        let selection = CastSelector::new(self.llm, self.catalog).select(brief).await?;
        let cast = &selection.context;

        info!("Step 2: generating the book title");
        let title = self.book_title(brief).await?;
        info!("Book title: {}", title);

        let plan = self.policy.plan(pages);
        info!(
            "Step 3: {} pages -> {} chapters of ~{} words",
            pages, plan.chapter_count, plan.words_per_chapter
        );

        info!("Step 4: cover, prologue, epilogue and chapter titles");
        let chain = SectionChain::new(self.llm, self.policy);
        let (cover_image, prologue, epilogue, chapter_titles) = tokio::try_join!(
            self.cover(brief, &title, cast),
            chain.generate(brief, PROLOGUE, cast, self.policy.prologue_words),
            chain.generate(brief, EPILOGUE, cast, self.policy.epilogue_words),
            self.chapter_titles(brief, plan.chapter_count, cast),
        )?;
        let parts = IndependentParts {
            cover_image,
            prologue,
            epilogue,
            chapter_titles,
        };

        info!("Step 5: writing {} chapters", parts.chapter_titles.len());
        let mut chapters = Vec::with_capacity(parts.chapter_titles.len());
        for (i, chapter_title) in parts.chapter_titles.iter().enumerate() {
            let heading = format!("Chapter - {}: {}", i + 1, chapter_title);
            let body = chain.generate(brief, &heading, cast, plan.words_per_chapter).await?;
            chapters.push(ContentBlock { title: heading, body });
        }

        info!("Step 6: assembling '{}'", title);
        Ok(BookManuscript {
            title,
            cover_image: parts.cover_image,
            prologue: ContentBlock {
                title: PROLOGUE.to_string(),
                body: parts.prologue,
            },
            chapters,
            epilogue: ContentBlock {
                title: EPILOGUE.to_string(),
                body: parts.epilogue,
            },
            trace: vec![
                TraceEntry {
                    label: "Cast selection request".to_string(),
                    text: selection.request,
                },
                TraceEntry {
                    label: "Cast selection response".to_string(),
                    text: selection.response,
                },
            ],
        })
    }

    async fn book_title(&self, brief: &StoryBrief) -> Result<String> {
        let raw = self
            .llm
            .chat(prompt::NOVELIST_SYSTEM, &prompt::book_title_prompt(brief), &TITLE_OPTIONS)
            .await?;
        Ok(clean_title(&raw))
    }

    async fn chapter_titles(&self, brief: &StoryBrief, count: u32, cast: &CastContext) -> Result<Vec<String>> {
        let options = ChatOptions::new(0.7).with_max_tokens(CHAPTER_TITLE_TOKENS.saturating_mul(count));
        let raw = self
            .llm
            .chat(prompt::NOVELIST_SYSTEM, &prompt::chapter_titles_prompt(brief, count, cast), &options)
            .await?;
        let titles = parse_chapter_titles(&raw, count);
        info!("Chapter titles: {:?}", titles);
        Ok(titles)
    }

    /// Never fails: cover art is optional.
    async fn cover(&self, brief: &StoryBrief, title: &str, cast: &CastContext) -> Result<Option<String>> {
        let Some(generator) = self.image else {
            return Ok(None);
        };

        match self.generate_cover(generator, brief, title, cast).await {
            Ok(path) => {
                info!("Cover image saved to {}", path);
                Ok(Some(path))
            }
            Err(e) => {
                warn!("Cover image generation failed, continuing without one: {:#}", e);
                Ok(None)
            }
        }
    }

    async fn generate_cover(
        &self,
        generator: &dyn ImageGenerator,
        brief: &StoryBrief,
        title: &str,
        cast: &CastContext,
    ) -> Result<String> {
        let location = generator.generate(&prompt::cover_prompt(brief, title, cast)).await?;
        let bytes = generator.fetch(&location).await?;
        let path = Path::new(self.image_folder).join(format!("{}.png", uuid::Uuid::new_v4()));
        let path = path.to_string_lossy().to_string();
        self.storage.write(&path, &bytes).await?;
        Ok(path)
    }
}
