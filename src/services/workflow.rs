use crate::api::error::ApiError;
use crate::core::catalog::FixtureCatalog;
use crate::core::config::Config;
use crate::core::io::Storage;
use crate::core::state::StoryBrief;
use crate::services::image::ImageGenerator;
use crate::services::llm::LlmClient;
use crate::services::pacing::MAX_PAGES;
use crate::services::render::{DocumentRenderer, RenderDocument};
use crate::services::writer::BookWriter;
use crate::utils::text::{sanitize_filename, truncate_chars};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

pub const PREVIEW_CHARS: usize = 1500;
pub const DEFAULT_PAGES: i64 = 20;

fn default_pages() -> i64 {
    DEFAULT_PAGES
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRequest {
    #[serde(default)]
    pub user_input: String,
    #[serde(default = "default_pages")]
    pub num_pages: i64,
    #[serde(default)]
    pub writing_sample: Option<String>,
}

impl BookRequest {
    pub fn new(user_input: impl Into<String>, num_pages: i64) -> Self {
        Self {
            user_input: user_input.into(),
            num_pages,
            writing_sample: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookResult {
    pub title: String,
    pub prompt: String,
    pub pdf_file: String,
    pub preview: String,
}

/// Accepts 1..=MAX_PAGES; larger requests are clamped.
pub fn validate_pages(num_pages: i64) -> Result<u32, ApiError> {
    if num_pages < 1 {
        return Err(ApiError::InvalidRequest(format!(
            "num_pages must be at least 1, got {}",
            num_pages
        )));
    }
    if num_pages > i64::from(MAX_PAGES) {
        warn!("Requested {} pages, clamping to {}", num_pages, MAX_PAGES);
        return Ok(MAX_PAGES);
    }
    Ok(num_pages as u32)
}

pub fn preview(text: &str) -> String {
    format!("{}...", truncate_chars(text, PREVIEW_CHARS))
}

/// One request in, one rendered book on disk out.
pub struct BookWorkflow {
    config: Config,
    llm: Box<dyn LlmClient>,
    image: Option<Box<dyn ImageGenerator>>,
    storage: Arc<dyn Storage>,
    catalog: FixtureCatalog,
    renderer: Box<dyn DocumentRenderer>,
}

impl BookWorkflow {
    pub fn new(
        config: Config,
        llm: Box<dyn LlmClient>,
        image: Option<Box<dyn ImageGenerator>>,
        storage: Arc<dyn Storage>,
        catalog: FixtureCatalog,
        renderer: Box<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            config,
            llm,
            image,
            storage,
            catalog,
            renderer,
        }
    }

    pub async fn run(&self, request: BookRequest) -> Result<BookResult, ApiError> {
        let prompt = request.user_input.trim();
        if prompt.is_empty() {
            return Err(ApiError::InvalidRequest("user_input must not be empty".to_string()));
        }
        let pages = validate_pages(request.num_pages)?;

        let brief = StoryBrief {
            prompt: prompt.to_string(),
            writing_sample: request.writing_sample.filter(|s| !s.trim().is_empty()),
        };
        info!("Starting book: '{}' ({} pages)", brief.prompt, pages);

        let writer = BookWriter::new(
            self.llm.as_ref(),
            self.image.as_deref(),
            self.storage.as_ref(),
            &self.catalog,
            &self.config.pacing,
            &self.config.image_folder,
        );
        let manuscript = writer.write(&brief, pages).await?;

        let cover = match &manuscript.cover_image {
            Some(path) => match self.storage.read(path).await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!("Could not read cover image {}, rendering without it: {:#}", path, e);
                    None
                }
            },
            None => None,
        };

        let printed = chrono::Local::now().format("%B %d, %Y").to_string();
        let document = RenderDocument::from_manuscript(&manuscript, &self.config.subtitle, &printed, cover);
        let rendered = self.renderer.render(&document).await;
        let pdf = match rendered {
            Ok(pdf) => pdf,
            Err(e) if document.cover.is_some() => {
                warn!("Rendering with the cover failed, retrying without it: {:#}", e);
                self.renderer.render(&document.without_cover()).await?
            }
            Err(e) => return Err(e.into()),
        };

        let pdf_file = Path::new(&self.config.output_folder)
            .join(format!("{}.pdf", sanitize_filename(&manuscript.title)))
            .to_string_lossy()
            .to_string();
        self.storage.write(&pdf_file, &pdf).await?;
        info!("Book saved to {}", pdf_file);

        Ok(BookResult {
            preview: preview(&manuscript.to_text()),
            title: manuscript.title,
            prompt: brief.prompt,
            pdf_file,
        })
    }
}
