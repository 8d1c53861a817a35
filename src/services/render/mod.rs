//! Turns a finished manuscript into a printable document.
//!
//! [`RenderDocument`] is the layout-ready view of a [`BookManuscript`]: every
//! string the page template needs, already split and ordered. Renderers only
//! deal with presentation.

mod pdf;
mod world;

pub use pdf::TypstRenderer;

use crate::core::state::{BookManuscript, ContentBlock, TraceEntry};
use crate::utils::text::split_paragraphs;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Path the template reads the cover image from.
pub const COVER_PATH: &str = "/cover.png";
pub const EMPTY_SECTION_TEXT: &str = "Content for this section could not be generated.";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderSection {
    pub heading: String,
    pub paragraphs: Vec<String>,
}

impl RenderSection {
    pub fn from_block(block: &ContentBlock) -> Self {
        let mut paragraphs = split_paragraphs(&block.body);
        if paragraphs.is_empty() {
            paragraphs.push(EMPTY_SECTION_TEXT.to_string());
        }
        Self {
            heading: block.title.clone(),
            paragraphs,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderDocument {
    pub title: String,
    pub subtitle: String,
    pub printed: String,
    pub trace: Vec<TraceEntry>,
    /// Set to [`COVER_PATH`] when `cover_image` holds data.
    pub cover: Option<String>,
    #[serde(skip)]
    pub cover_image: Option<Vec<u8>>,
    /// Table of contents, in reading order.
    pub contents: Vec<String>,
    pub prologue: RenderSection,
    pub chapters: Vec<RenderSection>,
    pub epilogue: RenderSection,
}

impl RenderDocument {
    pub fn from_manuscript(
        manuscript: &BookManuscript,
        subtitle: &str,
        printed: &str,
        cover_image: Option<Vec<u8>>,
    ) -> Self {
        let cover_image = cover_image.filter(|bytes| !bytes.is_empty());
        Self {
            title: manuscript.title.clone(),
            subtitle: subtitle.to_string(),
            printed: printed.to_string(),
            trace: manuscript.trace.clone(),
            cover: cover_image.as_ref().map(|_| COVER_PATH.to_string()),
            cover_image,
            contents: manuscript.blocks().map(|b| b.title.clone()).collect(),
            prologue: RenderSection::from_block(&manuscript.prologue),
            chapters: manuscript.chapters.iter().map(RenderSection::from_block).collect(),
            epilogue: RenderSection::from_block(&manuscript.epilogue),
        }
    }

    /// Same document with the cover page left out.
    pub fn without_cover(self) -> Self {
        Self {
            cover: None,
            cover_image: None,
            ..self
        }
    }
}

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Produces the finished file bytes.
    async fn render(&self, document: &RenderDocument) -> Result<Vec<u8>>;
}
