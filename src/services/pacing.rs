use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard cap on the requested page count.
pub const MAX_PAGES: u32 = 100;

/// Constants that turn a page budget into chapter and section targets.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PacingPolicy {
    /// Pages taken by front and back matter regardless of content.
    pub reserved_pages: u32,
    pub words_per_page: u32,
    pub words_per_chapter: u32,
    /// Size of one generation call inside a block.
    pub section_words: u32,
    pub prologue_words: u32,
    pub epilogue_words: u32,
    /// Pause between successive section requests. Zero disables it.
    pub section_pause_ms: u64,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            reserved_pages: 12,
            words_per_page: 215,
            words_per_chapter: 1000,
            section_words: 750,
            prologue_words: 500,
            epilogue_words: 250,
            section_pause_ms: 4000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PacingPlan {
    pub chapter_count: u32,
    pub words_per_chapter: u32,
    /// Word budget of all content pages, before chapter title pages are taken out.
    pub content_words: u32,
}

impl PacingPolicy {
    pub fn section_pause(&self) -> Duration {
        Duration::from_millis(self.section_pause_ms)
    }

    pub fn plan(&self, pages: u32) -> PacingPlan {
        let words_per_page = u64::from(self.words_per_page);
        let content_pages = u64::from(pages.saturating_sub(self.reserved_pages).max(1));
        let content_words = content_pages * words_per_page;

        let chapter_count = if self.words_per_chapter == 0 {
            1
        } else {
            ((content_words as f64 / f64::from(self.words_per_chapter)).round_ties_even() as u64).max(1)
        };

        // Every chapter opens on its own title page.
        let prose_pages = content_pages.saturating_sub(chapter_count).max(1);
        let words_per_chapter = prose_pages * words_per_page / chapter_count;

        PacingPlan {
            chapter_count: clamp_u32(chapter_count),
            words_per_chapter: clamp_u32(words_per_chapter),
            content_words: clamp_u32(content_words),
        }
    }

    /// Number of fixed-size sections needed to reach `word_target`.
    pub fn section_count(&self, word_target: u32) -> u32 {
        if self.section_words == 0 {
            return 1;
        }
        let sections = (f64::from(word_target) / f64::from(self.section_words)).round_ties_even() as u32;
        sections.max(1)
    }
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
