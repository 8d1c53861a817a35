use crate::core::outcome::Outcome;
use crate::core::state::{CastContext, StoryBrief};
use crate::services::llm::{ChatOptions, LlmClient};
use crate::services::pacing::PacingPolicy;
use crate::services::prompt;
use crate::utils::text::truncate_chars;
use anyhow::Result;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const SECTION_OPTIONS: ChatOptions = ChatOptions::new(0.75).with_max_tokens(1200);
pub const SUMMARY_OPTIONS: ChatOptions = ChatOptions::new(0.2).with_max_tokens(200);

/// Characters of raw section text used when summarization fails.
pub const FALLBACK_SUMMARY_CHARS: usize = 300;

pub fn seed_summary(block_title: &str) -> String {
    if block_title.to_lowercase().contains("chapter") {
        "The chapter begins. Re-establish the scene or continue from the previous chapter's events.".to_string()
    } else {
        format!(
            "This is the {}. Set the stage for the entire story or provide a concluding thought.",
            block_title
        )
    }
}

pub fn fallback_summary(section_text: &str) -> String {
    format!("{}...", truncate_chars(section_text, FALLBACK_SUMMARY_CHARS))
}

/// Writes blocks of prose as chains of fixed-size sections, each
/// continuing from a summary of the one before.
///
/// One chain is shared by every block of a book: any two section requests it
/// sends, in the same block or not, are at least `pause` apart.
pub struct SectionChain<'a> {
    llm: &'a dyn LlmClient,
    policy: &'a PacingPolicy,
    pause: Duration,
    last_section: Mutex<Option<Instant>>,
}

impl<'a> SectionChain<'a> {
    pub fn new(llm: &'a dyn LlmClient, policy: &'a PacingPolicy) -> Self {
        Self {
            llm,
            policy,
            pause: policy.section_pause(),
            last_section: Mutex::new(None),
        }
    }

    pub async fn generate(
        &self,
        brief: &StoryBrief,
        block_title: &str,
        cast: &CastContext,
        word_target: u32,
    ) -> Result<String> {
        let sections = self.policy.section_count(word_target);
        info!(
            "Generating '{}' (target {} words, {} sections)",
            block_title, word_target, sections
        );

        let mut summary = seed_summary(block_title);
        let mut parts: Vec<String> = Vec::with_capacity(sections as usize);

        for i in 0..sections {
            self.wait_for_quota().await;

            debug!("  '{}' part {}/{}", block_title, i + 1, sections);
            let user = prompt::section_prompt(brief, block_title, &summary, cast, self.policy.section_words);
            let section = self
                .llm
                .chat(prompt::NOVELIST_SYSTEM, &user, &SECTION_OPTIONS)
                .await?
                .trim()
                .to_string();

            if i + 1 < sections {
                summary = self
                    .summarize(&section)
                    .await
                    .unwrap_or_else_reason(|reason| {
                        warn!("Summary of '{}' part {} failed, using raw text: {}", block_title, i + 1, reason);
                        fallback_summary(&section)
                    });
            }
            parts.push(section);
        }

        info!("Finished '{}'", block_title);
        Ok(parts.join("\n\n"))
    }

    /// Holds the lock while sleeping so concurrent blocks queue up.
    async fn wait_for_quota(&self) {
        let mut last = self.last_section.lock().await;
        if let Some(previous) = *last {
            let ready = previous + self.pause;
            if ready > Instant::now() {
                debug!("Pausing {:?} before the next section", ready - Instant::now());
                tokio::time::sleep_until(ready).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub async fn summarize(&self, section_text: &str) -> Outcome<String> {
        let user = prompt::summary_prompt(section_text);
        self.llm
            .chat(prompt::EDITOR_SYSTEM, &user, &SUMMARY_OPTIONS)
            .await
            .map(|s| s.trim().to_string())
            .into()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    pub(crate) const DEFAULT_SELECTION: &str =
        r#"{"people": ["Darth Vader", "Obi-Wan Kenobi"], "planets": ["Mustafar"], "starships": []}"#;
    pub(crate) const DEFAULT_CHAPTER_TITLES: &str = "1. Embers\n2. The High Ground\n3. Aftermath";

    /// Scripted LLM: numbered sections, numbered summaries, canned answers
    /// for the one-shot prompts, optional failures.
    #[derive(Debug, Default)]
    pub(crate) struct MockLlmClient {
        pub calls: Arc<Mutex<Vec<String>>>,
        pub fail_summaries: bool,
        pub fail_sections: bool,
        pub fail_selection: bool,
        pub fail_chapter_titles: bool,
        pub section_text: Option<String>,
        pub selection_response: Option<String>,
        pub title_response: Option<String>,
        pub chapter_titles_response: Option<String>,
    }

    impl MockLlmClient {
        pub fn section_prompts(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.contains("CURRENT CHAPTER:"))
                .cloned()
                .collect()
        }

        pub fn summary_prompts(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.contains("TEXT TO SUMMARIZE"))
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn chat(&self, _system: &str, user: &str, _options: &ChatOptions) -> Result<String> {
            let n = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(user.to_string());
                calls.len()
            };

            if user.contains("TEXT TO SUMMARIZE") {
                if self.fail_summaries {
                    return Err(anyhow!("summary quota exceeded"));
                }
                return Ok(format!("summary #{}", n));
            }
            if user.contains("CURRENT CHAPTER:") {
                if self.fail_sections {
                    return Err(anyhow!("section generation failed"));
                }
                return Ok(self.section_text.clone().unwrap_or_else(|| format!("  section #{}  ", n)));
            }
            if user.contains("AVAILABLE DATA:") {
                if self.fail_selection {
                    return Err(anyhow!("selection request failed"));
                }
                return Ok(self.selection_response.clone().unwrap_or_else(|| DEFAULT_SELECTION.to_string()));
            }
            if user.contains("chapter titles") {
                if self.fail_chapter_titles {
                    return Err(anyhow!("chapter title request failed"));
                }
                return Ok(self
                    .chapter_titles_response
                    .clone()
                    .unwrap_or_else(|| DEFAULT_CHAPTER_TITLES.to_string()));
            }
            if user.contains("book title") {
                return Ok(self.title_response.clone().unwrap_or_else(|| "\"Ashes of Mustafar\"".to_string()));
            }
            Err(anyhow!("unexpected prompt"))
        }
    }

    fn no_pause_policy() -> PacingPolicy {
        PacingPolicy { section_pause_ms: 0, ..PacingPolicy::default() }
    }

    #[tokio::test]
    async fn test_section_and_summary_counts() -> Result<()> {
        let llm = MockLlmClient::default();
        let policy = no_pause_policy();
        let chain = SectionChain::new(&llm, &policy);

        let body = chain.generate(&StoryBrief::new("duel"), "Prologue", &CastContext::default(), 2250).await?;

        assert_eq!(llm.section_prompts().len(), 3);
        assert_eq!(llm.summary_prompts().len(), 2);
        // Calls alternate section, summary, section, summary, section.
        assert_eq!(body, "section #1\n\nsection #3\n\nsection #5");
        Ok(())
    }

    #[tokio::test]
    async fn test_summaries_feed_the_next_section() -> Result<()> {
        let llm = MockLlmClient::default();
        let policy = no_pause_policy();
        let chain = SectionChain::new(&llm, &policy);

        chain.generate(&StoryBrief::new("duel"), "Chapter - 1: Embers", &CastContext::default(), 1500).await?;

        let sections = llm.section_prompts();
        assert_eq!(sections.len(), 2);
        assert!(sections[0].contains(&seed_summary("Chapter - 1: Embers")));
        assert!(sections[1].contains("concluded with the following events: \"summary #2\""));
        assert!(llm.summary_prompts()[0].contains("section #1"));
        Ok(())
    }

    #[tokio::test]
    async fn test_single_section_issues_no_summary() -> Result<()> {
        let llm = MockLlmClient::default();
        let policy = no_pause_policy();
        let chain = SectionChain::new(&llm, &policy);

        let body = chain.generate(&StoryBrief::new("duel"), "Epilogue", &CastContext::default(), 250).await?;

        assert_eq!(body, "section #1");
        assert_eq!(llm.section_prompts().len(), 1);
        assert!(llm.summary_prompts().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_summary_falls_back_to_truncated_text() -> Result<()> {
        let long_text = "x".repeat(450);
        let llm = MockLlmClient {
            fail_summaries: true,
            section_text: Some(long_text.clone()),
            ..Default::default()
        };
        let policy = no_pause_policy();
        let chain = SectionChain::new(&llm, &policy);

        let body = chain.generate(&StoryBrief::new("duel"), "Prologue", &CastContext::default(), 1500).await?;

        let sections = llm.section_prompts();
        assert_eq!(sections.len(), 2);
        let expected = format!("{}...", "x".repeat(300));
        assert!(sections[1].contains(&format!("concluded with the following events: \"{}\"", expected)));
        assert_eq!(body, format!("{}\n\n{}", long_text, long_text));
        Ok(())
    }

    #[tokio::test]
    async fn test_section_failure_propagates() {
        let llm = MockLlmClient { fail_sections: true, ..Default::default() };
        let policy = no_pause_policy();
        let chain = SectionChain::new(&llm, &policy);

        let result = chain.generate(&StoryBrief::new("duel"), "Prologue", &CastContext::default(), 1500).await;
        assert!(result.is_err());
        assert_eq!(llm.section_prompts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_applies_only_between_sections() -> Result<()> {
        let llm = MockLlmClient::default();
        let policy = PacingPolicy::default();
        let chain = SectionChain::new(&llm, &policy);

        let start = Instant::now();
        chain.generate(&StoryBrief::new("duel"), "Prologue", &CastContext::default(), 2250).await?;
        assert_eq!(start.elapsed(), Duration::from_millis(2 * policy.section_pause_ms));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_spans_blocks_sharing_a_chain() -> Result<()> {
        let llm = MockLlmClient::default();
        let policy = PacingPolicy::default();
        let chain = SectionChain::new(&llm, &policy);
        let brief = StoryBrief::new("duel");
        let cast = CastContext::default();

        let start = Instant::now();
        tokio::try_join!(
            chain.generate(&brief, "Prologue", &cast, 500),
            chain.generate(&brief, "Epilogue", &cast, 250),
        )?;
        chain.generate(&brief, "Chapter - 1: Embers", &cast, 645).await?;

        assert_eq!(llm.section_prompts().len(), 3);
        assert_eq!(start.elapsed(), policy.section_pause() * 2);
        Ok(())
    }

    #[test]
    fn test_seed_summary_depends_on_title() {
        assert!(seed_summary("Chapter - 3: Fire").starts_with("The chapter begins."));
        assert!(seed_summary("Prologue").starts_with("This is the Prologue."));
    }

    #[test]
    fn test_fallback_summary_is_char_safe() {
        let text = "é".repeat(400);
        let summary = fallback_summary(&text);
        assert_eq!(summary.chars().count(), 303);
        assert!(summary.ends_with("..."));
        assert_eq!(fallback_summary("short"), "short...");
    }
}
