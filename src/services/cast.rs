use crate::core::catalog::FixtureCatalog;
use crate::core::outcome::Outcome;
use crate::core::state::{CastContext, StoryBrief};
use crate::services::llm::{ChatOptions, LlmClient};
use crate::services::prompt;
use crate::utils::text::strip_code_blocks;
use anyhow::Result;
use log::{info, warn};
use serde_json::Value;
use std::collections::BTreeMap;

pub const SELECTION_OPTIONS: ChatOptions = ChatOptions::new(0.3).json();

/// The chosen cast plus the raw exchange that produced it.
#[derive(Debug, Clone)]
pub struct CastSelection {
    pub context: CastContext,
    pub request: String,
    /// The model's answer, or the reason the random cast was used instead.
    pub response: String,
}

/// Reads `{category: [names]}` from the model's answer. Keys whose value is
/// not a list and list entries that are not strings are skipped; only a reply
/// that is not a JSON object counts as a fallback.
pub fn parse_selection(response: &str) -> Outcome<BTreeMap<String, Vec<String>>> {
    let cleaned = strip_code_blocks(response);
    let object = match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(object)) => object,
        Ok(other) => return Outcome::Fallback(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(e) => return Outcome::Fallback(e.to_string()),
    };

    let selected = object
        .into_iter()
        .filter_map(|(category, value)| match value {
            Value::Array(items) => {
                let names = items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(name) => Some(name),
                        _ => None,
                    })
                    .collect();
                Some((category, names))
            }
            _ => None,
        })
        .collect();
    Outcome::Parsed(selected)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub struct CastSelector<'a> {
    llm: &'a dyn LlmClient,
    catalog: &'a FixtureCatalog,
}

impl<'a> CastSelector<'a> {
    pub fn new(llm: &'a dyn LlmClient, catalog: &'a FixtureCatalog) -> Self {
        Self { llm, catalog }
    }

    pub async fn select(&self, brief: &StoryBrief) -> Result<CastSelection> {
        let request = prompt::selection_prompt(brief, self.catalog);
        let raw = self
            .llm
            .chat(prompt::EDITOR_SYSTEM, &request, &SELECTION_OPTIONS)
            .await?;

        let selection = match parse_selection(&raw) {
            Outcome::Parsed(selected) => {
                let context = self.catalog.filter(&selected);
                info!(
                    "Cast selected: {} people, {} planets, {} starships",
                    context.len("people"),
                    context.len("planets"),
                    context.len("starships")
                );
                CastSelection { context, request, response: raw }
            }
            Outcome::Fallback(reason) => {
                warn!("Could not parse cast selection, picking a random cast: {}", reason);
                let context = self.catalog.random_cast(&mut rand::rng());
                CastSelection {
                    context,
                    request,
                    response: format!("Random cast used ({}). Raw response:\n{}", reason, raw),
                }
            }
        };
        Ok(selection)
    }
}
