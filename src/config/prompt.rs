use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use log::info;

use crate::models::chat::SearchResult;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt file IO error: {0}")] Io(#[from] std::io::Error),
    #[error("Prompt JSON parsing error: {0}")] Json(#[from] serde_json::Error),
    #[error("Prompt template '{0}' is empty")] EmptyTemplate(String),
}

/// Prompt templates for the two oracle calls. `query_analysis` must keep the
/// `{query}` placeholder; `synthesis` must keep `{query}` and `{sources}`.
#[derive(Deserialize, Debug, Clone)]
pub struct PromptConfig {
    #[serde(default = "default_query_analysis")]
    pub query_analysis: String,
    #[serde(default = "default_synthesis")]
    pub synthesis: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            query_analysis: default_query_analysis(),
            synthesis: default_synthesis(),
        }
    }
}

fn default_query_analysis() -> String {
    r#"Analyze this user query: "{query}"

You need to determine if a web search is necessary to provide a comprehensive and up-to-date answer.

Consider the following:
- Is the query about a recent event or breaking news?
- Does the query ask for specific, real-time information (e.g., weather, stock prices, flight status)?
- Is the query about a topic where information changes frequently?
- Could the answer be significantly improved with the latest information from the web?

Respond with a single JSON object and nothing else, using exactly these fields:
{"needsSearch": <true|false>, "searchQuery": "<concise search query, empty if no search is needed>", "thinking": "<brief reasoning for your decision>"}"#.to_string()
}

fn default_synthesis() -> String {
    r#"Answer the user's question. If web sources are provided below, synthesize them into an up-to-date answer and cite them by number like [1]; if none are provided, answer from general knowledge.

Question: {query}

Web sources:
{sources}"#.to_string()
}

/// Loads templates from a JSON file when a path is given, falling back to the
/// built-in defaults otherwise. Missing keys in the file keep their defaults.
pub fn load_prompts(path: Option<&str>) -> Result<Arc<PromptConfig>, PromptError> {
    let config = match path {
        Some(p) if Path::new(p).exists() => {
            let text = fs::read_to_string(p)?;
            let config: PromptConfig = serde_json::from_str(&text)?;
            info!("Loaded prompt templates from: {}", p);
            config
        }
        Some(p) => {
            info!("Prompt file '{}' not found. Using built-in templates.", p);
            PromptConfig::default()
        }
        None => PromptConfig::default(),
    };

    if config.query_analysis.trim().is_empty() {
        return Err(PromptError::EmptyTemplate("query_analysis".to_string()));
    }
    if config.synthesis.trim().is_empty() {
        return Err(PromptError::EmptyTemplate("synthesis".to_string()));
    }

    Ok(Arc::new(config))
}

pub fn get_analysis_prompt(config: &PromptConfig, query: &str) -> String {
    config.query_analysis.replace("{query}", query)
}

pub fn get_synthesis_prompt(
    config: &PromptConfig,
    query: &str,
    results: &[SearchResult]
) -> String {
    let sources = if results.is_empty() {
        "(none)".to_string()
    } else {
        results
            .iter()
            .enumerate()
            .map(|(i, r)| format!("[{}] {} ({})\n{}", i + 1, r.title, r.url, r.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    };
    config.synthesis.replace("{query}", query).replace("{sources}", &sources)
}
