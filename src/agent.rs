use serde::Deserialize;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

use log::info;

use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig };
use crate::llm::{ parse_llm_type, LlmConfig };
use crate::llm::chat::{ ChatClient, new_client as new_chat_client };
use crate::models::chat::SearchResult;
use crate::search::SearchProvider;
use crate::search::tavily::TavilyClient;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Query analysis returned malformed output: {0}")] MalformedAnalysis(String),
}

/// Decision-oracle output: whether a web search is needed, the derived
/// search query, and the model's rationale.
#[derive(Deserialize, Debug, Clone)]
pub struct QueryAnalysis {
    #[serde(rename = "needsSearch")]
    pub needs_search: bool,
    #[serde(rename = "searchQuery", default)]
    pub search_query: String,
    #[serde(default)]
    pub thinking: String,
}

/// Orchestrates the two LLM oracles and the search provider for one query at
/// a time. Stateless between queries; no history is kept.
#[derive(Clone)]
pub struct SearchAgent {
    chat_client: Arc<dyn ChatClient>,
    search_provider: Arc<dyn SearchProvider>,
    prompt_config: Arc<PromptConfig>,
    max_results: usize,
}

impl SearchAgent {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        search_provider: Arc<dyn SearchProvider>,
        prompt_config: Arc<PromptConfig>,
        max_results: usize
    ) -> Self {
        Self {
            chat_client,
            search_provider,
            prompt_config,
            max_results,
        }
    }

    pub fn from_args(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let llm_type = parse_llm_type(&args.chat_llm_type)?;
        let api_key = if !args.chat_api_key.is_empty() {
            Some(args.chat_api_key.clone())
        } else {
            None
        };
        let chat_config = LlmConfig {
            llm_type,
            base_url: args.chat_base_url.clone(),
            api_key,
            model: args.chat_model.clone(),
        };
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Type={}, Model={}",
            args.chat_llm_type,
            chat_client.get_model()
        );

        let search_provider: Arc<dyn SearchProvider> = Arc::new(
            TavilyClient::new(args.tavily_api_key.clone())
        );
        let prompt_config = prompt::load_prompts(args.prompts_path.as_deref())?;

        Ok(Self::new(chat_client, search_provider, prompt_config, args.max_search_results))
    }

    /// Decision Oracle: one completion call, strict-JSON output parsed into
    /// `QueryAnalysis`. Any failure here is fatal to the current query.
    pub async fn analyze_query(
        &self,
        query: &str
    ) -> Result<QueryAnalysis, Box<dyn Error + Send + Sync>> {
        let analysis_prompt = prompt::get_analysis_prompt(&self.prompt_config, query);
        let completion = self.chat_client.complete(&analysis_prompt).await?;
        let json_text = extract_json_object(&completion.response).ok_or_else(||
            AgentError::MalformedAnalysis(completion.response.clone())
        )?;
        let analysis: QueryAnalysis = serde_json
            ::from_str(json_text)
            .map_err(|e| AgentError::MalformedAnalysis(format!("{}: {}", e, json_text)))?;
        info!(
            "Query analysis: needs_search={}, search_query='{}'",
            analysis.needs_search,
            analysis.search_query
        );
        Ok(analysis)
    }

    /// Search Provider boundary. Failures never surface here; they already
    /// degraded to an empty list inside the provider.
    pub async fn search_web(&self, search_query: &str) -> Vec<SearchResult> {
        self.search_provider.search(search_query, self.max_results).await
    }

    /// Synthesis Oracle: final answer from the query plus zero or more
    /// search results.
    pub async fn synthesize(
        &self,
        query: &str,
        results: &[SearchResult]
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        let synthesis_prompt = prompt::get_synthesis_prompt(&self.prompt_config, query, results);
        let completion = self.chat_client.complete(&synthesis_prompt).await?;
        Ok(completion.response)
    }
}

/// Models wrap JSON in prose or markdown fences often enough that taking the
/// outermost brace-delimited slice is the dependable way to get at it.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
