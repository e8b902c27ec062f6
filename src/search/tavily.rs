use async_trait::async_trait;
use log::{ info, warn };
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;

use super::SearchProvider;
use crate::models::chat::SearchResult;

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
const TAVILY_MAX_RESULTS_CAP: usize = 20;

pub struct TavilyClient {
    http: HttpClient,
    api_key: String,
    endpoint: String,
}

#[derive(Serialize)]
struct TavilyRequest {
    api_key: String,
    query: String,
    search_depth: String,
    max_results: u32,
}

#[derive(Deserialize)]
struct TavilyResponse {
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    content: String,
}

impl TavilyClient {
    pub fn new(api_key: String) -> Self {
        Self::with_endpoint(api_key, TAVILY_ENDPOINT.to_string())
    }

    pub fn with_endpoint(api_key: String, endpoint: String) -> Self {
        Self {
            http: HttpClient::new(),
            api_key,
            endpoint,
        }
    }

    async fn try_search(
        &self,
        query: &str,
        max_results: usize
    ) -> Result<Vec<SearchResult>, Box<dyn StdError + Send + Sync>> {
        if max_results == 0 {
            return Ok(Vec::new());
        }
        let capped = max_results.min(TAVILY_MAX_RESULTS_CAP);
        if max_results > capped {
            warn!("Tavily max_results {} exceeds API limit, capping to {}", max_results, capped);
        }
        let req = TavilyRequest {
            api_key: self.api_key.clone(),
            query: query.to_string(),
            search_depth: "basic".to_string(),
            max_results: capped as u32,
        };
        let resp = self.http.post(&self.endpoint).json(&req).send().await?.error_for_status()?;
        let data = resp.json::<TavilyResponse>().await?;
        Ok(
            data.results
                .into_iter()
                .map(|r| SearchResult {
                    title: r.title,
                    url: r.url,
                    content: r.content,
                })
                .collect()
        )
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        info!("Searching web for: {}", query);
        match self.try_search(query, max_results).await {
            Ok(results) => {
                info!("Tavily returned {} result(s)", results.len());
                results
            }
            Err(e) => {
                warn!("Tavily search failed, continuing without sources: {}", e);
                Vec::new()
            }
        }
    }
}
