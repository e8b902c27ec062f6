pub mod tavily;

use async_trait::async_trait;

use crate::models::chat::SearchResult;

/// Web search seam. Implementations swallow every failure at this boundary:
/// an HTTP error or a malformed payload degrades to an empty result list and
/// never propagates to the caller.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult>;
}
