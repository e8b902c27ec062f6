pub mod agent;
pub mod cli;
pub mod config;
pub mod llm;
pub mod models;
pub mod reveal;
pub mod search;
pub mod session;
pub mod stream;
pub mod ui;

use agent::SearchAgent;
use cli::Args;
use log::info;
use session::Session;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Model: {:?}", args.chat_model.as_deref().unwrap_or("adapter default"));
    info!("Max Search Results: {}", args.max_search_results);
    info!("Thinking Reveal Interval: {}ms", args.thinking_reveal_ms);
    info!("Content Reveal Interval: {}ms", args.content_reveal_ms);
    if args.tavily_api_key.is_empty() {
        info!("Tavily API key not set; searches will degrade to zero sources.");
    }
    info!("-------------------------");

    let agent = Arc::new(SearchAgent::from_args(&args)?);
    let session = Session::new(agent);
    ui::chat_loop(session, &args).await
}
