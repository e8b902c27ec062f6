use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// Type of LLM provider used for both oracles (ollama, openai, gemini)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "ollama")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider (OpenAI, Gemini)
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for completions (e.g., gpt-4o, llama3, gemini-1.5-flash-latest)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    // --- Search Provider Args ---
    /// API key for the Tavily web search provider
    #[arg(long, env = "TAVILY_API_KEY", default_value = "")]
    pub tavily_api_key: String,

    /// Maximum number of web search results to request per query
    #[arg(long, env = "MAX_SEARCH_RESULTS", default_value = "5")]
    pub max_search_results: usize,

    // --- General App Args ---
    /// Optional path to a JSON file overriding the built-in prompt templates
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    /// Reveal interval in milliseconds per character for the thinking trace
    #[arg(long, env = "THINKING_REVEAL_MS", default_value = "10")]
    pub thinking_reveal_ms: u64,

    /// Reveal interval in milliseconds per character for the final answer
    #[arg(long, env = "CONTENT_REVEAL_MS", default_value = "20")]
    pub content_reveal_ms: u64,
}
