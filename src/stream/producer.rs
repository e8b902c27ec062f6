use log::error;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use super::FrameChunkStream;
use crate::agent::SearchAgent;
use crate::models::frame::Frame;

/// Runs the decide → search → synthesize sequence for one query, emitting
/// partial-state frames as they become available. Each step's frames are
/// flushed before the next step starts. The returned stream always yields at
/// least one frame and always closes: the spawned task owns the only sender,
/// and every exit path (including the error path) drops it.
pub fn produce(agent: Arc<SearchAgent>, query: String, response_id: Uuid) -> FrameChunkStream {
    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::spawn(async move {
        if let Err(e) = run_steps(&agent, &query, response_id, &tx).await {
            error!("Error in producer stream: {}", e);
            let terminal = Frame::thinking(response_id, format!("Error: {}", e)).with_content(
                "Sorry, an error occurred while processing your request."
            );
            let _ = tx.send(terminal.encode()).await;
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

async fn run_steps(
    agent: &SearchAgent,
    query: &str,
    response_id: Uuid,
    tx: &mpsc::Sender<String>
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let analysis = agent.analyze_query(query).await?;
    let base = analysis.thinking.clone();
    send(tx, Frame::thinking(response_id, base.clone())).await;

    let mut results = Vec::new();
    if analysis.needs_search {
        send(
            tx,
            Frame::thinking(
                response_id,
                format!("{}\n\n🌐 Searching the web for: `{}`", base, analysis.search_query)
            )
        ).await;

        results = agent.search_web(&analysis.search_query).await;
        if !results.is_empty() {
            send(
                tx,
                Frame::thinking(
                    response_id,
                    format!("{}\n\n✅ Found {} high-quality sources.", base, results.len())
                ).with_sources(results.clone())
            ).await;
        } else {
            // Provider failure already degraded to zero results; both cases
            // continue without sources.
            send(
                tx,
                Frame::thinking(
                    response_id,
                    format!(
                        "{}\n\n❌ No relevant sources found. Answering from general knowledge.",
                        base
                    )
                )
            ).await;
        }
    }

    send(
        tx,
        Frame::thinking(response_id, format!("{}\n\n✍️ Generating response...", base))
    ).await;

    let answer = agent.synthesize(query, &results).await?;
    send(
        tx,
        Frame::thinking(response_id, format!("{}\n\n✅ Response complete.", base)).with_content(
            answer
        )
    ).await;

    Ok(())
}

async fn send(tx: &mpsc::Sender<String>, frame: Frame) {
    // A closed receiver means the consumer went away; nothing left to do.
    let _ = tx.send(frame.encode()).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::StreamExt;
    use std::error::Error as StdError;
    use std::sync::atomic::{ AtomicBool, Ordering };

    use crate::config::prompt::PromptConfig;
    use crate::llm::chat::{ ChatClient, CompletionResponse };
    use crate::models::chat::SearchResult;
    use crate::search::SearchProvider;

    /// Answers the analysis prompt with a canned decision and the synthesis
    /// prompt with a canned answer (or a canned failure). The two prompts
    /// are told apart by template markers.
    struct ScriptedOracle {
        analysis: Result<String, String>,
        synthesis: Result<String, String>,
    }

    #[async_trait]
    impl ChatClient for ScriptedOracle {
        async fn complete(
            &self,
            prompt: &str
        ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
            let scripted = if prompt.contains("needsSearch") {
                &self.analysis
            } else {
                &self.synthesis
            };
            match scripted {
                Ok(response) => Ok(CompletionResponse { response: response.clone() }),
                Err(message) => Err(message.clone().into()),
            }
        }

        fn get_model(&self) -> String {
            "scripted".to_string()
        }
    }

    struct CannedSearch {
        results: Vec<SearchResult>,
        called: AtomicBool,
    }

    #[async_trait]
    impl SearchProvider for CannedSearch {
        async fn search(&self, _query: &str, _max_results: usize) -> Vec<SearchResult> {
            self.called.store(true, Ordering::SeqCst);
            self.results.clone()
        }
    }

    fn analysis_json(needs_search: bool, search_query: &str, thinking: &str) -> String {
        format!(
            r#"{{"needsSearch": {}, "searchQuery": "{}", "thinking": "{}"}}"#,
            needs_search,
            search_query,
            thinking
        )
    }

    fn result(n: usize) -> SearchResult {
        SearchResult {
            title: format!("Result {}", n),
            url: format!("https://example.com/{}", n),
            content: format!("snippet {}", n),
        }
    }

    async fn collect_frames(
        oracle: ScriptedOracle,
        search: Arc<CannedSearch>,
        query: &str
    ) -> (Uuid, Vec<Frame>) {
        let agent = Arc::new(
            SearchAgent::new(
                Arc::new(oracle),
                search,
                Arc::new(PromptConfig::default()),
                5
            )
        );
        let response_id = Uuid::new_v4();
        let chunks: Vec<String> = produce(agent, query.to_string(), response_id).collect().await;
        let frames = chunks
            .iter()
            .map(|c| serde_json::from_str::<Frame>(c).unwrap())
            .collect();
        (response_id, frames)
    }

    #[tokio::test]
    async fn no_search_goes_straight_to_synthesis() {
        let search = Arc::new(CannedSearch {
            results: vec![result(1)],
            called: AtomicBool::new(false),
        });
        let oracle = ScriptedOracle {
            analysis: Ok(analysis_json(false, "", "Simple arithmetic, no search needed.")),
            synthesis: Ok("2+2 equals 4.".to_string()),
        };
        let (response_id, frames) = collect_frames(oracle, Arc::clone(&search), "What is 2+2?").await;

        assert!(!search.called.load(Ordering::SeqCst));
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].thinking.as_deref(), Some("Simple arithmetic, no search needed."));
        assert!(frames[1].thinking.as_deref().unwrap().contains("✍️ Generating response..."));
        let last = &frames[2];
        assert_eq!(last.content.as_deref(), Some("2+2 equals 4."));
        assert!(last.thinking.as_deref().unwrap().contains("✅ Response complete."));
        assert!(frames.iter().all(|f| f.id == response_id));
        assert!(frames.iter().all(|f| f.sources.is_none()));
    }

    #[tokio::test]
    async fn search_path_emits_full_frame_sequence() {
        let search = Arc::new(CannedSearch {
            results: vec![result(1), result(2)],
            called: AtomicBool::new(false),
        });
        let oracle = ScriptedOracle {
            analysis: Ok(analysis_json(true, "Paris weather today", "Weather is real-time.")),
            synthesis: Ok("Expect light rain in Paris today. [1]".to_string()),
        };
        let (_, frames) = collect_frames(
            oracle,
            Arc::clone(&search),
            "today's weather in Paris"
        ).await;

        assert!(search.called.load(Ordering::SeqCst));
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[0].thinking.as_deref(), Some("Weather is real-time."));
        assert!(
            frames[1].thinking
                .as_deref()
                .unwrap()
                .contains("🌐 Searching the web for: `Paris weather today`")
        );
        assert!(frames[2].thinking.as_deref().unwrap().contains("✅ Found 2 high-quality sources."));
        assert_eq!(frames[2].sources.as_ref().unwrap().len(), 2);
        assert!(frames[3].thinking.as_deref().unwrap().contains("✍️ Generating response..."));
        assert!(frames[4].content.as_deref().unwrap().contains("light rain"));
    }

    #[tokio::test]
    async fn zero_results_never_emit_a_sources_field() {
        let search = Arc::new(CannedSearch {
            results: Vec::new(),
            called: AtomicBool::new(false),
        });
        let oracle = ScriptedOracle {
            analysis: Ok(analysis_json(true, "obscure topic", "Needs fresh data.")),
            synthesis: Ok("Best effort from general knowledge.".to_string()),
        };
        let (_, frames) = collect_frames(oracle, Arc::clone(&search), "obscure topic?").await;

        assert!(search.called.load(Ordering::SeqCst));
        assert_eq!(frames.len(), 5);
        assert!(frames[2].thinking.as_deref().unwrap().contains("❌ No relevant sources found."));
        assert!(frames.iter().all(|f| f.sources.is_none()));
    }

    #[tokio::test]
    async fn synthesis_failure_ends_with_single_terminal_frame() {
        let search = Arc::new(CannedSearch {
            results: Vec::new(),
            called: AtomicBool::new(false),
        });
        let oracle = ScriptedOracle {
            analysis: Ok(analysis_json(false, "", "No search needed.")),
            synthesis: Err("model unavailable".to_string()),
        };
        let (_, frames) = collect_frames(oracle, search, "anything").await;

        let last = frames.last().unwrap();
        assert_eq!(
            last.content.as_deref(),
            Some("Sorry, an error occurred while processing your request.")
        );
        assert!(last.thinking.as_deref().unwrap().starts_with("Error: "));
        assert!(last.thinking.as_deref().unwrap().contains("model unavailable"));
        // Only the terminal frame carries content.
        assert_eq!(
            frames
                .iter()
                .filter(|f| f.content.is_some())
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn decision_failure_still_emits_exactly_one_frame() {
        let search = Arc::new(CannedSearch {
            results: Vec::new(),
            called: AtomicBool::new(false),
        });
        let oracle = ScriptedOracle {
            analysis: Err("decision oracle down".to_string()),
            synthesis: Ok("unreachable".to_string()),
        };
        let (_, frames) = collect_frames(oracle, Arc::clone(&search), "anything").await;

        assert!(!search.called.load(Ordering::SeqCst));
        assert_eq!(frames.len(), 1);
        assert!(frames[0].thinking.as_deref().unwrap().contains("decision oracle down"));
    }
}
