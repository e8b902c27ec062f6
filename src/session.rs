use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, Ordering };
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use log::info;

use crate::agent::SearchAgent;
use crate::models::chat::{ ChatMessage, Conversation };
use crate::stream::{ consumer, producer };

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("A query is already in flight")] Busy,
}

/// One running response: the assistant message being filled in, and the
/// consumer task applying its frames.
#[derive(Debug)]
pub struct SubmitHandle {
    pub assistant_id: Uuid,
    task: JoinHandle<()>,
}

impl SubmitHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) {
        let _ = self.task.await;
    }
}

/// The single submission entry point. Holds the conversation log; the
/// spawned consumer is its only writer, readers only ever take the lock to
/// look. One query may be in flight at a time; there is no cancellation of a
/// started producer, only refusal of the next submit until it closes.
pub struct Session {
    agent: Arc<SearchAgent>,
    conversation: Arc<Mutex<Conversation>>,
    in_flight: Arc<AtomicBool>,
}

impl Session {
    pub fn new(agent: Arc<SearchAgent>) -> Self {
        Self {
            agent,
            conversation: Arc::new(Mutex::new(Conversation::default())),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn conversation(&self) -> Arc<Mutex<Conversation>> {
        Arc::clone(&self.conversation)
    }

    /// Appends the user message and an assistant placeholder, then wires the
    /// producer's chunk stream into the consumer. The returned handle
    /// resolves when the stream has closed and every frame is applied.
    pub async fn submit(&self, query: &str) -> Result<SubmitHandle, SessionError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(SessionError::Busy);
        }

        let assistant_id = Uuid::new_v4();
        {
            let mut conversation = self.conversation.lock().await;
            conversation.push(ChatMessage::user(query));
            conversation.push(ChatMessage::assistant_placeholder(assistant_id));
        }
        info!("Submitted query (response id {})", assistant_id);

        let chunks = producer::produce(Arc::clone(&self.agent), query.to_string(), assistant_id);
        let conversation = Arc::clone(&self.conversation);
        let in_flight = Arc::clone(&self.in_flight);
        let task = tokio::spawn(async move {
            consumer::drive(chunks, conversation).await;
            in_flight.store(false, Ordering::SeqCst);
        });

        Ok(SubmitHandle { assistant_id, task })
    }
}
