use chrono::Utc;
use serde::{ Serialize, Deserialize };
use uuid::Uuid;

use crate::models::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One ranked web search hit. Immutable once constructed; ownership moves
/// wholesale into `ChatMessage::sources`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub thinking: String,
    pub sources: Vec<SearchResult>,
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn user(content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.to_string(),
            thinking: String::new(),
            sources: Vec::new(),
            timestamp: Utc::now().timestamp(),
        }
    }

    /// The assistant message created at submission time, before the stream
    /// opens. Its id is embedded in every frame of the response.
    pub fn assistant_placeholder(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: String::new(),
            thinking: "Analyzing query...".to_string(),
            sources: Vec::new(),
            timestamp: Utc::now().timestamp(),
        }
    }
}

/// Ordered conversation log. Messages are appended on submission and mutated
/// in place by incoming frames; they are never removed during a session.
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn get(&self, id: Uuid) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn last_assistant(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Merge-patch application: a field absent in the frame means "no
    /// change"; a present field (even an empty string) replaces the current
    /// value. Returns false when no message carries the frame's id.
    pub fn apply(&mut self, frame: &Frame) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == frame.id) else {
            return false;
        };
        if let Some(thinking) = &frame.thinking {
            message.thinking = thinking.clone();
        }
        if let Some(sources) = &frame.sources {
            message.sources = sources.clone();
        }
        if let Some(content) = &frame.content {
            message.content = content.clone();
        }
        true
    }
}
