use serde::{ Serialize, Deserialize };
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::chat::SearchResult;

/// One self-contained partial-update record on the wire. The `id` is
/// mandatory and names the in-flight assistant message; every other field is
/// optional merge-patch data. Records are sent back to back as compact JSON
/// with no delimiter or length prefix between them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SearchResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Frame {
    pub fn thinking(id: Uuid, thinking: impl Into<String>) -> Self {
        Self {
            id,
            thinking: Some(thinking.into()),
            sources: None,
            content: None,
        }
    }

    pub fn with_sources(mut self, sources: Vec<SearchResult>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Semantic validation step of decoding: the caller has already
    /// established that `value` is one syntactically complete JSON document.
    pub fn from_value(value: JsonValue) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
