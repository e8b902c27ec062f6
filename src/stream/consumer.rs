use futures::StreamExt;
use log::warn;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::FrameChunkStream;
use crate::models::chat::Conversation;
use crate::models::frame::Frame;

/// Recovers whole frames from arbitrarily chunked text carrying back-to-back
/// JSON records with no delimiter or length prefix.
///
/// A record boundary is assumed wherever a closing `}` is followed, after
/// optional whitespace, by an opening `{` of the next record. A comma between
/// the two (as inside any JSON array or object) defeats the pattern, so
/// structure within a record never splits it.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    residual: String,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one chunk and returns every frame that became decodable, in
    /// stream order. A record's fields are never visible until the whole
    /// record parses; a syntactically incomplete tail is carried over to the
    /// next push.
    pub fn push(&mut self, chunk: &str) -> Vec<Frame> {
        self.residual.push_str(chunk);

        let mut frames = Vec::new();
        let mut consumed = 0;
        for (start, end) in candidate_spans(&self.residual) {
            let candidate = self.residual[start..end].trim();
            if candidate.is_empty() {
                consumed = end;
                continue;
            }
            match serde_json::from_str::<JsonValue>(candidate) {
                Ok(value) => {
                    // Syntactically whole; a record failing semantic
                    // validation (missing or invalid id) is dropped so it
                    // cannot wedge everything behind it.
                    match Frame::from_value(value) {
                        Ok(frame) => frames.push(frame),
                        Err(e) => warn!("Dropping semantically invalid record: {}", e),
                    }
                    consumed = end;
                }
                Err(_) => {
                    // Cut mid-record; keep from here and retry with the
                    // next chunk prefixed.
                    break;
                }
            }
        }

        self.residual.drain(..consumed);
        frames
    }

    /// End-of-stream: a leftover that never became parseable is discarded,
    /// returned only so callers and tests can diagnose it.
    pub fn finish(self) -> Option<String> {
        let leftover = self.residual;
        if leftover.trim().is_empty() {
            None
        } else {
            warn!("Discarding unparseable trailing fragment ({} bytes)", leftover.len());
            Some(leftover)
        }
    }
}

/// Byte spans of boundary-split record candidates. `}` and `{` are ASCII, so
/// scanning bytes is safe in UTF-8 text.
///
/// Known limitation: the scan does not track string literals, so a field
/// value containing `}` + whitespace + `{` splits in the wrong place and
/// wedges that record and everything after it in the residual until
/// `finish` discards them. A framing delimiter between records, such as a
/// newline, would remove the ambiguity but would change the wire format.
fn candidate_spans(buffer: &str) -> Vec<(usize, usize)> {
    let bytes = buffer.as_bytes();
    let mut spans = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'}' {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'{' {
                spans.push((start, j));
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    spans.push((start, bytes.len()));
    spans
}

/// Consumer loop: reads chunks to completion one at a time and applies each
/// recovered frame, in order, to the conversation. This is the only writer
/// of the conversation state.
pub async fn drive(mut chunks: FrameChunkStream, conversation: Arc<Mutex<Conversation>>) {
    let mut reassembler = FrameReassembler::new();
    while let Some(chunk) = chunks.next().await {
        for frame in reassembler.push(&chunk) {
            let mut guard = conversation.lock().await;
            if !guard.apply(&frame) {
                warn!("Dropping frame for unknown message id {}", frame.id);
            }
        }
    }
    reassembler.finish();
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use crate::models::chat::{ ChatMessage, SearchResult };

    fn frame_sequence(id: Uuid) -> Vec<Frame> {
        vec![
            Frame::thinking(id, "Weather is real-time."),
            Frame::thinking(id, "Weather is real-time.\n\n🌐 Searching the web for: `Paris weather today`"),
            Frame::thinking(id, "Weather is real-time.\n\n✅ Found 2 high-quality sources.").with_sources(
                vec![
                    SearchResult {
                        title: "Paris forecast".into(),
                        url: "https://example.com/paris".into(),
                        content: "Light rain expected.".into(),
                    },
                    SearchResult {
                        title: "Météo Paris".into(),
                        url: "https://example.com/meteo".into(),
                        content: "Averses légères.".into(),
                    }
                ]
            ),
            Frame::thinking(id, "Weather is real-time.\n\n✍️ Generating response...").with_content(""),
            Frame::thinking(id, "Weather is real-time.\n\n✅ Response complete.").with_content(
                "Expect light rain in Paris today. [1]"
            )
        ]
    }

    fn encode_all(frames: &[Frame]) -> String {
        frames
            .iter()
            .map(Frame::encode)
            .collect::<Vec<_>>()
            .join("")
    }

    #[test]
    fn whole_stream_in_one_chunk() {
        let id = Uuid::new_v4();
        let frames = frame_sequence(id);
        let mut reassembler = FrameReassembler::new();
        let recovered = reassembler.push(&encode_all(&frames));
        assert_eq!(recovered, frames);
        assert!(reassembler.finish().is_none());
    }

    #[test]
    fn chunk_boundary_invariance_at_every_split() {
        let id = Uuid::new_v4();
        let frames = frame_sequence(id);
        let wire = encode_all(&frames);

        for split in 0..=wire.len() {
            if !wire.is_char_boundary(split) {
                continue;
            }
            let mut reassembler = FrameReassembler::new();
            let mut recovered = reassembler.push(&wire[..split]);
            recovered.extend(reassembler.push(&wire[split..]));
            assert_eq!(recovered, frames, "diverged at split offset {}", split);
            assert!(reassembler.finish().is_none());
        }
    }

    #[test]
    fn single_byte_chunks_recover_everything() {
        let id = Uuid::new_v4();
        let frames = frame_sequence(id);
        let wire = encode_all(&frames);

        let mut reassembler = FrameReassembler::new();
        let mut recovered = Vec::new();
        let mut buf = [0u8; 4];
        for c in wire.chars() {
            recovered.extend(reassembler.push(c.encode_utf8(&mut buf)));
        }
        assert_eq!(recovered, frames);
    }

    #[test]
    fn whitespace_between_records_is_tolerated() {
        let id = Uuid::new_v4();
        let frames = frame_sequence(id);
        let wire = frames
            .iter()
            .map(Frame::encode)
            .collect::<Vec<_>>()
            .join(" \n\t ");

        let mut reassembler = FrameReassembler::new();
        assert_eq!(reassembler.push(&wire), frames);
    }

    #[test]
    fn incomplete_tail_is_held_until_completed() {
        let id = Uuid::new_v4();
        let frame = Frame::thinking(id, "partial").with_content("answer");
        let wire = frame.encode();
        let (head, tail) = wire.split_at(wire.len() - 5);

        let mut reassembler = FrameReassembler::new();
        assert!(reassembler.push(head).is_empty());
        assert_eq!(reassembler.push(tail), vec![frame]);
    }

    #[test]
    fn record_missing_id_is_dropped_and_later_records_still_apply() {
        let id = Uuid::new_v4();
        let first = Frame::thinking(id, "first");
        let last = Frame::thinking(id, "last");
        let wire = format!(
            "{}{}{}",
            first.encode(),
            r#"{"thinking":"no id on this one"}"#,
            last.encode()
        );

        let mut reassembler = FrameReassembler::new();
        assert_eq!(reassembler.push(&wire), vec![first, last]);
    }

    #[test]
    fn trailing_garbage_is_discarded_at_finish() {
        let id = Uuid::new_v4();
        let frame = Frame::thinking(id, "fine");
        let wire = format!("{}{}", frame.encode(), r#"{"id":"trunc"#);

        let mut reassembler = FrameReassembler::new();
        assert_eq!(reassembler.push(&wire), vec![frame]);
        let leftover = reassembler.finish().unwrap();
        assert!(leftover.contains("trunc"));
    }

    #[tokio::test]
    async fn drive_applies_frames_in_order_to_the_conversation() {
        let id = Uuid::new_v4();
        let frames = frame_sequence(id);
        let wire = encode_all(&frames);

        let conversation = Arc::new(Mutex::new(Conversation::default()));
        conversation.lock().await.push(ChatMessage::assistant_placeholder(id));

        // Re-chunk adversarially: fixed 7-char slices.
        let chunks: Vec<String> = wire
            .chars()
            .collect::<Vec<_>>()
            .chunks(7)
            .map(|c| c.iter().collect())
            .collect();
        let stream: FrameChunkStream = Box::pin(futures::stream::iter(chunks));

        drive(stream, Arc::clone(&conversation)).await;

        let guard = conversation.lock().await;
        let message = guard.get(id).unwrap();
        assert_eq!(message.content, "Expect light rain in Paris today. [1]");
        assert!(message.thinking.contains("✅ Response complete."));
        assert_eq!(message.sources.len(), 2);
    }
}
