pub mod producer;
pub mod consumer;

use futures::Stream;
use std::pin::Pin;

/// Raw producer output: UTF-8 text chunks carrying back-to-back encoded
/// frames. Chunk boundaries carry no meaning; the consumer must reassemble.
pub type FrameChunkStream = Pin<Box<dyn Stream<Item = String> + Send>>;
