use futures::Stream;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Fixed-rate prefix reveal over a text that may be replaced underneath.
///
/// Before the first tick nothing is revealed; each tick exposes the next
/// `chars_per_tick` characters until the full text is shown. When the source
/// text changes, the reveal restarts from the beginning of the new text; a
/// fast-arriving sequence of growing texts therefore visibly restarts. That
/// is the accepted trade-off, inherited from the product this renders for.
#[derive(Debug, Clone)]
pub struct Typewriter {
    full: String,
    cursor_chars: usize,
    chars_per_tick: usize,
}

impl Typewriter {
    pub fn new(text: &str, chars_per_tick: usize) -> Self {
        Self {
            full: text.to_string(),
            cursor_chars: 0,
            chars_per_tick: chars_per_tick.max(1),
        }
    }

    /// Replaces the source text. Any change restarts the reveal; an
    /// identical text keeps the current progress.
    pub fn set_text(&mut self, text: &str) {
        if self.full != text {
            self.full = text.to_string();
            self.cursor_chars = 0;
        }
    }

    /// Advances one tick and returns the new prefix, or None once the full
    /// text has already been revealed. Prefix lengths grow strictly
    /// monotonically; stepping is char-based, so multi-byte text is safe.
    pub fn tick(&mut self) -> Option<&str> {
        let total = self.full.chars().count();
        if self.cursor_chars >= total {
            return None;
        }
        self.cursor_chars = (self.cursor_chars + self.chars_per_tick).min(total);
        Some(self.revealed())
    }

    pub fn revealed(&self) -> &str {
        let byte_end = self.full
            .char_indices()
            .nth(self.cursor_chars)
            .map(|(i, _)| i)
            .unwrap_or(self.full.len());
        &self.full[..byte_end]
    }

    pub fn is_complete(&self) -> bool {
        self.cursor_chars >= self.full.chars().count()
    }
}

/// Interval-driven reveal of a fixed text: yields each successive prefix at
/// the given cadence, then ends. Dropping the returned stream closes the
/// channel; the timer task notices on its next send and exits, so the timer
/// is torn down on every exit path.
pub fn reveal_stream(
    text: String,
    chars_per_tick: usize,
    interval: Duration
) -> Pin<Box<dyn Stream<Item = String> + Send>> {
    let (tx, rx) = mpsc::channel::<String>(32);
    tokio::spawn(run_reveal(text, chars_per_tick, interval, tx));
    Box::pin(ReceiverStream::new(rx))
}

async fn run_reveal(
    text: String,
    chars_per_tick: usize,
    interval: Duration,
    tx: mpsc::Sender<String>
) {
    let mut typewriter = Typewriter::new(&text, chars_per_tick);
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match typewriter.tick() {
            Some(prefix) => {
                if tx.send(prefix.to_string()).await.is_err() {
                    return;
                }
            }
            None => {
                return;
            }
        }
    }
}
