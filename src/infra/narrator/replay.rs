//! Replays a recorded narration instead of calling a live agent.

use super::{ChunkStream, NarrationEngine, NarrationRequest};
use crate::domain::NarrationError;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;

/// Characters per replayed chunk; small enough to split markers.
pub const DEFAULT_CHUNK_CHARS: usize = 24;

#[derive(Debug, Clone)]
enum Recording {
    File(PathBuf),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct ReplayNarrator {
    recording: Recording,
    chunk_chars: usize,
    delay: Option<Duration>,
}

impl ReplayNarrator {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(Recording::File(path.into()))
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(Recording::Text(text.into()))
    }

    fn new(recording: Recording) -> Self {
        Self {
            recording,
            chunk_chars: DEFAULT_CHUNK_CHARS,
            delay: None,
        }
    }

    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self
    }

    /// Pause between chunks, to mimic a live narrator.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn load(&self) -> Result<String, NarrationError> {
        match &self.recording {
            Recording::Text(text) => Ok(text.clone()),
            Recording::File(path) => Ok(tokio::fs::read_to_string(path).await?),
        }
    }
}

/// Splits on char boundaries into pieces of at most `size` chars.
fn split_chunks(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|piece| piece.iter().collect())
        .collect()
}

#[async_trait]
impl NarrationEngine for ReplayNarrator {
    fn id(&self) -> &str {
        "replay"
    }

    fn display_name(&self) -> &str {
        "Recorded narration"
    }

    fn is_available(&self) -> bool {
        match &self.recording {
            Recording::File(path) => path.is_file(),
            Recording::Text(_) => true,
        }
    }

    async fn stream(&self, _request: NarrationRequest) -> Result<ChunkStream, NarrationError> {
        let text = self.load().await?;
        let chunks = split_chunks(&text, self.chunk_chars);
        log::debug!("replaying {} chars in {} chunks", text.len(), chunks.len());
        let delay = self.delay;
        Ok(futures::stream::iter(chunks)
            .then(move |chunk| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(chunk)
            })
            .boxed())
    }
}
