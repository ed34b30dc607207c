//! Narration engines: external producers of prose interleaved with
//! `[[ref:...]]` markers.
//!
//! Every engine exposes the same capability, a stream of text chunks for a
//! prompt. Engines are picked by id from an explicit [`NarratorRegistry`].

pub mod agents;
pub mod command;
pub mod registry;
pub mod replay;

pub use command::CommandNarrator;
pub use registry::NarratorRegistry;
pub use replay::ReplayNarrator;

use crate::domain::NarrationError;
use crate::infra::app_config::DEFAULT_IDLE_TIMEOUT_SECS;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::time::Duration;

/// Ordered narration chunks. An `Err` item is fatal and ends the stream.
pub type ChunkStream = BoxStream<'static, Result<String, NarrationError>>;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS);

#[derive(Debug, Clone)]
pub struct NarrationRequest {
    /// Fully rendered instruction prompt, diff included.
    pub prompt: String,
    /// Longest silence tolerated between two chunks.
    pub idle_timeout: Duration,
}

impl NarrationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

#[async_trait]
pub trait NarrationEngine: Send + Sync {
    /// The unique ID of the narrator (e.g. "claude", "codex")
    fn id(&self) -> &str;

    fn display_name(&self) -> &str;

    /// Whether the narrator can run on this machine right now.
    fn is_available(&self) -> bool;

    /// Start narrating. Errors here mean nothing was started.
    async fn stream(&self, request: NarrationRequest) -> Result<ChunkStream, NarrationError>;
}
