//! Sources of the "show the next page" signal.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::mpsc;

#[async_trait]
pub trait Continuation: Send {
    /// Waits for the reader to ask for more. Returns `false` once the signal
    /// source is exhausted; callers then stop pacing.
    async fn wait(&mut self) -> bool;
}

/// Enter presses read line by line from a terminal (or any reader).
pub struct TerminalContinuation {
    lines: Lines<BufReader<Box<dyn AsyncRead + Unpin + Send>>>,
}

impl TerminalContinuation {
    pub fn from_reader(reader: impl AsyncRead + Unpin + Send + 'static) -> Self {
        let reader: Box<dyn AsyncRead + Unpin + Send> = Box::new(reader);
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }

    /// Opens the controlling terminal. Falls back to stdin when allowed (it is
    /// not when the diff itself was piped in on stdin).
    pub async fn open(stdin_fallback: bool) -> Option<Self> {
        match tokio::fs::File::open("/dev/tty").await {
            Ok(tty) => Some(Self::from_reader(tty)),
            Err(err) => {
                log::debug!("no controlling terminal: {err}");
                stdin_fallback.then(|| Self::from_reader(tokio::io::stdin()))
            }
        }
    }
}

#[async_trait]
impl Continuation for TerminalContinuation {
    async fn wait(&mut self) -> bool {
        match self.lines.next_line().await {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(err) => {
                log::debug!("continuation input failed: {err}");
                false
            }
        }
    }
}

/// Continuation driven by a channel; each message releases one page.
pub struct ChannelContinuation {
    rx: mpsc::UnboundedReceiver<()>,
}

impl ChannelContinuation {
    pub fn channel() -> (mpsc::UnboundedSender<()>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl Continuation for ChannelContinuation {
    async fn wait(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}
