//! Error types for difftour.
//!
//! Only the narration transport and run setup can fail. Parsing, tokenizing,
//! resolving and rendering degrade instead of erroring, so they have no
//! error type here.

use thiserror::Error;

/// Failures of the narration transport. Any of these ends the run.
#[derive(Debug, Error)]
pub enum NarrationError {
    #[error("Narrator '{0}' is not installed or not on PATH")]
    Unavailable(String),

    #[error("Failed to spawn narrator '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Narrator I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Narrator exited with {status}: {stderr}")]
    ProcessFailed { status: String, stderr: String },

    #[error("Narrator produced no output for {0}s")]
    IdleTimeout(u64),
}

/// Run-level failures surfaced to the CLI.
#[derive(Debug, Error)]
pub enum WalkthroughError {
    #[error("The diff is empty; nothing to review")]
    EmptyDiff,

    #[error("Diff has {lines} changed lines, above the limit of {limit}")]
    DiffTooLarge { lines: usize, limit: usize },

    #[error("Unknown narrator '{id}'. Known narrators: {}", known.join(", "))]
    UnknownNarrator { id: String, known: Vec<String> },

    #[error("Failed to render prompt: {0}")]
    Prompt(String),

    #[error("Narration failed: {0}")]
    Narration(#[from] NarrationError),

    #[error("Output failed: {0}")]
    Output(#[from] std::io::Error),

    #[error("Walkthrough failed: {0}")]
    OperationFailed(#[from] anyhow::Error),
}
