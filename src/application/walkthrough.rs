//! One narrated review run: index the diff, prompt the narrator, play back.

use crate::application::narration::{NarrationPipeline, RenderStyle};
use crate::application::playback::{
    Continuation, PlaybackMode, PlaybackReport, play_continuous, play_paged,
};
use crate::domain::WalkthroughError;
use crate::infra::app_config::DEFAULT_MAX_DIFF_LINES;
use crate::infra::diff::DiffIndex;
use crate::infra::narrator::{DEFAULT_IDLE_TIMEOUT, NarrationEngine, NarrationRequest};
use crate::prompts;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWrite;

#[derive(Debug, Clone)]
pub struct WalkthroughOptions {
    pub mode: PlaybackMode,
    pub style: RenderStyle,
    pub max_diff_lines: usize,
    pub idle_timeout: Duration,
    /// Free text from the user, passed to the narrator as-is.
    pub extra_context: Option<String>,
}

impl Default for WalkthroughOptions {
    fn default() -> Self {
        Self {
            mode: PlaybackMode::Continuous,
            style: RenderStyle::Ansi,
            max_diff_lines: DEFAULT_MAX_DIFF_LINES,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            extra_context: None,
        }
    }
}

/// Parse the diff and enforce the size ceiling.
pub fn index_diff(diff: &str, max_diff_lines: usize) -> Result<DiffIndex, WalkthroughError> {
    let index = DiffIndex::new(diff);
    if index.is_empty() {
        return Err(WalkthroughError::EmptyDiff);
    }
    let lines = index.total_lines();
    if lines > max_diff_lines {
        return Err(WalkthroughError::DiffTooLarge {
            lines,
            limit: max_diff_lines,
        });
    }
    log::debug!(
        "indexed {} files, {} hunks, {lines} lines",
        index.len(),
        index.stats().hunks
    );
    Ok(index)
}

pub fn build_prompt(
    index: &DiffIndex,
    commit_messages: &[String],
    extra_context: Option<&str>,
) -> Result<String, WalkthroughError> {
    let ctx = json!({
        "manifest": index.hunk_manifest(),
        "diff": index.enrich(),
        "commit_messages": commit_messages,
        "extra_context": extra_context,
    });
    prompts::render("narrate", &ctx).map_err(|e| WalkthroughError::Prompt(e.to_string()))
}

/// Runs a whole review. Paged mode needs a continuation source; without one
/// the run falls back to continuous playback.
pub async fn run<W, P>(
    narrator: &dyn NarrationEngine,
    index: DiffIndex,
    commit_messages: &[String],
    options: &WalkthroughOptions,
    sink: &mut W,
    prompt_out: &mut P,
    continuation: Option<&mut dyn Continuation>,
) -> Result<PlaybackReport, WalkthroughError>
where
    W: AsyncWrite + Unpin,
    P: AsyncWrite + Unpin,
{
    let prompt = build_prompt(&index, commit_messages, options.extra_context.as_deref())?;
    let request = NarrationRequest::new(prompt).with_idle_timeout(options.idle_timeout);
    log::debug!("narrating with {}", narrator.id());
    let chunks = narrator.stream(request).await?;

    let pipeline = NarrationPipeline::new(Arc::new(index), options.style);
    let report = match (options.mode, continuation) {
        (PlaybackMode::Paged, Some(continuation)) => {
            play_paged(chunks, pipeline, sink, prompt_out, continuation).await?
        }
        (PlaybackMode::Paged, None) => {
            log::debug!("no continuation input available; playing continuously");
            play_continuous(chunks, pipeline, sink).await?
        }
        (PlaybackMode::Continuous, _) => play_continuous(chunks, pipeline, sink).await?,
    };
    log::debug!(
        "played {} fragments ({} references) in {} blocks",
        report.fragments,
        report.references,
        report.blocks
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIFF: &str = "--- a/a.rs\n+++ b/a.rs\n@@ -1,2 +1,2 @@\n-x\n+y\n z\n";

    #[test]
    fn test_index_diff_rejects_empty() {
        assert!(matches!(
            index_diff("\n", 10),
            Err(WalkthroughError::EmptyDiff)
        ));
    }

    #[test]
    fn test_index_diff_enforces_ceiling() {
        assert!(matches!(
            index_diff(DIFF, 2),
            Err(WalkthroughError::DiffTooLarge { lines: 3, limit: 2 })
        ));
        assert_eq!(index_diff(DIFF, 3).unwrap().total_lines(), 3);
    }

    #[test]
    fn test_build_prompt_includes_markers_and_context() {
        let index = index_diff(DIFF, 100).unwrap();
        let prompt = build_prompt(&index, &["fix z".to_string()], Some("be brief")).unwrap();
        assert!(prompt.contains("[hunk:1]\n@@ -1,2 +1,2 @@"));
        assert!(prompt.contains("- a.rs: hunk 1 (+1 -1)"));
        assert!(prompt.contains("fix z"));
        assert!(prompt.contains("be brief"));
    }
}
