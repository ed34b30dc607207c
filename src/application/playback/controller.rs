//! Delivering rendered narration to the output sink.
//!
//! Continuous playback writes each fragment as it is rendered. Paged playback
//! splits the work in two: a producer task drains the narration stream into
//! an append-only [`BlockList`] and never waits for the reader, while the
//! consumer copies new text of the current block to the sink and waits for a
//! [`Continuation`] before moving past a finished block.

use super::blocks::BlockList;
use super::continuation::Continuation;
use crate::application::narration::{Fragment, NarrationPipeline};
use crate::domain::{NarrationError, WalkthroughError};
use crate::infra::narrator::ChunkStream;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;

/// What a playback run delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub fragments: usize,
    pub references: usize,
    pub blocks: usize,
}

pub async fn play_continuous<W>(
    mut chunks: ChunkStream,
    mut pipeline: NarrationPipeline,
    sink: &mut W,
) -> Result<PlaybackReport, WalkthroughError>
where
    W: AsyncWrite + Unpin,
{
    let mut report = PlaybackReport::default();
    while let Some(chunk) = chunks.next().await {
        let fragments = pipeline.push(&chunk?);
        write_fragments(sink, &fragments, &mut report).await?;
    }
    let fragments = pipeline.finish();
    write_fragments(sink, &fragments, &mut report).await?;
    Ok(report)
}

async fn write_fragments<W>(
    sink: &mut W,
    fragments: &[Fragment],
    report: &mut PlaybackReport,
) -> Result<(), WalkthroughError>
where
    W: AsyncWrite + Unpin,
{
    for fragment in fragments {
        sink.write_all(fragment.text.as_bytes()).await?;
        report.fragments += 1;
        if fragment.token.is_reference() {
            report.references += 1;
        }
    }
    if !fragments.is_empty() {
        sink.flush().await?;
    }
    Ok(())
}

#[derive(Default)]
struct Progress {
    blocks: BlockList,
    fragments: usize,
    references: usize,
    finished: bool,
    /// The producer panicked; no more text will arrive.
    aborted: bool,
    error: Option<NarrationError>,
}

#[derive(Default)]
struct Shared {
    progress: Mutex<Progress>,
    wake: Notify,
}

/// Marks the run finished however the producer exits, a panic included.
struct FinishGuard(Arc<Shared>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        let mut progress = self.0.progress.lock();
        progress.finished = true;
        progress.aborted |= std::thread::panicking();
        drop(progress);
        self.0.wake.notify_one();
    }
}

/// Drains the narration stream into the block list, whatever the reader does.
async fn produce(shared: Arc<Shared>, mut chunks: ChunkStream, mut pipeline: NarrationPipeline) {
    let _finish = FinishGuard(shared.clone());
    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(text) => {
                let fragments = pipeline.push(&text);
                append(&shared, &fragments);
            }
            Err(err) => {
                log::debug!("narration stream failed: {err}");
                shared.progress.lock().error = Some(err);
                return;
            }
        }
    }
    let fragments = pipeline.finish();
    append(&shared, &fragments);
}

fn append(shared: &Shared, fragments: &[Fragment]) {
    if fragments.is_empty() {
        return;
    }
    {
        let mut progress = shared.progress.lock();
        for fragment in fragments {
            progress.blocks.append(fragment);
            progress.fragments += 1;
            if fragment.token.is_reference() {
                progress.references += 1;
            }
        }
    }
    shared.wake.notify_one();
}

/// One look at the shared state from the consumer's side.
struct Snapshot {
    tail: String,
    /// Files of block `current + 1`, present once the current block is sealed.
    next_files: Option<Vec<String>>,
    finished: bool,
    aborted: bool,
    error: Option<NarrationError>,
}

pub async fn play_paged<W, P>(
    chunks: ChunkStream,
    pipeline: NarrationPipeline,
    sink: &mut W,
    prompt: &mut P,
    continuation: &mut dyn Continuation,
) -> Result<PlaybackReport, WalkthroughError>
where
    W: AsyncWrite + Unpin,
    P: AsyncWrite + Unpin,
{
    let shared = Arc::new(Shared::default());
    let producer = tokio::spawn(produce(shared.clone(), chunks, pipeline));

    let mut current = 0usize;
    let mut printed = 0usize;
    let mut paced = true;
    let mut failure = None;

    loop {
        let snapshot = {
            let mut progress = shared.progress.lock();
            let tail = progress
                .blocks
                .get(current)
                .map(|block| block.text[printed..].to_string())
                .unwrap_or_default();
            Snapshot {
                tail,
                next_files: progress.blocks.get(current + 1).map(|b| b.files.clone()),
                finished: progress.finished,
                aborted: progress.aborted,
                error: progress.error.take(),
            }
        };

        if !snapshot.tail.is_empty() {
            sink.write_all(snapshot.tail.as_bytes()).await?;
            sink.flush().await?;
            printed += snapshot.tail.len();
        }
        if let Some(err) = snapshot.error {
            // The transport died; show what already arrived, then fail.
            paced = false;
            failure = Some(err);
        }
        if snapshot.aborted {
            paced = false;
        }

        if let Some(files) = snapshot.next_files {
            if paced {
                let text = continuation_prompt(current + 2, &files);
                prompt.write_all(text.as_bytes()).await?;
                prompt.flush().await?;
                if !continuation.wait().await {
                    log::debug!("continuation input closed; playing the rest unpaced");
                    paced = false;
                }
            }
            current += 1;
            printed = 0;
            continue;
        }

        if snapshot.finished {
            break;
        }
        shared.wake.notified().await;
    }

    if let Err(err) = producer.await {
        log::warn!("narration producer task failed: {err}");
        return Err(anyhow::anyhow!("narration producer task failed: {err}").into());
    }
    if let Some(err) = failure {
        return Err(err.into());
    }

    let progress = shared.progress.lock();
    Ok(PlaybackReport {
        fragments: progress.fragments,
        references: progress.references,
        blocks: progress.blocks.len(),
    })
}

fn continuation_prompt(next_block: usize, files: &[String]) -> String {
    if files.is_empty() {
        format!("\n[Enter] continue to part {next_block}\n")
    } else {
        format!(
            "\n[Enter] continue to part {next_block}: {}\n",
            files.join(", ")
        )
    }
}
