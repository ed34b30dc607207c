//! Narrators backed by a CLI agent process.
//!
//! The prompt is written to the child's stdin and its stdout is streamed back
//! byte-exact as it arrives, decoded lossily as UTF-8. Stderr is forwarded to
//! the log and kept for the error report when the process exits
//! unsuccessfully.

use super::{ChunkStream, NarrationEngine, NarrationRequest};
use crate::domain::NarrationError;
use crate::infra::shell::{find_bin, is_installed};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;

/// Stderr lines kept for the failure message.
const STDERR_TAIL: usize = 20;
const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone)]
pub struct CommandNarrator {
    id: String,
    display_name: String,
    command: String,
    args: Vec<String>,
}

impl CommandNarrator {
    pub fn new<I, S>(
        id: impl Into<String>,
        display_name: impl Into<String>,
        command: impl Into<String>,
        args: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl NarrationEngine for CommandNarrator {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn is_available(&self) -> bool {
        is_installed(&self.command)
    }

    async fn stream(&self, request: NarrationRequest) -> Result<ChunkStream, NarrationError> {
        let bin = find_bin(&self.command).ok_or_else(|| NarrationError::Unavailable(self.id.clone()))?;
        log::debug!("spawn: {}", self.command_line());

        let mut cmd = Command::new(&bin);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| NarrationError::Spawn {
            command: self.command_line(),
            source,
        })?;
        log::debug!("spawned pid: {}", child.id().unwrap_or(0));

        let missing = |name: &str| {
            NarrationError::Io(std::io::Error::other(format!("narrator {name} not captured")))
        };
        let mut stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

        // Written from its own task so a large prompt cannot deadlock against
        // a child that starts writing before it finished reading.
        let prompt = request.prompt;
        tokio::spawn(async move {
            if let Err(err) = stdin.write_all(prompt.as_bytes()).await {
                log::warn!("failed to send prompt to narrator: {err}");
            }
        });

        let stderr_tail = Arc::new(Mutex::new(VecDeque::new()));
        let tail = stderr_tail.clone();
        let id = self.id.clone();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                log::warn!("{id} stderr: {line}");
                let mut tail = tail.lock();
                if tail.len() == STDERR_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        });

        let output = ProcessOutput {
            stdout,
            pending: Vec::new(),
            child: Some(child),
            stderr_tail,
            stderr_task: Some(stderr_task),
            idle_timeout: request.idle_timeout,
        };
        Ok(futures::stream::unfold(output, ProcessOutput::next).boxed())
    }
}

struct ProcessOutput {
    stdout: ChildStdout,
    /// Bytes of a UTF-8 sequence cut off by the last read.
    pending: Vec<u8>,
    /// `None` once the stream has ended or failed.
    child: Option<Child>,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    stderr_task: Option<JoinHandle<()>>,
    idle_timeout: Duration,
}

impl ProcessOutput {
    async fn next(mut self) -> Option<(Result<String, NarrationError>, Self)> {
        self.child.as_ref()?;
        let mut buf = [0u8; READ_CHUNK];
        let err = loop {
            match tokio::time::timeout(self.idle_timeout, self.stdout.read(&mut buf)).await {
                Ok(Ok(0)) => {
                    if !self.pending.is_empty() {
                        let rest = std::mem::take(&mut self.pending);
                        let text = String::from_utf8_lossy(&rest).into_owned();
                        return Some((Ok(text), self));
                    }
                    match self.exit().await {
                        Ok(()) => return None,
                        Err(err) => break err,
                    }
                }
                Ok(Ok(n)) => {
                    self.pending.extend_from_slice(&buf[..n]);
                    let text = take_decoded(&mut self.pending);
                    if !text.is_empty() {
                        return Some((Ok(text), self));
                    }
                }
                Ok(Err(err)) => break NarrationError::Io(err),
                Err(_) => break NarrationError::IdleTimeout(self.idle_timeout.as_secs()),
            }
        };
        // Dropping the child kills it (kill_on_drop).
        self.child = None;
        Some((Err(err), self))
    }

    async fn exit(&mut self) -> Result<(), NarrationError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().await?;
        if let Some(task) = self.stderr_task.take() {
            let _ = task.await;
        }
        log::debug!("narrator exited with {status}");
        if status.success() {
            return Ok(());
        }
        let stderr = self
            .stderr_tail
            .lock()
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        Err(NarrationError::ProcessFailed {
            status: status.to_string(),
            stderr,
        })
    }
}

/// Decode everything in `pending` except a trailing incomplete UTF-8
/// sequence, which stays behind for the next read. Invalid bytes become
/// U+FFFD.
fn take_decoded(pending: &mut Vec<u8>) -> String {
    let mut split = pending.len();
    for back in 1..=pending.len().min(3) {
        let at = pending.len() - back;
        let byte = pending[at];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let needed = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        if needed > back {
            split = at;
        }
        break;
    }
    let rest = pending.split_off(split);
    let text = String::from_utf8_lossy(pending).into_owned();
    *pending = rest;
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[test]
    fn test_split_multibyte_sequence_waits_for_the_rest() {
        let bytes = "né".as_bytes();
        let mut pending = bytes[..2].to_vec();
        assert_eq!(take_decoded(&mut pending), "n");
        assert_eq!(pending, vec![bytes[1]]);
        pending.extend_from_slice(&bytes[2..]);
        assert_eq!(take_decoded(&mut pending), "é");
        assert!(pending.is_empty());
    }

    #[test]
    fn test_invalid_bytes_are_replaced() {
        let mut pending = b"ok \xff done\r\n".to_vec();
        assert_eq!(take_decoded(&mut pending), "ok \u{FFFD} done\r\n");
        assert!(pending.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_streams_stdout_verbatim() {
        let narrator = CommandNarrator::new("cat", "Cat", "cat", Vec::<String>::new());
        let stream = narrator
            .stream(NarrationRequest::new("one\ntwo [[ref:a.rs]]\n"))
            .await
            .unwrap();
        let chunks: Vec<String> = stream.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), "one\ntwo [[ref:a.rs]]\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_crlf_unterminated_and_invalid_output_kept() {
        let narrator = CommandNarrator::new(
            "raw",
            "Raw",
            "sh",
            ["-c", "printf 'a\\r\\nb \\377 end'"],
        );
        let stream = narrator.stream(NarrationRequest::new("")).await.unwrap();
        let chunks: Vec<String> = stream.try_collect().await.unwrap();
        assert_eq!(chunks.concat(), "a\r\nb \u{FFFD} end");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_process_failed() {
        let narrator = CommandNarrator::new(
            "failing",
            "Failing",
            "sh",
            ["-c", "echo partial; echo boom >&2; exit 3"],
        );
        let mut stream = narrator.stream(NarrationRequest::new("")).await.unwrap();
        let mut text = String::new();
        let failure = loop {
            match stream.next().await {
                Some(Ok(chunk)) => text.push_str(&chunk),
                other => break other,
            }
        };
        assert_eq!(text, "partial\n");
        match failure {
            Some(Err(NarrationError::ProcessFailed { stderr, .. })) => assert_eq!(stderr, "boom"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(stream.next().await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_idle_timeout() {
        let narrator = CommandNarrator::new("slow", "Slow", "sh", ["-c", "sleep 5"]);
        let request = NarrationRequest::new("").with_idle_timeout(Duration::from_millis(50));
        let mut stream = narrator.stream(request).await.unwrap();
        assert!(matches!(
            stream.next().await,
            Some(Err(NarrationError::IdleTimeout(_)))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_command_is_unavailable() {
        let narrator = CommandNarrator::new("ghost", "Ghost", "difftour_missing_cli_123", ["-p"]);
        assert!(!narrator.is_available());
        assert!(matches!(
            narrator.stream(NarrationRequest::new("x")).await,
            Err(NarrationError::Unavailable(id)) if id == "ghost"
        ));
    }
}
