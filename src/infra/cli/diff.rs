//! Diff acquisition from various sources.

use crate::infra::vcs::{git, github};
use anyhow::{Context, Result};
use std::io::{IsTerminal, Read};
use std::path::PathBuf;

/// Source of diff input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffSource {
    /// Diff piped in on stdin
    Stdin,

    /// Patch file on disk
    File(PathBuf),

    /// Diff between git refs; `to` defaults to the working tree
    GitDiff { from: String, to: Option<String> },

    /// Current working directory uncommitted changes
    GitStatus,

    /// GitHub PR (owner/repo#number or full URL)
    GitHubPr { reference: String },
}

/// Raw diff text plus the free-text context that travels with it.
#[derive(Debug, Clone, Default)]
pub struct DiffInput {
    pub diff: String,
    pub commit_messages: Vec<String>,
    /// Short human label for logs and headers, e.g. `main..feature`.
    pub description: String,
}

/// Read stdin when something was piped in; `None` on an interactive terminal.
pub fn try_read_stdin() -> Result<Option<String>> {
    if std::io::stdin().is_terminal() {
        return Ok(None);
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read from stdin")?;
    Ok((!buffer.trim().is_empty()).then_some(buffer))
}

/// Acquire diff text (and commit context) from a source.
pub async fn acquire(source: DiffSource) -> Result<DiffInput> {
    match source {
        DiffSource::Stdin => {
            let diff = try_read_stdin()?
                .context("No diff on stdin. Pipe one in, e.g. `git diff | difftour --stdin`.")?;
            Ok(DiffInput {
                diff,
                commit_messages: Vec::new(),
                description: "stdin".to_string(),
            })
        }

        DiffSource::File(path) => {
            let diff = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read patch file {}", path.display()))?;
            Ok(DiffInput {
                diff,
                commit_messages: Vec::new(),
                description: path.display().to_string(),
            })
        }

        DiffSource::GitDiff { from, to } => {
            let diff = git::diff(&from, to.as_deref()).await?;
            if diff.trim().is_empty() {
                anyhow::bail!(
                    "No diff between '{}' and '{}'. The refs may be identical.",
                    from,
                    to.as_deref().unwrap_or("the working tree")
                );
            }
            let head = to.as_deref().unwrap_or("HEAD");
            let commit_messages = match git::commit_messages(&from, head).await {
                Ok(messages) => messages,
                Err(err) => {
                    log::debug!("no commit messages for {from}..{head}: {err:#}");
                    Vec::new()
                }
            };
            Ok(DiffInput {
                diff,
                commit_messages,
                description: format!("{from}..{}", to.as_deref().unwrap_or("working tree")),
            })
        }

        DiffSource::GitStatus => {
            let diff = git::status_diff().await?;
            if diff.trim().is_empty() {
                anyhow::bail!("No uncommitted changes.");
            }
            Ok(DiffInput {
                diff,
                commit_messages: Vec::new(),
                description: "uncommitted changes".to_string(),
            })
        }

        DiffSource::GitHubPr { reference } => {
            let pr = github::parse_pr_ref(&reference).with_context(|| {
                format!("Invalid PR reference '{reference}'. Expected owner/repo#number or URL.")
            })?;
            let diff = github::fetch_pr_diff(&pr).await?;
            if diff.trim().is_empty() {
                anyhow::bail!("PR #{} has no changes.", pr.number);
            }
            let mut commit_messages = Vec::new();
            match github::fetch_pr_context(&pr).await {
                Ok(context) => {
                    let description = format!("{}\n\n{}", context.title, context.body.trim());
                    commit_messages.push(description.trim().to_string());
                    commit_messages.extend(context.commit_messages);
                }
                Err(err) => log::warn!("could not fetch PR details: {err:#}"),
            }
            Ok(DiffInput {
                diff,
                commit_messages,
                description: format!("{}/{}#{}", pr.owner, pr.repo, pr.number),
            })
        }
    }
}
