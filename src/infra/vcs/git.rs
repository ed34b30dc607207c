//! Local git invocations.

use crate::infra::shell;
use anyhow::{Context, Result};
use tokio::process::Command;

async fn git(args: &[&str]) -> Result<String> {
    let git_path = shell::find_bin("git").context("Could not find 'git' executable")?;
    let output = Command::new(git_path)
        .args(args)
        .output()
        .await
        .with_context(|| format!("Failed to run git {}", args.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("unknown revision") || stderr.contains("bad revision") {
            anyhow::bail!(
                "Unknown git reference in `git {}`. Run `git branch -a` to see available refs.",
                args.join(" ")
            );
        }
        anyhow::bail!("git {} failed: {}", args.first().unwrap_or(&""), stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// `git diff FROM [TO]`; without `to` the working tree is compared to `from`.
pub async fn diff(from: &str, to: Option<&str>) -> Result<String> {
    let mut args = vec!["diff", "--no-color", "--no-ext-diff", from];
    args.extend(to);
    git(&args).await
}

/// Uncommitted changes, staged and unstaged, against `HEAD`.
pub async fn status_diff() -> Result<String> {
    git(&["diff", "--no-color", "--no-ext-diff", "HEAD"]).await
}

/// Full messages of the commits in `from..to`, oldest first.
pub async fn commit_messages(from: &str, to: &str) -> Result<Vec<String>> {
    let range = format!("{from}..{to}");
    let log = git(&["log", "--reverse", "--format=%B%x00", &range]).await?;
    Ok(split_messages(&log))
}

fn split_messages(log: &str) -> Vec<String> {
    log.split('\0')
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_messages() {
        let log = "first\n\nbody\n\0\nsecond\n\0\n";
        assert_eq!(split_messages(log), vec!["first\n\nbody", "second"]);
        assert!(split_messages("\n\0\n").is_empty());
    }
}
