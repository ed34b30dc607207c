use crate::infra::shell;
use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tokio::process::Command;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubPrRef {
    pub owner: String,
    pub repo: String,
    pub number: u32,
    pub url: String,
}

/// Title, description and commit messages of a pull request, used only as
/// narration context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitHubPrContext {
    pub title: String,
    pub body: String,
    pub commit_messages: Vec<String>,
}

lazy_static! {
    static ref PR_URL_RE: Regex =
        Regex::new(r"^https?://(?:www\.)?github\.com/([^/]+)/([^/]+)/pull/(\d+)")
            .expect("github pr url regex");
    static ref PR_SHORT_RE: Regex =
        Regex::new(r"^([^/\s]+)/([^#\s]+)#(\d+)$").expect("github owner/repo#num regex");
}

/// Accepts `owner/repo#N` or a pull request URL.
pub fn parse_pr_ref(input: &str) -> Option<GitHubPrRef> {
    let trimmed = input.trim();
    let caps = PR_URL_RE
        .captures(trimmed)
        .or_else(|| PR_SHORT_RE.captures(trimmed))?;
    let owner = caps.get(1)?.as_str().to_string();
    let repo = caps.get(2)?.as_str().to_string();
    let number: u32 = caps.get(3)?.as_str().parse().ok()?;
    let url = format!("https://github.com/{owner}/{repo}/pull/{number}");
    Some(GitHubPrRef {
        owner,
        repo,
        number,
        url,
    })
}

async fn gh(args: &[&str]) -> Result<String> {
    let gh_path = shell::find_bin("gh").context("Could not find 'gh' executable")?;
    let output = Command::new(&gh_path)
        .args(args)
        .output()
        .await
        .with_context(|| format!("run `gh {}`", args.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("Authentication") || stderr.contains("not authenticated") {
            anyhow::bail!("GitHub authentication required. Run `gh auth login` first.");
        }
        anyhow::bail!("`gh {}` failed: {}", args[..2.min(args.len())].join(" "), stderr.trim());
    }

    String::from_utf8(output.stdout).context("decode `gh` stdout")
}

pub async fn fetch_pr_diff(pr: &GitHubPrRef) -> Result<String> {
    gh(&["pr", "diff", pr.url.as_str()]).await
}

#[derive(Debug, Deserialize)]
struct GhPrViewJson {
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    commits: Vec<GhCommitJson>,
}

#[derive(Debug, Deserialize)]
struct GhCommitJson {
    #[serde(rename = "messageHeadline", default)]
    headline: String,
    #[serde(rename = "messageBody", default)]
    body: String,
}

fn parse_pr_view(json: &str) -> Result<GitHubPrContext> {
    let parsed: GhPrViewJson = serde_json::from_str(json).context("parse `gh pr view` json")?;
    let commit_messages = parsed
        .commits
        .into_iter()
        .map(|commit| {
            if commit.body.trim().is_empty() {
                commit.headline
            } else {
                format!("{}\n\n{}", commit.headline, commit.body.trim())
            }
        })
        .collect();
    Ok(GitHubPrContext {
        title: parsed.title,
        body: parsed.body,
        commit_messages,
    })
}

pub async fn fetch_pr_context(pr: &GitHubPrRef) -> Result<GitHubPrContext> {
    let json = gh(&["pr", "view", pr.url.as_str(), "--json", "title,body,commits"]).await?;
    parse_pr_view(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pr_ref_valid_url() {
        let pr = parse_pr_ref("https://github.com/rust-lang/rust/pull/12345/files").unwrap();
        assert_eq!(pr.owner, "rust-lang");
        assert_eq!(pr.repo, "rust");
        assert_eq!(pr.number, 12345);
        assert_eq!(pr.url, "https://github.com/rust-lang/rust/pull/12345");
    }

    #[test]
    fn test_parse_pr_ref_valid_short_ref() {
        let pr = parse_pr_ref(" owner/repo#7 ").unwrap();
        assert_eq!((pr.owner.as_str(), pr.repo.as_str(), pr.number), ("owner", "repo", 7));
    }

    #[test]
    fn test_parse_pr_ref_invalid() {
        assert!(parse_pr_ref("owner/repo").is_none());
        assert!(parse_pr_ref("https://gitlab.com/a/b/-/merge_requests/1").is_none());
        assert!(parse_pr_ref("owner/repo#abc").is_none());
    }

    #[test]
    fn test_parse_pr_view_joins_commit_messages() {
        let json = r#"{
            "title": "Add parser",
            "body": "Closes #1",
            "commits": [
                {"messageHeadline": "parse hunks", "messageBody": ""},
                {"messageHeadline": "fix offsets", "messageBody": "Off by one in slices.\n"}
            ]
        }"#;
        let context = parse_pr_view(json).unwrap();
        assert_eq!(context.title, "Add parser");
        assert_eq!(
            context.commit_messages,
            vec!["parse hunks", "fix offsets\n\nOff by one in slices."]
        );
    }
}
