//! Unified diff parsing on top of [`unidiff::PatchSet`].
//!
//! The patch is first cut into per-file sections. A section keeps its header
//! lines verbatim as the file preamble, and its hunks are handed to
//! `unidiff` on their own, so a section `unidiff` rejects loses its hunks
//! and nothing else. Sections without `---`/`+++` markers (binary files,
//! pure renames) are indexed with no hunks. Parsing never fails.

use super::index::DiffIndex;
use crate::domain::{DiffLine, FileDiff, Hunk, HunkRange, LineKind};
use lazy_static::lazy_static;
use regex::Regex;
use unidiff::PatchSet;

lazy_static! {
    static ref GIT_HEADER_RE: Regex =
        Regex::new(r"^diff --git a/(.*?) b/(.*?)$").expect("git header regex");
}

/// Strip the `a/`, `b/` or `./` prefix a tool put in front of a path.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    trimmed
        .strip_prefix("a/")
        .or_else(|| trimmed.strip_prefix("b/"))
        .unwrap_or(trimmed)
        .to_string()
}

fn is_dev_null(path: &str) -> bool {
    path == "/dev/null" || path == "dev/null"
}

/// Path portion of a `---`/`+++` marker line, without timestamp suffix.
fn marker_path(rest: &str) -> Option<String> {
    let raw = rest.split('\t').next().unwrap_or(rest).trim();
    if raw.is_empty() || is_dev_null(raw) {
        return None;
    }
    Some(normalize_path(raw))
}

/// One file's share of the patch.
#[derive(Default)]
struct Section {
    git_old: Option<String>,
    git_new: Option<String>,
    minus_line: Option<String>,
    plus_line: Option<String>,
    preamble: Vec<String>,
    /// Range headers and hunk bodies, in the form handed to `unidiff`.
    body: Vec<String>,
}

impl Section {
    fn in_hunks(&self) -> bool {
        !self.body.is_empty()
    }

    fn push(&mut self, line: &str) {
        if self.in_hunks() || line.starts_with("@@") {
            if line.starts_with('\\') {
                // "\ No newline at end of file"
                return;
            }
            // Editors strip the lone space off empty context lines.
            let line = if line.is_empty() { " " } else { line };
            self.body.push(line.to_string());
            return;
        }

        if let Some(caps) = GIT_HEADER_RE.captures(line) {
            self.git_old = caps.get(1).map(|m| m.as_str().to_string());
            self.git_new = caps.get(2).map(|m| m.as_str().to_string());
        } else if line.starts_with("--- ") {
            self.minus_line = Some(line.to_string());
        } else if line.starts_with("+++ ") {
            self.plus_line = Some(line.to_string());
        }
        self.preamble.push(line.to_string());
    }

    fn path(&self) -> Option<String> {
        let marker = |line: &Option<String>| {
            line.as_deref()
                .and_then(|l| l.get(4..))
                .and_then(marker_path)
        };
        marker(&self.plus_line)
            .or_else(|| self.git_new.clone().filter(|p| !is_dev_null(p)))
            .or_else(|| marker(&self.minus_line))
            .or_else(|| self.git_old.clone().filter(|p| !is_dev_null(p)))
    }

    fn finish(self) -> Option<FileDiff> {
        let path = self.path()?;
        let hunks = self.hunks(&path);
        Some(FileDiff {
            path,
            preamble: self.preamble,
            hunks,
        })
    }

    fn hunks(&self, path: &str) -> Vec<Hunk> {
        if self.body.is_empty() {
            return Vec::new();
        }
        let (Some(minus), Some(plus)) = (&self.minus_line, &self.plus_line) else {
            log::debug!("{path}: hunks without ---/+++ markers ignored");
            return Vec::new();
        };

        let mut text = format!("{minus}\n{plus}\n");
        for line in &self.body {
            text.push_str(line);
            text.push('\n');
        }
        let mut patch_set = PatchSet::new();
        if let Err(err) = patch_set.parse(&text) {
            log::debug!("{path}: keeping only the hunks parsed before: {err}");
        }

        let headers: Vec<&str> = self
            .body
            .iter()
            .map(String::as_str)
            .filter(|line| line.starts_with("@@"))
            .collect();
        let mut position = 0;
        let mut hunks = Vec::new();
        for file in patch_set.files() {
            for hunk in file.hunks() {
                let raw_header = headers.get(position).copied();
                position += 1;
                let range = match (
                    u32::try_from(hunk.source_start),
                    u32::try_from(hunk.source_length),
                    u32::try_from(hunk.target_start),
                    u32::try_from(hunk.target_length),
                ) {
                    (Ok(old_start), Ok(old_count), Ok(new_start), Ok(new_count)) => HunkRange {
                        old_start,
                        old_count,
                        new_start,
                        new_count,
                        section: hunk.section_header.trim().to_string(),
                    },
                    _ => {
                        log::debug!("{path}: skipping hunk with out-of-range header");
                        continue;
                    }
                };

                let mut lines = Vec::new();
                for line in hunk.lines() {
                    let kind = match line.line_type.as_str() {
                        unidiff::LINE_TYPE_ADDED => LineKind::Added,
                        unidiff::LINE_TYPE_REMOVED => LineKind::Removed,
                        " " | "" => LineKind::Context,
                        other => {
                            log::debug!("{path}: ignoring hunk line of type {other:?}");
                            continue;
                        }
                    };
                    let value = line.value.strip_suffix('\n').unwrap_or(&line.value);
                    lines.push(DiffLine::new(kind, value));
                }

                let prefix = format!("@@ -{}", range.old_start);
                let original_header = raw_header
                    .filter(|raw| {
                        raw.strip_prefix(&prefix)
                            .is_some_and(|rest| rest.starts_with([',', ' ']))
                    })
                    .map(|raw| raw.trim_end().to_string())
                    .unwrap_or_else(|| range.to_string());
                hunks.push(Hunk {
                    ordinal: hunks.len() as u32 + 1,
                    original_header,
                    range,
                    lines,
                });
            }
        }
        hunks
    }
}

fn starts_section(line: &str, next: Option<&str>, current: Option<&Section>) -> bool {
    if line.starts_with("diff --git ") {
        return true;
    }
    // Plain `diff -u` output has no git header; a `---`/`+++` pair opens a
    // file unless the current section is still waiting for its markers.
    line.starts_with("--- ")
        && next.is_some_and(|n| n.starts_with("+++ "))
        && current.is_none_or(|s| s.in_hunks() || s.minus_line.is_some())
}

fn close(section: Option<Section>, index: &mut DiffIndex) {
    if let Some(section) = section {
        match section.finish() {
            Some(file) => index.insert(file),
            None => log::debug!("dropping diff section without a usable path"),
        }
    }
}

/// Parse unified diff text into an addressed index.
pub fn parse(diff_text: &str) -> DiffIndex {
    let mut index = DiffIndex::default();
    let lines: Vec<&str> = diff_text.lines().collect();
    let mut current: Option<Section> = None;

    for (i, &line) in lines.iter().enumerate() {
        if starts_section(line, lines.get(i + 1).copied(), current.as_ref()) {
            close(current.take(), &mut index);
            current = Some(Section::default());
        }
        match current.as_mut() {
            Some(section) => section.push(line),
            None => log::debug!("ignoring text before the first file header: {line:?}"),
        }
    }
    close(current, &mut index);
    index
}
