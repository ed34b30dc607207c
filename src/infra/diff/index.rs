//! A module for indexing and querying unified diffs.
//!
//! This module provides a `DiffIndex` built once from a unified diff string.
//! Files are kept in patch order and addressed by path; hunks inside a file
//! are addressed by their 1-based ordinal. The index is read-only after
//! parsing and is shared by the resolver, the enricher and the size check.

use super::parser::{self, normalize_path};
use crate::domain::FileDiff;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref HUNK_MARKER_RE: Regex = Regex::new(r"^\[hunk:\d+\]$").expect("hunk marker regex");
}

/// Aggregate numbers for a parsed diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub files: usize,
    pub hunks: usize,
    pub added: usize,
    pub removed: usize,
    pub lines: usize,
}

/// An index for a unified diff, allowing lookup by path and hunk ordinal.
#[derive(Debug, Clone, Default)]
pub struct DiffIndex {
    files: Vec<FileDiff>,
    positions: HashMap<String, usize>,
}

impl DiffIndex {
    /// Creates a new `DiffIndex` from a unified diff string.
    pub fn new(diff_text: &str) -> Self {
        parser::parse(diff_text)
    }

    /// Adds a file, appending to an existing entry when the patch names the
    /// same path twice so every hunk stays addressable.
    pub(crate) fn insert(&mut self, mut file: FileDiff) {
        match self.positions.get(&file.path) {
            Some(&pos) => {
                let existing = &mut self.files[pos];
                for mut hunk in file.hunks.drain(..) {
                    hunk.ordinal = existing.hunks.len() as u32 + 1;
                    existing.hunks.push(hunk);
                }
            }
            None => {
                self.positions.insert(file.path.clone(), self.files.len());
                self.files.push(file);
            }
        }
    }

    /// Looks a file up by exact path, then by its normalized form.
    pub fn file(&self, path: &str) -> Option<&FileDiff> {
        let pos = self
            .positions
            .get(path)
            .or_else(|| self.positions.get(&normalize_path(path)))?;
        self.files.get(*pos)
    }

    pub fn files(&self) -> impl Iterator<Item = &FileDiff> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total number of hunk body lines; the quantity the size ceiling is
    /// enforced against.
    pub fn total_lines(&self) -> usize {
        self.files.iter().map(FileDiff::line_count).sum()
    }

    pub fn stats(&self) -> DiffStats {
        let mut stats = DiffStats {
            files: self.files.len(),
            ..Default::default()
        };
        for hunk in self.files.iter().flat_map(|f| f.hunks.iter()) {
            stats.hunks += 1;
            stats.added += hunk.added();
            stats.removed += hunk.removed();
            stats.lines += hunk.lines.len();
        }
        stats
    }

    /// Re-serializes the diff with a `[hunk:N]` marker line before each hunk
    /// header, for the narrator to cite.
    pub fn enrich(&self) -> String {
        let mut out = String::new();
        for file in &self.files {
            for line in &file.preamble {
                out.push_str(line);
                out.push('\n');
            }
            for hunk in &file.hunks {
                out.push_str(&format!("[hunk:{}]\n", hunk.ordinal));
                out.push_str(&hunk.original_header);
                out.push('\n');
                for line in &hunk.lines {
                    out.push_str(&line.to_string());
                    out.push('\n');
                }
            }
        }
        out
    }

    /// One line per file listing its addressable hunks, e.g.
    /// `- src/lib.rs: hunks 1-3 (+12 -4)`.
    pub fn hunk_manifest(&self) -> String {
        let mut out = String::new();
        for file in &self.files {
            let added: usize = file.hunks.iter().map(|h| h.added()).sum();
            let removed: usize = file.hunks.iter().map(|h| h.removed()).sum();
            let hunks = match file.hunks.len() {
                0 => "no hunks".to_string(),
                1 => "hunk 1".to_string(),
                n => format!("hunks 1-{n}"),
            };
            out.push_str(&format!(
                "- {}: {} (+{} -{})\n",
                file.path, hunks, added, removed
            ));
        }
        out
    }
}

/// Removes the `[hunk:N]` marker lines `enrich` inserted.
pub fn strip_hunk_markers(enriched: &str) -> String {
    let mut out = String::new();
    for line in enriched.lines() {
        if HUNK_MARKER_RE.is_match(line) {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}
