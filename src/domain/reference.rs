//! Reference addresses emitted by the narrator and their resolution outcomes.

use super::diff::Hunk;
use std::fmt;

/// Inclusive, 1-based range of positions inside a hunk's `lines`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    /// Builds a range, swapping inverted bounds instead of rejecting them.
    pub fn normalized(a: u32, b: u32) -> Self {
        if b < a {
            Self { start: b, end: a }
        } else {
            Self { start: a, end: b }
        }
    }
}

/// A parsed address into the diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    File {
        path: String,
    },
    Hunks {
        path: String,
        start: u32,
        end: u32,
    },
    HunkLines {
        path: String,
        hunk: u32,
        lines: LineRange,
    },
}

impl Reference {
    pub fn path(&self) -> &str {
        match self {
            Reference::File { path }
            | Reference::Hunks { path, .. }
            | Reference::HunkLines { path, .. } => path,
        }
    }
}

/// Why an otherwise well-formed reference could not be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    FileMissing,
    /// `ordinal` is the first requested hunk ordinal absent from the file.
    HunkMissing { ordinal: u32, available: u32 },
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundReason::FileMissing => write!(f, "file is not part of this diff"),
            NotFoundReason::HunkMissing { ordinal, available } => write!(
                f,
                "hunk {ordinal} does not exist (file has {available} hunk{})",
                if *available == 1 { "" } else { "s" }
            ),
        }
    }
}

/// Outcome of resolving one reference against the diff index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedReference<'a> {
    Resolved {
        path: String,
        hunks: Vec<&'a Hunk>,
        line_range: Option<LineRange>,
    },
    NotFound {
        path: String,
        reason: NotFoundReason,
    },
    Malformed {
        raw_text: String,
    },
}
