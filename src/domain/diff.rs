//! Addressed diff structure: files, hunks and their body lines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a hunk body line, taken from its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Context,
    Added,
    Removed,
}

impl LineKind {
    /// The unified-diff prefix byte for this kind of line.
    pub fn prefix(self) -> char {
        match self {
            LineKind::Context => ' ',
            LineKind::Added => '+',
            LineKind::Removed => '-',
        }
    }

    pub fn counts_old(self) -> bool {
        matches!(self, LineKind::Context | LineKind::Removed)
    }

    pub fn counts_new(self) -> bool {
        matches!(self, LineKind::Context | LineKind::Added)
    }
}

/// One physical line of a hunk body, prefix byte stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: LineKind,
    pub content: String,
}

impl DiffLine {
    pub fn new(kind: LineKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.content)
    }
}

/// Old/new line tallies of a run of diff lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounts {
    pub old: u32,
    pub new: u32,
}

impl LineCounts {
    pub fn of(lines: &[DiffLine]) -> Self {
        lines.iter().fold(Self::default(), |mut acc, line| {
            if line.kind.counts_old() {
                acc.old += 1;
            }
            if line.kind.counts_new() {
                acc.new += 1;
            }
            acc
        })
    }
}

/// Parsed form of an `@@ -a,b +c,d @@ section` range header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkRange {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
    /// Trailing section heading after the closing `@@`, without the leading space.
    pub section: String,
}

impl HunkRange {
    /// First old-side line number covered by the hunk.
    ///
    /// A zero-count range names the line *before* the (empty) region, so the
    /// next line to be consumed is one past it.
    pub fn first_old_line(&self) -> u32 {
        first_line(self.old_start, self.old_count)
    }

    pub fn first_new_line(&self) -> u32 {
        first_line(self.new_start, self.new_count)
    }
}

fn first_line(start: u32, count: u32) -> u32 {
    if count == 0 {
        start.saturating_add(1)
    } else {
        start
    }
}

impl fmt::Display for HunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        )?;
        if !self.section.is_empty() {
            write!(f, " {}", self.section)?;
        }
        Ok(())
    }
}

/// A contiguous change region within one file.
///
/// `lines` is the only source of truth for sub-range reconstruction; the
/// ordinal is the only externally addressable identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based position within the file.
    pub ordinal: u32,
    /// Raw range-header text as it appeared in the patch.
    pub original_header: String,
    pub range: HunkRange,
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    pub fn counts(&self) -> LineCounts {
        LineCounts::of(&self.lines)
    }

    pub fn added(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| line.kind == LineKind::Added)
            .count()
    }

    pub fn removed(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| line.kind == LineKind::Removed)
            .count()
    }
}

/// All hunks of one file, in patch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    /// Non-hunk lines preceding the first hunk (`diff --git`, `index`, `---`,
    /// `+++`, rename and binary markers), kept verbatim for re-serialization.
    pub preamble: Vec<String>,
    pub hunks: Vec<Hunk>,
}

impl FileDiff {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            preamble: Vec::new(),
            hunks: Vec::new(),
        }
    }

    pub fn hunk(&self, ordinal: u32) -> Option<&Hunk> {
        // Ordinals are dense and assigned in order, so the position is ordinal-1.
        let idx = usize::try_from(ordinal.checked_sub(1)?).ok()?;
        self.hunks.get(idx).filter(|hunk| hunk.ordinal == ordinal)
    }

    pub fn line_count(&self) -> usize {
        self.hunks.iter().map(|hunk| hunk.lines.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_counts_split_context_into_both_sides() {
        let lines = vec![
            DiffLine::new(LineKind::Context, "a"),
            DiffLine::new(LineKind::Removed, "b"),
            DiffLine::new(LineKind::Added, "c"),
            DiffLine::new(LineKind::Added, "d"),
        ];
        assert_eq!(LineCounts::of(&lines), LineCounts { old: 2, new: 3 });
    }

    #[test]
    fn test_hunk_range_display_keeps_section() {
        let range = HunkRange {
            old_start: 10,
            old_count: 5,
            new_start: 10,
            new_count: 8,
            section: "fn main() {".to_string(),
        };
        assert_eq!(range.to_string(), "@@ -10,5 +10,8 @@ fn main() {");
    }

    #[test]
    fn test_first_line_of_empty_range() {
        let range = HunkRange {
            old_start: 0,
            old_count: 0,
            new_start: 1,
            new_count: 3,
            section: String::new(),
        };
        assert_eq!(range.first_old_line(), 1);
        assert_eq!(range.first_new_line(), 1);
    }

    #[test]
    fn test_file_hunk_lookup_rejects_zero() {
        let file = FileDiff::new("a.rs");
        assert!(file.hunk(0).is_none());
        assert!(file.hunk(1).is_none());
    }
}
