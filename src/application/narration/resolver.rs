//! Turning reference bodies into concrete hunks and line slices.

use crate::domain::{
    DiffLine, Hunk, HunkRange, LineCounts, LineRange, NotFoundReason, Reference,
    ResolvedReference,
};
use crate::infra::diff::DiffIndex;
use lazy_static::lazy_static;
use regex::Regex;

/// Context lines kept on each side of a requested line range.
pub const CONTEXT_MARGIN: usize = 2;
const HUNK_KEYWORD: &str = ":hunk:";

lazy_static! {
    static ref HUNK_REF_RE: Regex = Regex::new(
        r"^(?P<path>.+?):hunk:(?P<start>\d+)(?:-(?P<end>\d+))?(?::L(?P<lx>\d+)(?:-(?P<ly>\d+))?)?$"
    )
    .expect("hunk reference regex");
}

/// Parse a reference body (the text between `[[ref:` and `]]`).
///
/// Returns `None` when the body does not follow the address grammar.
pub fn parse_reference(body: &str) -> Option<Reference> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if !body.contains(HUNK_KEYWORD) {
        // A bare path cannot contain the separator, otherwise the address is
        // using some other (unsupported) keyword such as `:line:`.
        if body.contains(':') {
            return None;
        }
        return Some(Reference::File {
            path: body.to_string(),
        });
    }

    let caps = HUNK_REF_RE.captures(body)?;
    let number = |name: &str| -> Option<Option<u32>> {
        match caps.name(name) {
            Some(m) => m.as_str().parse().ok().map(Some),
            None => Some(None),
        }
    };
    let path = caps.name("path")?.as_str().to_string();
    let start = number("start")??;
    let end = number("end")?;
    let lx = number("lx")?;
    let ly = number("ly")?;

    // Inverted hunk ranges are read in ascending order, like line ranges.
    let hunks = LineRange::normalized(start, end.unwrap_or(start));
    match lx {
        Some(lx) if hunks.start == hunks.end => Some(Reference::HunkLines {
            path,
            hunk: hunks.start,
            lines: LineRange::normalized(lx, ly.unwrap_or(lx)),
        }),
        Some(_) => {
            log::debug!("ignoring line range on multi-hunk reference {body:?}");
            Some(Reference::Hunks {
                path,
                start: hunks.start,
                end: hunks.end,
            })
        }
        None => Some(Reference::Hunks {
            path,
            start: hunks.start,
            end: hunks.end,
        }),
    }
}

/// Resolve a reference body against the diff. Total and pure.
pub fn resolve<'a>(body: &str, index: &'a DiffIndex) -> ResolvedReference<'a> {
    let Some(reference) = parse_reference(body) else {
        return ResolvedReference::Malformed {
            raw_text: body.to_string(),
        };
    };
    let Some(file) = index.file(reference.path()) else {
        log::debug!("reference to unknown file {:?}", reference.path());
        return ResolvedReference::NotFound {
            path: reference.path().to_string(),
            reason: NotFoundReason::FileMissing,
        };
    };

    let (start, end, line_range) = match reference {
        Reference::File { .. } => {
            return ResolvedReference::Resolved {
                path: file.path.clone(),
                hunks: file.hunks.iter().collect(),
                line_range: None,
            };
        }
        Reference::Hunks { start, end, .. } => (start, end, None),
        Reference::HunkLines { hunk, lines, .. } => (hunk, hunk, Some(lines)),
    };

    let mut hunks = Vec::new();
    for ordinal in start..=end {
        match file.hunk(ordinal) {
            Some(hunk) => hunks.push(hunk),
            None => {
                log::debug!("{}: hunk {ordinal} not in diff", file.path);
                return ResolvedReference::NotFound {
                    path: file.path.clone(),
                    reason: NotFoundReason::HunkMissing {
                        ordinal,
                        available: file.hunks.len() as u32,
                    },
                };
            }
        }
    }
    ResolvedReference::Resolved {
        path: file.path.clone(),
        hunks,
        line_range,
    }
}

/// A contiguous part of a hunk with a header recomputed for just those lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkSlice<'a> {
    pub range: HunkRange,
    pub lines: &'a [DiffLine],
}

/// Cut `wanted` (plus [`CONTEXT_MARGIN`] lines each side) out of a hunk.
///
/// Out-of-range positions are clamped to the hunk. Returns `None` only for a
/// hunk without body lines.
pub fn slice_hunk(hunk: &Hunk, wanted: LineRange) -> Option<HunkSlice<'_>> {
    let len = hunk.lines.len();
    if len == 0 {
        return None;
    }
    let wanted = LineRange::normalized(wanted.start, wanted.end);
    let clamp = |n: u32| (n as usize).clamp(1, len);
    let first = clamp(wanted.start).saturating_sub(CONTEXT_MARGIN).max(1);
    let last = (clamp(wanted.end) + CONTEXT_MARGIN).min(len);

    let skipped = LineCounts::of(&hunk.lines[..first - 1]);
    let lines = &hunk.lines[first - 1..last];
    let counts = LineCounts::of(lines);

    let range = HunkRange {
        old_start: header_start(
            hunk.range.first_old_line().saturating_add(skipped.old),
            counts.old,
        ),
        old_count: counts.old,
        new_start: header_start(
            hunk.range.first_new_line().saturating_add(skipped.new),
            counts.new,
        ),
        new_count: counts.new,
        section: hunk.range.section.clone(),
    };
    Some(HunkSlice { range, lines })
}

/// Unified diffs name the line *before* an empty side.
fn header_start(first_line: u32, count: u32) -> u32 {
    if count == 0 {
        first_line.saturating_sub(1)
    } else {
        first_line
    }
}
