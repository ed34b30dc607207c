//! Rendering resolved references as terminal or Markdown diff blocks.

use super::resolver::slice_hunk;
use super::tokenizer::{CLOSE, OPEN};
use crate::domain::{DiffLine, Hunk, LineKind, LineRange, ResolvedReference};
use crossterm::style::Stylize;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStyle {
    /// Coloured diff for a terminal.
    #[default]
    Ansi,
    /// Plain text with diffs inside ```diff fences.
    Markdown,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    style: RenderStyle,
}

impl Renderer {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    pub fn prose(&self, text: &str) -> String {
        text.to_string()
    }

    pub fn reference(&self, resolved: &ResolvedReference<'_>) -> String {
        match resolved {
            ResolvedReference::Resolved {
                path,
                hunks,
                line_range,
            } => {
                let mut body = Vec::new();
                self.file_header(path, &mut body);
                let single = hunks.len() == 1;
                for hunk in hunks {
                    match line_range {
                        Some(range) if single => self.slice(hunk, *range, &mut body),
                        _ => self.hunk(hunk, &mut body),
                    }
                }
                self.block(body)
            }
            ResolvedReference::NotFound { path, reason } => {
                let text = format!("warning: [[ref:{path}]]: {reason}");
                match self.style {
                    RenderStyle::Ansi => format!("\n{}\n", text.yellow()),
                    RenderStyle::Markdown => format!("\n> **{text}**\n"),
                }
            }
            ResolvedReference::Malformed { raw_text } => format!("{OPEN}{raw_text}{CLOSE}"),
        }
    }

    fn file_header(&self, path: &str, out: &mut Vec<String>) {
        for line in [
            format!("diff --git a/{path} b/{path}"),
            format!("--- a/{path}"),
            format!("+++ b/{path}"),
        ] {
            out.push(match self.style {
                RenderStyle::Ansi => line.bold().to_string(),
                RenderStyle::Markdown => line,
            });
        }
    }

    fn hunk(&self, hunk: &Hunk, out: &mut Vec<String>) {
        self.range_header(&hunk.original_header, out);
        self.lines(&hunk.lines, out);
    }

    fn slice(&self, hunk: &Hunk, range: LineRange, out: &mut Vec<String>) {
        match slice_hunk(hunk, range) {
            Some(slice) => {
                self.range_header(&slice.range.to_string(), out);
                self.lines(slice.lines, out);
            }
            None => self.range_header(&hunk.original_header, out),
        }
    }

    fn range_header(&self, header: &str, out: &mut Vec<String>) {
        out.push(match self.style {
            RenderStyle::Ansi => header.cyan().to_string(),
            RenderStyle::Markdown => header.to_string(),
        });
    }

    fn lines(&self, lines: &[DiffLine], out: &mut Vec<String>) {
        for line in lines {
            let text = line.to_string();
            out.push(match self.style {
                RenderStyle::Markdown => text,
                RenderStyle::Ansi => match line.kind {
                    LineKind::Added => text.green().to_string(),
                    LineKind::Removed => text.red().to_string(),
                    LineKind::Context => text.dark_grey().to_string(),
                },
            });
        }
    }

    fn block(&self, body: Vec<String>) -> String {
        let body = body.join("\n");
        match self.style {
            RenderStyle::Ansi => format!("\n{body}\n"),
            RenderStyle::Markdown => format!("\n```diff\n{body}\n```\n"),
        }
    }
}
