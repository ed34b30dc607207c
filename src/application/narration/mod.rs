//! Narration pipeline: chunk text in, rendered fragments out.
//!
//! Chunks go through the [`RefTokenizer`], references are resolved against
//! the shared [`DiffIndex`] and every token is rendered immediately, so the
//! caller only ever deals with display-ready text in source order.

pub mod render;
pub mod resolver;
pub mod tokenizer;

pub use render::{RenderStyle, Renderer};
pub use resolver::{CONTEXT_MARGIN, HunkSlice, parse_reference, resolve, slice_hunk};
pub use tokenizer::{CLOSE, MAX_CANDIDATE, NarrationToken, OPEN, RefTokenizer};

use crate::infra::diff::DiffIndex;
use std::sync::Arc;

/// A token together with its display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub token: NarrationToken,
    pub text: String,
}

impl Fragment {
    /// Prose with at least one non-whitespace character.
    pub fn is_substantive_prose(&self) -> bool {
        matches!(&self.token, NarrationToken::Prose(text) if !text.trim().is_empty())
    }

    pub fn path_hint(&self) -> Option<&str> {
        match &self.token {
            NarrationToken::Reference { path_hint, .. } => Some(path_hint.as_str()),
            NarrationToken::Prose(_) => None,
        }
    }
}

pub struct NarrationPipeline {
    index: Arc<DiffIndex>,
    tokenizer: RefTokenizer,
    renderer: Renderer,
}

impl NarrationPipeline {
    pub fn new(index: Arc<DiffIndex>, style: RenderStyle) -> Self {
        Self {
            index,
            tokenizer: RefTokenizer::new(),
            renderer: Renderer::new(style),
        }
    }

    pub fn push(&mut self, chunk: &str) -> Vec<Fragment> {
        let tokens = self.tokenizer.push(chunk);
        self.render_all(tokens)
    }

    /// Drains the tokenizer at end of stream.
    pub fn finish(&mut self) -> Vec<Fragment> {
        let tokens = self.tokenizer.flush();
        self.render_all(tokens)
    }

    fn render_all(&self, tokens: Vec<NarrationToken>) -> Vec<Fragment> {
        tokens.into_iter().map(|token| self.render(token)).collect()
    }

    fn render(&self, token: NarrationToken) -> Fragment {
        let text = match &token {
            NarrationToken::Prose(text) => self.renderer.prose(text),
            NarrationToken::Reference { body, .. } => {
                self.renderer.reference(&resolve(body, &self.index))
            }
        };
        Fragment { token, text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DIFF: &str = "--- a/a.rs\n+++ b/a.rs\n@@ -1 +1 @@\n-old\n+new\n";

    #[test]
    fn test_pipeline_renders_in_order() {
        let index = Arc::new(DiffIndex::new(DIFF));
        let mut pipeline = NarrationPipeline::new(index, RenderStyle::Markdown);
        let mut fragments = pipeline.push("First [[ref:a.rs:hu");
        fragments.extend(pipeline.push("nk:1]] and [[ref:a.rs:bogus]]."));
        fragments.extend(pipeline.finish());

        let text: String = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(
            text,
            "First \n```diff\ndiff --git a/a.rs b/a.rs\n--- a/a.rs\n+++ b/a.rs\n@@ -1 +1 @@\n-old\n+new\n```\n and [[ref:a.rs:bogus]]."
        );
        assert_eq!(fragments[1].path_hint(), Some("a.rs"));
        assert!(fragments[0].is_substantive_prose());
    }

    #[test]
    fn test_whitespace_prose_is_not_substantive() {
        let fragment = Fragment {
            token: NarrationToken::Prose(" \n\t".into()),
            text: " \n\t".into(),
        };
        assert!(!fragment.is_substantive_prose());
    }
}
