//! Incremental extraction of `[[ref:...]]` markers from narration chunks.
//!
//! The narrator's output arrives in arbitrarily sized pieces, so a marker can
//! be split anywhere: inside the opening delimiter, inside the body or inside
//! the closing `]]`. [`RefTokenizer`] keeps one owned buffer and a two-state
//! scanner so that the concatenation of every emitted token (references in
//! their bracketed form) is always the exact input text, whatever the chunking.

pub const OPEN: &str = "[[ref:";
pub const CLOSE: &str = "]]";
/// Longest body a candidate marker may reach before it is treated as text.
pub const MAX_CANDIDATE: usize = 200;
const PATH_SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationToken {
    Prose(String),
    Reference {
        /// Text between the delimiters, untouched.
        body: String,
        /// Text before the first `:` of the body; used for grouping only.
        path_hint: String,
    },
}

impl NarrationToken {
    pub fn reference(body: impl Into<String>) -> Self {
        let body = body.into();
        let path_hint = body
            .split(PATH_SEPARATOR)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        NarrationToken::Reference { body, path_hint }
    }

    /// The source text this token was cut from.
    pub fn literal(&self) -> String {
        match self {
            NarrationToken::Prose(text) => text.clone(),
            NarrationToken::Reference { body, .. } => format!("{OPEN}{body}{CLOSE}"),
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, NarrationToken::Reference { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ScanState {
    #[default]
    Prose,
    /// The opening delimiter was consumed; the buffer holds the body so far.
    Candidate,
}

#[derive(Debug, Default)]
pub struct RefTokenizer {
    buffer: String,
    state: ScanState,
}

impl RefTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and collect every token that is now certain.
    pub fn push(&mut self, chunk: &str) -> Vec<NarrationToken> {
        self.buffer.push_str(chunk);
        let mut out = Vec::new();
        self.scan(&mut out);
        out
    }

    /// Emit whatever is still buffered as prose and reset. Call once at end of
    /// stream.
    pub fn flush(&mut self) -> Vec<NarrationToken> {
        let mut rest = String::new();
        if self.state == ScanState::Candidate {
            rest.push_str(OPEN);
        }
        rest.push_str(&std::mem::take(&mut self.buffer));
        self.state = ScanState::Prose;

        let mut out = Vec::new();
        emit_prose(&mut out, rest);
        out
    }

    fn scan(&mut self, out: &mut Vec<NarrationToken>) {
        loop {
            match self.state {
                ScanState::Prose => match self.buffer.find(OPEN) {
                    Some(at) => {
                        let prose: String = self.buffer.drain(..at).collect();
                        emit_prose(out, prose);
                        self.buffer.drain(..OPEN.len());
                        self.state = ScanState::Candidate;
                    }
                    None => {
                        let keep = pending_open_prefix(&self.buffer);
                        let ready = self.buffer.len() - keep;
                        let prose: String = self.buffer.drain(..ready).collect();
                        emit_prose(out, prose);
                        return;
                    }
                },
                ScanState::Candidate => match self.buffer.find(CLOSE) {
                    Some(at) if self.buffer[..at].chars().count() <= MAX_CANDIDATE => {
                        let body: String = self.buffer.drain(..at).collect();
                        self.buffer.drain(..CLOSE.len());
                        out.push(NarrationToken::reference(body));
                        self.state = ScanState::Prose;
                    }
                    Some(_) => self.abandon(out),
                    // A close can still start on the last buffered char, so
                    // the body is only too long once that cannot fit either.
                    None if self.buffer.chars().count() > MAX_CANDIDATE + CLOSE.len() - 1 => {
                        self.abandon(out)
                    }
                    None => return,
                },
            }
        }
    }

    /// Give the opening delimiter back as text and rescan the body as prose.
    fn abandon(&mut self, out: &mut Vec<NarrationToken>) {
        log::debug!(
            "abandoning unterminated reference marker after {} chars",
            self.buffer.chars().count()
        );
        emit_prose(out, OPEN.to_string());
        self.state = ScanState::Prose;
    }
}

fn emit_prose(out: &mut Vec<NarrationToken>, text: String) {
    if text.is_empty() {
        return;
    }
    // Adjacent prose from the same scan pass reads better as one token.
    if let Some(NarrationToken::Prose(last)) = out.last_mut() {
        last.push_str(&text);
    } else {
        out.push(NarrationToken::Prose(text));
    }
}

/// Length of the longest buffer suffix that could still grow into `OPEN`.
fn pending_open_prefix(buffer: &str) -> usize {
    (1..OPEN.len())
        .rev()
        .find(|&n| buffer.ends_with(&OPEN[..n]))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(chunks: &[&str]) -> Vec<NarrationToken> {
        let mut tokenizer = RefTokenizer::new();
        let mut tokens = Vec::new();
        for chunk in chunks {
            tokens.extend(tokenizer.push(chunk));
        }
        tokens.extend(tokenizer.flush());
        tokens
    }

    fn joined(tokens: &[NarrationToken]) -> String {
        tokens.iter().map(NarrationToken::literal).collect()
    }

    #[test]
    fn test_single_chunk_reference() {
        let tokens = run(&["See [[ref:src/a.rs:hunk:2]] here."]);
        assert_eq!(
            tokens,
            vec![
                NarrationToken::Prose("See ".into()),
                NarrationToken::reference("src/a.rs:hunk:2"),
                NarrationToken::Prose(" here.".into()),
            ]
        );
    }

    #[test]
    fn test_path_hint_is_text_before_first_colon() {
        let token = NarrationToken::reference("src/a.rs:hunk:1:L2-4");
        match token {
            NarrationToken::Reference { path_hint, .. } => assert_eq!(path_hint, "src/a.rs"),
            other => panic!("unexpected token {other:?}"),
        }
        match NarrationToken::reference("README.md") {
            NarrationToken::Reference { path_hint, .. } => assert_eq!(path_hint, "README.md"),
            other => panic!("unexpected token {other:?}"),
        }
    }

    #[test]
    fn test_delimiter_split_across_chunks_is_withheld() {
        let mut tokenizer = RefTokenizer::new();
        assert_eq!(
            tokenizer.push("look [[re"),
            vec![NarrationToken::Prose("look ".into())]
        );
        assert_eq!(
            tokenizer.push("f:a.rs]"),
            Vec::<NarrationToken>::new()
        );
        assert_eq!(
            tokenizer.push("] done"),
            vec![
                NarrationToken::reference("a.rs"),
                NarrationToken::Prose(" done".into())
            ]
        );
        assert!(tokenizer.flush().is_empty());
    }

    #[test]
    fn test_non_prefix_brackets_are_not_withheld() {
        let mut tokenizer = RefTokenizer::new();
        assert_eq!(
            tokenizer.push("array[[x"),
            vec![NarrationToken::Prose("array[[x".into())]
        );
        assert_eq!(
            tokenizer.push("[["),
            Vec::<NarrationToken>::new()
        );
        assert_eq!(tokenizer.flush(), vec![NarrationToken::Prose("[[".into())]);
    }

    #[test]
    fn test_every_split_point_reproduces_input() {
        let texts = [
            "Intro [[ref:src/lib.rs:hunk:1]] then [[ref:src/main.rs:hunk:2:L3-5]] end",
            "[[ref:a]][[ref:b]]",
            "no markers at all, just [brackets] and ]] closers",
            "nested [[ref:a [[ref:b]] tail",
            "unicode → [[ref:ünï.rs:hunk:1]] ✓",
            "trailing [[ref:unfinished",
            "[[[ref:x]]]",
        ];
        for text in texts {
            let whole = run(&[text]);
            assert_eq!(joined(&whole), text);
            let cuts: Vec<usize> = text.char_indices().map(|(i, _)| i).skip(1).collect();
            for &cut in &cuts {
                let tokens = run(&[&text[..cut], &text[cut..]]);
                assert_eq!(joined(&tokens), text, "split at {cut}");
                let refs: Vec<_> = tokens.iter().filter(|t| t.is_reference()).collect();
                let whole_refs: Vec<_> = whole.iter().filter(|t| t.is_reference()).collect();
                assert_eq!(refs, whole_refs, "split at {cut}");
            }
            // One char per chunk.
            let chars: Vec<String> = text.chars().map(String::from).collect();
            let pieces: Vec<&str> = chars.iter().map(String::as_str).collect();
            assert_eq!(joined(&run(&pieces)), text);
        }
    }

    #[test]
    fn test_unterminated_marker_is_abandoned() {
        let body = "x".repeat(MAX_CANDIDATE + 10);
        let text = format!("before [[ref:{body} after [[ref:ok.rs]]");
        let mut tokenizer = RefTokenizer::new();
        let tokens = tokenizer.push(&text);
        assert_eq!(
            tokens.first(),
            Some(&NarrationToken::Prose(format!("before [[ref:{body} after ")))
        );
        assert_eq!(tokens.last(), Some(&NarrationToken::reference("ok.rs")));
        assert!(tokenizer.flush().is_empty());
    }

    #[test]
    fn test_body_at_limit_is_still_a_reference() {
        let body = "y".repeat(MAX_CANDIDATE);
        let text = format!("[[ref:{body}]]");
        let chars: Vec<String> = text.chars().map(String::from).collect();
        let pieces: Vec<&str> = chars.iter().map(String::as_str).collect();
        assert_eq!(run(&pieces), vec![NarrationToken::reference(body)]);
    }

    #[test]
    fn test_close_after_limit_is_prose() {
        let body = "z".repeat(MAX_CANDIDATE + 1);
        let text = format!("[[ref:{body}]]");
        let tokens = run(&[&text]);
        assert!(tokens.iter().all(|t| !t.is_reference()));
        assert_eq!(joined(&tokens), text);
    }

    #[test]
    fn test_flush_emits_partial_candidate_and_resets() {
        let mut tokenizer = RefTokenizer::new();
        assert!(tokenizer.push("[[ref:half").is_empty());
        assert_eq!(
            tokenizer.flush(),
            vec![NarrationToken::Prose("[[ref:half".into())]
        );
        assert_eq!(
            tokenizer.push("[[ref:a]]"),
            vec![NarrationToken::reference("a")]
        );
    }
}
