//! Built-in CLI agents that can narrate a diff.

use super::CommandNarrator;

/// Claude Code in print mode; the prompt arrives on stdin.
pub fn claude() -> CommandNarrator {
    CommandNarrator::new("claude", "Claude", "claude", ["-p"])
}

/// Codex non-interactive mode, reading the prompt from stdin (`-`).
pub fn codex() -> CommandNarrator {
    CommandNarrator::new("codex", "Codex", "codex", ["exec", "-"])
}

pub fn gemini() -> CommandNarrator {
    CommandNarrator::new("gemini", "Gemini", "gemini", Vec::<String>::new())
}

pub fn builtin() -> Vec<CommandNarrator> {
    vec![claude(), codex(), gemini()]
}
