//! Explicit, id-keyed set of narrators.

use super::{CommandNarrator, NarrationEngine, agents};
use crate::domain::WalkthroughError;
use crate::infra::app_config::NarratorConfig;
use std::collections::BTreeMap;

pub struct NarratorRegistry {
    narrators: Vec<Box<dyn NarrationEngine>>,
}

impl NarratorRegistry {
    pub fn new() -> Self {
        Self {
            narrators: Vec::new(),
        }
    }

    /// Built-ins plus the command narrators declared in config. A configured
    /// id replaces a built-in of the same name.
    pub fn with_configured(configured: &BTreeMap<String, NarratorConfig>) -> Self {
        let mut registry = Self::default();
        for (id, narrator) in configured {
            registry.register(Box::new(CommandNarrator::new(
                id.clone(),
                narrator.display_name.clone().unwrap_or_else(|| id.clone()),
                narrator.command.clone(),
                narrator.args.clone(),
            )));
        }
        registry
    }

    pub fn register(&mut self, narrator: Box<dyn NarrationEngine>) {
        match self.narrators.iter().position(|n| n.id() == narrator.id()) {
            Some(pos) => self.narrators[pos] = narrator,
            None => self.narrators.push(narrator),
        }
    }

    pub fn narrators(&self) -> &[Box<dyn NarrationEngine>] {
        &self.narrators
    }

    pub fn ids(&self) -> Vec<String> {
        self.narrators.iter().map(|n| n.id().to_string()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&dyn NarrationEngine> {
        self.narrators
            .iter()
            .find(|narrator| narrator.id() == id)
            .map(|narrator| narrator.as_ref())
    }

    /// Validated lookup used by the CLI.
    pub fn select(&self, id: &str) -> Result<&dyn NarrationEngine, WalkthroughError> {
        self.get(id).ok_or_else(|| WalkthroughError::UnknownNarrator {
            id: id.to_string(),
            known: self.ids(),
        })
    }
}

impl Default for NarratorRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        for narrator in agents::builtin() {
            registry.register(Box::new(narrator));
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_registry_has_builtins() {
        let registry = NarratorRegistry::default();
        assert_eq!(registry.ids(), vec!["claude", "codex", "gemini"]);
        assert_eq!(registry.select("codex").unwrap().display_name(), "Codex");
    }

    #[test]
    fn test_select_unknown_lists_known_ids() {
        let registry = NarratorRegistry::default();
        let err = registry.select("gpt").err().unwrap();
        assert_eq!(
            err.to_string(),
            "Unknown narrator 'gpt'. Known narrators: claude, codex, gemini"
        );
    }

    #[test]
    fn test_configured_narrators_extend_and_override() {
        let mut configured = BTreeMap::new();
        configured.insert(
            "claude".to_string(),
            NarratorConfig {
                command: "claude".into(),
                args: vec!["-p".into(), "--verbose".into()],
                display_name: Some("Claude (verbose)".into()),
            },
        );
        configured.insert(
            "local".to_string(),
            NarratorConfig {
                command: "ollama".into(),
                args: vec!["run".into()],
                display_name: None,
            },
        );
        let registry = NarratorRegistry::with_configured(&configured);
        assert_eq!(registry.ids(), vec!["claude", "codex", "gemini", "local"]);
        assert_eq!(registry.select("claude").unwrap().display_name(), "Claude (verbose)");
        assert_eq!(registry.select("local").unwrap().display_name(), "local");
    }
}
