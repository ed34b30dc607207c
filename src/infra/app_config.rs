use crate::domain::PlaybackMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_NARRATOR: &str = "claude";
pub const DEFAULT_MAX_DIFF_LINES: usize = 5000;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 120;

/// A user-defined command narrator (`[narrators.<id>]`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NarratorConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub narrator: String,
    /// Unset means paged on a terminal, continuous otherwise.
    pub mode: Option<PlaybackMode>,
    pub max_diff_lines: usize,
    pub idle_timeout_secs: u64,
    pub narrators: BTreeMap<String, NarratorConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            narrator: DEFAULT_NARRATOR.to_string(),
            mode: None,
            max_diff_lines: DEFAULT_MAX_DIFF_LINES,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            narrators: BTreeMap::new(),
        }
    }
}

pub fn load_config() -> AppConfig {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => AppConfig::default(),
    }
}

/// Missing file means defaults; a broken one is reported and ignored.
pub fn load_config_from(path: &Path) -> AppConfig {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return AppConfig::default();
    };
    match toml::from_str(&contents) {
        Ok(config) => config,
        Err(err) => {
            log::warn!("ignoring invalid config {}: {err}", path.display());
            AppConfig::default()
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("DIFFTOUR_CONFIG_PATH") {
        return Some(PathBuf::from(path));
    }
    config_dir().map(|dir| dir.join("config.toml"))
}

fn config_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME")
        && !xdg.is_empty()
    {
        return Some(PathBuf::from(xdg).join("difftour"));
    }
    home::home_dir().map(|home| home.join(".config").join("difftour"))
}
