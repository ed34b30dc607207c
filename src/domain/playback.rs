//! How rendered narration is delivered to the reader.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Every fragment is written as soon as it is rendered.
    Continuous,
    /// Output is grouped into blocks released one at a time by the reader.
    Paged,
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackMode::Continuous => write!(f, "continuous"),
            PlaybackMode::Paged => write!(f, "paged"),
        }
    }
}
