//! Unified diff parsing and the addressed index built from it.

pub mod index;
pub mod parser;

pub use index::{DiffIndex, DiffStats, strip_hunk_markers};
pub use parser::{normalize_path, parse};
