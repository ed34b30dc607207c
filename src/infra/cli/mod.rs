//! CLI-side collaborators: turning command-line choices into diff input.

pub mod diff;
