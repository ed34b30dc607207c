//! Infrastructure layer (adapters/implementations).
//!
//! Diff parsing, narrator processes, git/GitHub access and configuration.

pub mod app_config;
pub mod cli;
pub mod diff;
pub mod narrator;
pub mod shell;
pub mod vcs;
