//! difftour: narrated walkthroughs of a unified diff.
//!
//! A narrator (an LLM CLI) streams prose that embeds `[[ref:...]]` markers.
//! The narration pipeline replaces each marker with the diff code it names,
//! and playback delivers the result continuously or one part at a time.

pub mod application;
pub mod domain;
pub mod infra;
pub mod prompts;
