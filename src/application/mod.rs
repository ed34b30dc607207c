//! Application layer (use-cases, policies).
//!
//! Turns narration chunks into rendered diff fragments and delivers them at
//! the reader's pace. Depends on the domain types and the diff index only;
//! subprocesses and terminals are reached through traits.

pub mod narration;
pub mod playback;
pub mod walkthrough;
