//! Paced or continuous delivery of rendered narration.

pub mod blocks;
pub mod continuation;
pub mod controller;

pub use crate::domain::PlaybackMode;
pub use blocks::{Block, BlockList};
pub use continuation::{ChannelContinuation, Continuation, TerminalContinuation};
pub use controller::{PlaybackReport, play_continuous, play_paged};
