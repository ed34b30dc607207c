//! Domain types for difftour.
//! The addressed diff model, reference addresses, playback modes and error
//! types shared by the infrastructure and application layers.

pub mod diff;
pub mod error;
pub mod playback;
pub mod reference;

pub use diff::*;
pub use error::*;
pub use playback::*;
pub use reference::*;
