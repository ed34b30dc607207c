//! Version-control collaborators that supply diff text and commit context.

pub mod git;
pub mod github;
