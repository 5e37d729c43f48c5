//! `wrsync-cli` library half: the run pipeline, shared with integration tests.

pub mod pipeline;

pub use pipeline::{Commits, Pipeline, Planned, RunOptions};
