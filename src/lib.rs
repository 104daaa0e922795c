//! Claude Runner - run Claude Code non-interactively under supervision.
//!
//! The runner spawns `claude -p <prompt> --output-format stream-json`,
//! rebuilds the answer from the streamed assistant events, and stops the
//! process if it goes quiet or the caller cancels.

pub mod cli;
pub mod config;
pub mod display;
pub mod output;
pub mod supervisor;

pub use output::{NullSink, OutputSink};
pub use supervisor::{run_claude, RunError, RunOptions, Runner};
