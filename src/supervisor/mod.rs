//! Supervision of a single Claude Code run.

mod error;
mod liveness;
mod runner;
mod state;

pub use error::*;
pub use liveness::*;
pub use runner::*;
pub use state::*;
