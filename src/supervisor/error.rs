//! Error types for supervised runs.

use crate::cli::SpawnError;
use crate::supervisor::TerminationReason;

/// Error type for a supervised Claude run.
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    /// The prompt was empty or whitespace only. Nothing was spawned.
    #[error("prompt must be a non-empty string")]
    InvalidInput,

    /// The process could not be started.
    #[error("spawn error: {0}")]
    Spawn(#[from] SpawnError),

    /// The process was killed by a signal.
    #[error("claude terminated by signal: {signal}")]
    Signal { signal: String },

    /// The process exited with a non-zero status.
    #[error("claude exited with code {code}")]
    AbnormalExit { code: i32 },

    /// The supervisor terminated the process and it did not exit in time.
    #[error("claude terminated: {reason}")]
    Terminated { reason: TerminationReason },

    /// The exit status could not be collected.
    #[error("failed to wait for claude: {0}")]
    Wait(#[source] std::io::Error),
}
