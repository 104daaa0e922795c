//! Configuration types.

use serde::{Deserialize, Serialize};

use crate::cli::DEFAULT_PROGRAM;

/// Runner configuration loaded from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Program to run.
    pub program: String,
    /// Arguments placed before the Claude arguments.
    pub program_args: Vec<String>,
    /// Idle timeout in seconds.
    pub timeout_secs: u64,
    /// Mirror answer text to stdout while it streams.
    pub stream_output: bool,
    /// Pass `--verbose` to Claude Code.
    pub verbose: bool,
    /// Copy Claude's stderr to our stderr.
    pub forward_stderr: bool,
    /// Seconds between SIGTERM and SIGKILL.
    pub grace_period_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            program_args: Vec::new(),
            timeout_secs: 600,
            stream_output: true,
            verbose: true,
            forward_stderr: false,
            grace_period_secs: 5,
        }
    }
}
