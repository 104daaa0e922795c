//! Colored diagnostics for the terminal.
//!
//! Everything here goes to stderr. Stdout carries only the answer text, so
//! `claude-runner ... | other-tool` never sees a diagnostic.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::supervisor::TerminationReason;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn emit(line: &str) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{line}");
    let _ = stderr.flush();
}

/// Format a forced termination notice.
#[must_use]
pub fn format_termination(reason: &TerminationReason) -> String {
    format!(
        "{} {} {}",
        timestamp().dimmed(),
        "[TERMINATED]".red().bold(),
        reason
    )
}

/// Print that the supervisor had to kill Claude.
pub fn print_termination(reason: &TerminationReason) {
    emit(&format_termination(reason));
}

/// Print an error message.
pub fn print_error(message: &str) {
    emit(&format!("{} {}", "[ERROR]".red().bold(), message));
}

/// Print command usage.
pub fn print_usage(program: &str) {
    emit(&format!(
        "{} {program} \"your question\"",
        "Usage:".yellow().bold()
    ));
}
