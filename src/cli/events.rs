//! Event types from Claude Code stream-json output.
//!
//! Claude Code emits one JSON object per line when run with
//! `--output-format stream-json`. Only `assistant` events carry answer text;
//! every other event is decoded loosely and otherwise ignored.

use serde::{Deserialize, Serialize};

/// System event data (e.g. the `init` event at session start).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemEvent {
    /// Event subtype (e.g., "init").
    pub subtype: Option<String>,
    /// Session identifier.
    pub session_id: Option<String>,
    /// Model reported by the CLI.
    pub model: Option<String>,
}

/// Final result event data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultEvent {
    /// Result subtype (e.g., "success", "error").
    pub subtype: Option<String>,
    /// Session identifier.
    pub session_id: Option<String>,
    /// Total cost in USD.
    pub total_cost_usd: Option<f64>,
    /// Whether an error occurred.
    pub is_error: bool,
    /// Total duration in milliseconds.
    pub duration_ms: Option<u64>,
    /// Number of conversation turns.
    pub num_turns: Option<u32>,
}

/// Events emitted by Claude Code in stream-json format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClaudeEvent {
    /// System event.
    System(SystemEvent),
    /// Assistant message event.
    Assistant {
        /// Message body (flexible structure).
        #[serde(default)]
        message: serde_json::Value,
    },
    /// User message event (tool results echoed back to the model).
    User {
        /// Message body.
        #[serde(default)]
        message: serde_json::Value,
    },
    /// Final result event.
    Result(ResultEvent),
    /// Catch-all for unknown event types.
    #[serde(other)]
    Unknown,
}

impl ClaudeEvent {
    /// Text payloads of an assistant message, in content order.
    ///
    /// Parts that are not `{"type":"text","text":<string>}` are skipped
    /// individually. Non-assistant events yield nothing.
    pub fn text_parts(&self) -> impl Iterator<Item = &str> {
        let content = match self {
            Self::Assistant { message } => message.get("content").and_then(|c| c.as_array()),
            _ => None,
        };

        content.into_iter().flatten().filter_map(|part| {
            if part.get("type").and_then(serde_json::Value::as_str) != Some("text") {
                return None;
            }
            part.get("text").and_then(serde_json::Value::as_str)
        })
    }

    /// Returns true if this is a terminal event (Result).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Result(_))
    }

    /// Returns the session ID if available.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::System(system) => system.session_id.as_deref(),
            Self::Result(result) => result.session_id.as_deref(),
            _ => None,
        }
    }
}
