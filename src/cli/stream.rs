//! Line reading and parsing for Claude Code output streams.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::cli::ClaudeEvent;

/// Error type for stream parsing.
#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    /// The line was blank after trimming.
    #[error("Empty line")]
    Empty,
    /// The line was not a decodable event.
    #[error("Failed to parse JSON: {reason}")]
    ParseError { input: String, reason: String },
}

/// Newline-delimited reader over a child pipe.
///
/// Lines may be arbitrarily long and are decoded as lossy UTF-8, so invalid
/// bytes never end the stream. A trailing `\r` is stripped. `next_line` is
/// cancel-safe: bytes read before a cancelled poll are kept for the next call.
#[derive(Debug)]
pub struct LineReader<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Wrap a readable pipe.
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            pending: Vec::new(),
        }
    }

    /// Read the next line, or `None` at end of stream.
    ///
    /// An unterminated final line is returned before `None`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the pipe cannot be read.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.reader.read_until(b'\n', &mut self.pending).await?;
        if self.pending.is_empty() {
            return Ok(None);
        }

        let mut bytes = std::mem::take(&mut self.pending);
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

/// Parser for stream-json lines.
pub struct StreamParser;

impl StreamParser {
    /// Parse a single line of stream-json output.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::Empty` for blank lines and
    /// `StreamError::ParseError` if the line is not a valid event.
    pub fn parse_line(line: &str) -> Result<ClaudeEvent, StreamError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(StreamError::Empty);
        }

        serde_json::from_str(trimmed).map_err(|e| StreamError::ParseError {
            input: trimmed.to_string(),
            reason: e.to_string(),
        })
    }
}
