//! Output sinks for mirroring streamed answer text.

use std::io::{self, Write};

/// Destination for answer text as it streams in.
///
/// Implemented for every [`Write`], so `io::stdout()` and `Vec<u8>` work
/// directly.
pub trait OutputSink {
    /// Write a text fragment.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink can no longer accept output.
    fn write_text(&mut self, text: &str) -> io::Result<()>;

    /// Write a line terminator.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink can no longer accept output.
    fn write_line_end(&mut self) -> io::Result<()> {
        self.write_text("\n")
    }
}

impl<W: Write> OutputSink for W {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.write_all(text.as_bytes())?;
        self.flush()
    }
}

/// A sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write_text(&mut self, _text: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Mirror that stops writing after the first sink failure.
///
/// A closed downstream (e.g. `| head`) must not fail the run, so errors are
/// logged once and every later write becomes a no-op.
pub(crate) struct Mirror<'a, S: OutputSink + ?Sized> {
    sink: &'a mut S,
    enabled: bool,
}

impl<'a, S: OutputSink + ?Sized> Mirror<'a, S> {
    pub(crate) fn new(sink: &'a mut S, enabled: bool) -> Self {
        Self { sink, enabled }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn write_text(&mut self, text: &str) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.sink.write_text(text) {
            self.disable(&e);
        }
    }

    pub(crate) fn write_line_end(&mut self) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.sink.write_line_end() {
            self.disable(&e);
        }
    }

    fn disable(&mut self, err: &io::Error) {
        tracing::debug!(error = %err, "Output sink closed, no longer mirroring");
        self.enabled = false;
    }
}
