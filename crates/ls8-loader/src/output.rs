//! `std::io` backed sinks for printed values and execution traces.

use std::fmt::Write as _;
use std::io::{self, Write};

use ls8_core::{OutputError, OutputSink, TraceEvent, TraceSink};

/// Output sink printing each value as a decimal line.
#[derive(Debug)]
pub struct WriterOutput<W: Write> {
    writer: W,
    error: Option<io::Error>,
}

impl<W: Write> WriterOutput<W> {
    /// Wraps `writer`.
    pub const fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
        }
    }

    /// Takes the I/O error behind the most recent rejected value.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Flushes the writer and returns it.
    ///
    /// # Errors
    ///
    /// Returns the error behind a rejected value if there was one, otherwise
    /// the flush error.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> OutputSink for WriterOutput<W> {
    fn emit(&mut self, value: u8) -> Result<(), OutputError> {
        writeln!(self.writer, "{value}").map_err(|err| {
            self.error = Some(err);
            OutputError::WriteFailed
        })
    }
}

/// Formats an instruction-start event as
/// `TRACE: PC | IR A B | R0 .. R7` with two hex digits per field.
///
/// Returns `None` for other events.
#[must_use]
pub fn format_trace_line(event: &TraceEvent) -> Option<String> {
    let TraceEvent::InstructionStart {
        pc,
        ir,
        operand_a,
        operand_b,
        registers,
    } = event
    else {
        return None;
    };

    let mut line = format!("TRACE: {pc:02X} | {ir:02X} {operand_a:02X} {operand_b:02X} |");
    for value in registers {
        let _ = write!(line, " {value:02X}");
    }
    Some(line)
}

/// Trace sink writing one line per executed instruction.
///
/// Write failures are ignored; tracing never affects execution.
#[derive(Debug)]
pub struct TracePrinter<W: Write> {
    writer: W,
}

impl<W: Write> TracePrinter<W> {
    /// Wraps `writer`.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for TracePrinter<W> {
    fn on_event(&mut self, event: TraceEvent) {
        if let Some(line) = format_trace_line(&event) {
            let _ = writeln!(self.writer, "{line}");
        }
    }
}
