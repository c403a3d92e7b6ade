//! Program loading for the LS-8 virtual machine.

#[cfg(test)]
use tempfile as _;

/// Program-source parsing.
pub mod source;
pub use source::{parse_program, ParseError, ParseErrorKind};

/// File loading into a ready-to-run machine.
pub mod load;
pub use load::{load_file, load_source, read_program, LoadError};

/// Host output and trace sinks writing to `std::io` streams.
pub mod output;
pub use output::{format_trace_line, TracePrinter, WriterOutput};
