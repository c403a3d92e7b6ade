//! Loading program files into machines.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ls8_core::{Fault, Machine};
use thiserror::Error;

use crate::source::{parse_program, ParseError};

/// Failure to turn a program file into a machine.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The file contents are not a valid program.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The machine rejected the program image.
    #[error("failed to load program: {0}")]
    Machine(#[from] Fault),
}

/// Reads and parses a program file.
///
/// # Errors
///
/// Returns [`LoadError::Io`] when the file cannot be read and
/// [`LoadError::Parse`] when its contents are malformed.
pub fn read_program(path: &Path) -> Result<Vec<u8>, LoadError> {
    let source = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_program(&source)?)
}

/// Parses `source` and loads it into a powered-on machine.
///
/// # Errors
///
/// Returns [`LoadError::Parse`] for malformed source and
/// [`LoadError::Machine`] when the image does not fit in memory.
pub fn load_source(source: &str) -> Result<Machine, LoadError> {
    let program = parse_program(source)?;
    Ok(Machine::load_program(&program)?)
}

/// Reads a program file and loads it into a powered-on machine.
///
/// # Errors
///
/// See [`read_program`] and [`load_source`].
pub fn load_file(path: &Path) -> Result<Machine, LoadError> {
    let program = read_program(path)?;
    Ok(Machine::load_program(&program)?)
}
