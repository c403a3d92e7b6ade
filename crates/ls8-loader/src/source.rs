//! Program source format.
//!
//! A program file holds one byte per line written as an ASCII binary literal.
//! Everything after `#` is a comment, surrounding whitespace is ignored and
//! lines left empty are skipped. Bytes are stored from address 0 in file
//! order.

use std::fmt;

use ls8_core::MEMORY_BYTES;
use thiserror::Error;

/// Why a source line was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The line contains something other than binary digits.
    InvalidBinaryLiteral(String),
    /// The literal does not fit in one byte.
    LiteralTooWide(String),
    /// The program has more bytes than memory has cells.
    ProgramTooLarge,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBinaryLiteral(text) => write!(f, "invalid binary literal `{text}`"),
            Self::LiteralTooWide(text) => write!(f, "literal `{text}` is wider than 8 bits"),
            Self::ProgramTooLarge => {
                write!(f, "program is larger than {MEMORY_BYTES} bytes of memory")
            }
        }
    }
}

/// A rejected source line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// 1-indexed line number in the source text.
    pub line: usize,
    /// What was wrong with the line.
    pub kind: ParseErrorKind,
}

/// Parses program source into the bytes to load at address 0.
///
/// # Errors
///
/// Returns a [`ParseError`] naming the first offending line.
pub fn parse_program(source: &str) -> Result<Vec<u8>, ParseError> {
    let mut program = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let text = raw.split('#').next().unwrap_or_default().trim();
        if text.is_empty() {
            continue;
        }

        let byte = parse_literal(text).map_err(|kind| ParseError { line, kind })?;
        if program.len() == MEMORY_BYTES {
            return Err(ParseError {
                line,
                kind: ParseErrorKind::ProgramTooLarge,
            });
        }
        program.push(byte);
    }

    Ok(program)
}

fn parse_literal(text: &str) -> Result<u8, ParseErrorKind> {
    if !text.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(ParseErrorKind::InvalidBinaryLiteral(text.to_string()));
    }

    let significant = text.trim_start_matches('0');
    if significant.len() > 8 {
        return Err(ParseErrorKind::LiteralTooWide(text.to_string()));
    }
    if significant.is_empty() {
        return Ok(0);
    }

    u8::from_str_radix(significant, 2)
        .map_err(|_| ParseErrorKind::InvalidBinaryLiteral(text.to_string()))
}
