//! All error types for the pocodec crate.
//!
//! Syntax problems inside a PO stream are deliberately *not* part of
//! [`Error`]: the parser recovers from them and records them as
//! [`SyntaxError`] entries in its error log, so one bad line never aborts a
//! whole import. Everything that is fatal to the current operation (resource
//! access, batch resumption, malformed headers) is an [`Error`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A write to the underlying resource failed. Carries the first ~20
    /// characters of the payload that could not be written.
    #[error("unable to write data: {0:?}")]
    WriteFailed(String),

    /// A batch cursor could not be restored. Callers must treat this as a
    /// hard batch abort, never as a silent restart.
    #[error("cannot resume batch: {0}")]
    Resumption(String),

    #[error("malformed header: {0}")]
    Header(String),

    #[error("invalid Plural-Forms formula: {0}")]
    PluralForms(String),

    #[error("invalid data: {0}")]
    DataMismatch(String),

    /// Batch state could not be serialized.
    #[error("state error: {0}")]
    State(#[from] serde_json::Error),
}

impl Error {
    /// Creates a write failure carrying a short preview of the lost payload.
    pub(crate) fn write_failed(payload: &str) -> Self {
        Error::WriteFailed(payload.chars().take(20).collect())
    }
}

/// One recovered syntax problem, keyed by the line it occurred on.
///
/// Collected by [`crate::reader::PoFileReader`] while parsing continues on
/// the next line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub line: u64,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: u64, message: impl Into<String>) -> Self {
        SyntaxError {
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_display() {
        let error = Error::Io(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        assert!(error.to_string().contains("I/O error"));
    }

    #[test]
    fn test_write_failed_preview_is_truncated() {
        let error = Error::write_failed("msgid \"a very long message id that keeps going\"");
        match &error {
            Error::WriteFailed(preview) => assert_eq!(preview.chars().count(), 20),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(error.to_string().contains("unable to write data"));
    }

    #[test]
    fn test_resumption_error_display() {
        let error = Error::Resumption("file vanished".to_string());
        assert_eq!(error.to_string(), "cannot resume batch: file vanished");
    }

    #[test]
    fn test_syntax_error_display() {
        let error = SyntaxError::new(12, "\"msgstr\" was expected");
        assert_eq!(error.to_string(), "line 12: \"msgstr\" was expected");
    }
}
