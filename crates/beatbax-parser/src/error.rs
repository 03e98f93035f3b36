//! Parse failures.
//!
//! `spec.md` §4.B: parsing "fails with `ParseError{message, location}` when
//! the line is not a recognized form" — unlike resolver-level issues, a
//! parse error is always fatal and halts the whole song.

use beatbax_common::diag::SourceLocation;
use thiserror::Error;

/// A fatal parse failure, anchored to the line that caused it.
#[derive(Debug, Clone, Error)]
#[error("parse error at {location}: {message}")]
pub struct ParseError {
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Where in the source the failure occurred.
    pub location: SourceLocation,
}

impl ParseError {
    /// Builds a parse error at a given location.
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}
