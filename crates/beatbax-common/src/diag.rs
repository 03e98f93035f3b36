//! Source locations and diagnostics shared by the parser, resolver, and
//! import resolver.
//!
//! `spec.md` §7 splits failures into fatal errors (`ParseError`,
//! `ImportError`, `PlaybackError`) and non-fatal `ResolveWarning`s that are
//! "collected... never fatal". [`Diagnostic`] models the latter (and is also
//! reused to carry the message text fatal errors wrap); [`SourceLocation`]
//! is the `{start:{line,column}, end}` span every parsed node carries.

use std::fmt;

/// A single `{line, column}` position, 1-based to match the convention the
/// teacher's and sibling DSL crates use for human-facing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
}

impl Position {
    /// Builds a position.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A `{start, end}` span. Every AST node (`spec.md` §4.B Contracts: "Every
/// node carries a source location") and every [`Diagnostic`] carries one of
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceLocation {
    /// Span start.
    pub start: Position,
    /// Span end.
    pub end: Position,
}

impl SourceLocation {
    /// Builds a span from explicit start/end positions.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Builds a zero-width span at a single position, for callers that don't
    /// track an end column separately (most statement-level diagnostics).
    pub fn point(line: u32, column: u32) -> Self {
        let pos = Position::new(line, column);
        Self { start: pos, end: pos }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    /// A `ResolveWarning`-class issue: collected, never fatal.
    Warning,
    /// An error that halts the current operation (parse/import/playback).
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if *self == Self::Warning { "warning" } else { "error" })
    }
}

/// A diagnostic message with a source location, rendered for humans by
/// [`Diagnostic::render`] and carried structurally everywhere else.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    /// Warning or error.
    pub severity: Severity,
    /// Human-readable message, no trailing punctuation.
    pub message: String,
    /// Where in the source this diagnostic points.
    pub loc: SourceLocation,
}

impl Diagnostic {
    /// Builds a warning-severity diagnostic.
    pub fn warning(message: String, loc: SourceLocation) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            loc,
        }
    }

    /// Builds an error-severity diagnostic.
    pub fn error(message: String, loc: SourceLocation) -> Self {
        Self {
            severity: Severity::Error,
            message,
            loc,
        }
    }

    /// Renders `"warning at 3:1: unknown instrument 'bass'"`-style text for
    /// CLI/diagnostics-channel display (`spec.md` §7: "warnings appear in a
    /// diagnostics channel with source locations").
    pub fn render(&self) -> String {
        format!("{} at {}: {}", self.severity, self.loc, self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Callback sink warnings are reported through (`spec.md` §4.C / §7:
/// "Resolver collects warnings through an injected `onWarn` callback").
/// Implemented by `Vec<Diagnostic>` so tests can just collect, and by the
/// CLI's eprintln-based sink for interactive use.
pub trait DiagSink {
    /// Records a diagnostic.
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// A [`DiagSink`] that immediately prints each diagnostic to stderr, used by
/// the CLI (`spec.md` §7: warnings "appear in a diagnostics channel").
#[derive(Debug, Default)]
pub struct EprintlnSink;

impl DiagSink for EprintlnSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        eprintln!("{}", diagnostic.render());
    }
}
