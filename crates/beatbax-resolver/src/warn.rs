//! Deduplicated warning emission.
//!
//! `spec.md` §4.C: unknown transforms and references are warned about once
//! per distinct message, not once per occurrence — a pattern referencing a
//! missing instrument on every one of its sixteen steps should produce one
//! warning, not sixteen.

use std::collections::HashSet;

use beatbax_common::diag::{Diagnostic, SourceLocation};

/// Reports `message` through `diagnostics` unless an identical message has
/// already been reported during this resolve pass.
pub fn warn_once(
    diagnostics: &mut Vec<Diagnostic>,
    seen: &mut HashSet<String>,
    message: String,
    loc: SourceLocation,
) {
    if seen.insert(message.clone()) {
        diagnostics.push(Diagnostic::warning(message, loc));
    }
}
