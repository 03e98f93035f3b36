//! `beatbax verify <file>` (`spec.md` §6): exits 0 on success, 2 on
//! failure, printing per-error lines to stderr.

use std::path::Path;
use std::process::ExitCode;

use beatbax_common::diag::Severity;

use crate::pipeline::load_song;

/// Runs the `verify` subcommand, returning the process exit code directly
/// rather than propagating through `anyhow` — a failed verification is an
/// expected outcome, not a bug in the CLI itself.
pub fn run(file: &Path) -> ExitCode {
    let loaded = match load_song(file) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::from(2);
        }
    };

    let mut saw_error = false;
    for diagnostic in &loaded.diagnostics {
        eprintln!("{}", diagnostic.render());
        if diagnostic.severity == Severity::Error {
            saw_error = true;
        }
    }

    if saw_error {
        ExitCode::from(2)
    } else {
        println!("{} is valid ({} diagnostic(s))", file.display(), loaded.diagnostics.len());
        ExitCode::SUCCESS
    }
}
