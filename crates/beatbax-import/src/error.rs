//! [`ImportError`] — the fatal-failure type for the import resolver
//! (`spec.md` §7: "ImportError (cycle detection, invalid sources)").

use thiserror::Error;

/// Everything that can stop import resolution cold.
#[derive(Debug, Error)]
pub enum ImportError {
    /// A source re-appeared while it was already on the resolution stack.
    #[error("import cycle detected: {0}")]
    Cycle(String),

    /// The source's scheme/domain is outside what [`crate::ImportConfig`] allows.
    #[error("import source '{0}' uses a disallowed protocol or domain")]
    Disallowed(String),

    /// A `local:` path resolved outside every allowed search root.
    #[error("local import path '{0}' escapes the allowed search roots")]
    PathEscape(String),

    /// Reading a local file failed.
    #[error("failed to read local import '{source}': {message}")]
    LocalRead {
        /// The import source string as written.
        source: String,
        /// The underlying I/O error text.
        message: String,
    },

    /// Fetching a remote file failed (network error, non-success status,
    /// or the response exceeded `max_file_size`).
    #[error("failed to fetch '{source}': {message}")]
    Fetch {
        /// The import source string as written.
        source: String,
        /// Why the fetch failed.
        message: String,
    },

    /// The imported file was not a valid `.ins` file (failed to parse, or
    /// parsed but contained statements other than `inst`/`import`).
    #[error("'{source}' is not a valid instrument file: {message}")]
    InvalidInsFile {
        /// The import source string as written.
        source: String,
        /// The underlying parse error text.
        message: String,
    },

    /// Two imports defined the same instrument name and `strictMode` is on.
    #[error("instrument '{name}' is defined by more than one import of '{source}'")]
    DuplicateInstrument {
        /// The clashing instrument name.
        name: String,
        /// The import source that introduced the duplicate.
        source: String,
    },
}
