//! Import resolution configuration (`spec.md` §6 "Import sources").

use std::path::PathBuf;
use std::time::Duration;

/// Knobs governing which imports the resolver is willing to follow and how
/// aggressively it enforces them.
///
/// Constructed directly for library use, or from `beatbax-cli`'s `clap`
/// flags (`SPEC_FULL.md` Ambient stack: "a plain struct with `Default`,
/// constructible from CLI flags or library use").
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Reject plain `http://` remote sources when `true`.
    pub https_only: bool,
    /// If set, only these exact hostnames may be fetched from.
    pub allowed_domains: Option<Vec<String>>,
    /// Maximum response size, in bytes, for a remote fetch.
    pub max_file_size: Option<u64>,
    /// Per-request network timeout.
    pub timeout: Duration,
    /// Extra roots `local:` imports are resolved against, in addition to
    /// the importing file's own directory.
    pub search_paths: Vec<PathBuf>,
    /// Allow `local:` sources with an absolute path to escape the search
    /// roots entirely. Off by default — `spec.md` §4.H: "must stay inside
    /// allowed roots unless `allowAbsolutePaths`".
    pub allow_absolute_paths: bool,
    /// Promote duplicate-instrument-name warnings to hard errors.
    pub strict_mode: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            https_only: true,
            allowed_domains: None,
            max_file_size: Some(1024 * 1024),
            timeout: Duration::from_secs(10),
            search_paths: Vec::new(),
            allow_absolute_paths: false,
            strict_mode: false,
        }
    }
}
