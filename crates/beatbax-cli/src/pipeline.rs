//! The shared parse → import → resolve pipeline every subcommand runs.

use std::path::Path;

use anyhow::{Context, Result};
use beatbax_common::diag::Diagnostic;
use beatbax_import::{resolve_imports, ImportConfig, ReqwestFetcher};
use beatbax_parser::builder::{parse_source, ParseMode};
use beatbax_resolver::{resolve, ResolvedSong};

/// Everything a loaded song carries: the resolved ISM plus every
/// diagnostic collected along the way (parser warnings, import warnings,
/// resolver warnings), in the order they were produced.
pub struct LoadedSong {
    /// The fully-resolved Intermediate Song Model.
    pub ism: ResolvedSong,
    /// Non-fatal diagnostics gathered while loading.
    pub diagnostics: Vec<Diagnostic>,
}

/// Reads `path`, parses it as a full song, resolves its imports, and
/// resolves it into an ISM. Parse and import failures are fatal
/// (`spec.md` §7); resolver issues degrade to diagnostics on the result.
pub fn load_song(path: &Path) -> Result<LoadedSong> {
    let source = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let parsed = parse_source(&source, ParseMode::Song)
        .map_err(|err| anyhow::anyhow!("{err}"))
        .with_context(|| format!("parsing {}", path.display()))?;
    let mut diagnostics = parsed.diagnostics;

    let import_config = ImportConfig::default();
    let fetcher = ReqwestFetcher;
    let (song, import_diagnostics) = resolve_imports(&parsed.song, Some(path), &import_config, &fetcher)
        .map_err(|err| anyhow::anyhow!("{err}"))
        .with_context(|| format!("resolving imports for {}", path.display()))?;
    diagnostics.extend(import_diagnostics);

    let (ism, resolve_diagnostics) = resolve(&song);
    diagnostics.extend(resolve_diagnostics);

    Ok(LoadedSong { ism, diagnostics })
}
