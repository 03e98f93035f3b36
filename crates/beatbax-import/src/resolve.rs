//! Import resolution: `spec.md` §4.H.
//!
//! `import "<source>"` directives name a `local:`, `github:owner/repo/ref/path`,
//! or `http(s)://` `.ins` file. [`resolve_imports`] loads each one (detecting
//! cycles as it recurses), validates it parses under
//! [`ParseMode::InstrumentFile`](beatbax_parser::ParseMode::InstrumentFile),
//! merges its instrument table left-to-right with its own nested imports,
//! and finally lets the enclosing song's own `inst` declarations override
//! anything an import defined. The returned [`Song`] carries the merged
//! `insts` and an empty `imports` list, ready for `beatbax-resolver`.

use std::path::{Path, PathBuf};

use beatbax_common::diag::Diagnostic;
use beatbax_parser::ast::{ImportDirective, InstDecl, Song};
use beatbax_parser::builder::{parse_source, ParseMode};

use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::fetch::ImportFetcher;

/// A classified import source, after stripping its scheme prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Local(String),
    Http(String),
}

fn classify(raw: &str) -> Source {
    if let Some(rest) = raw.strip_prefix("local:") {
        Source::Local(rest.to_string())
    } else if let Some(rest) = raw.strip_prefix("github:") {
        Source::Http(expand_github(rest))
    } else if raw.starts_with("http://") || raw.starts_with("https://") {
        Source::Http(raw.to_string())
    } else {
        Source::Local(raw.to_string())
    }
}

/// `owner/repo/ref/path` -> `https://raw.githubusercontent.com/owner/repo/ref/path`.
fn expand_github(rest: &str) -> String {
    format!("https://raw.githubusercontent.com/{rest}")
}

/// Resolves every `import` directive in `song` (recursively) and returns a
/// copy of `song` with `insts` replaced by the fully merged instrument table
/// and `imports` cleared, plus any non-fatal diagnostics collected along the
/// way (duplicate-instrument-name warnings, chiefly).
///
/// `base_file_path` is the path of the file `song` itself came from, used to
/// resolve its own `local:` imports relative to its directory; pass `None`
/// for a song with no filesystem origin (e.g. one built in memory for a
/// test).
pub fn resolve_imports(
    song: &Song,
    base_file_path: Option<&Path>,
    config: &ImportConfig,
    fetcher: &dyn ImportFetcher,
) -> Result<(Song, Vec<Diagnostic>), ImportError> {
    let mut diagnostics = Vec::new();
    let mut stack: Vec<String> = Vec::new();

    let mut merged: Vec<InstDecl> = Vec::new();
    for import in &song.imports {
        let imported = load_and_merge(import, base_file_path, config, fetcher, &mut stack, &mut diagnostics)?;
        merge_insts(&mut merged, imported, config, &mut diagnostics, &import.source)?;
    }

    // The song's own declarations always win, silently — this is the
    // intended override, not a conflict.
    for own in &song.insts {
        if let Some(existing) = merged.iter_mut().find(|d| d.name == own.name) {
            *existing = own.clone();
        } else {
            merged.push(own.clone());
        }
    }

    let mut result = song.clone();
    result.insts = merged;
    result.imports = Vec::new();
    Ok((result, diagnostics))
}

/// Loads one import's `.ins` file, recursively resolves *its* imports, and
/// returns the combined instrument list (nested imports first, this file's
/// own `insts` layered on top) — still left-to-right, not yet merged into
/// the caller's accumulator.
fn load_and_merge(
    import: &ImportDirective,
    base_file_path: Option<&Path>,
    config: &ImportConfig,
    fetcher: &dyn ImportFetcher,
    stack: &mut Vec<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<InstDecl>, ImportError> {
    let source = classify(&import.source);

    let (canonical, text, nested_base) = match &source {
        Source::Local(rel) => {
            let resolved = resolve_local_path(rel, base_file_path, config)?;
            let canonical = resolved.to_string_lossy().into_owned();
            let text = std::fs::read_to_string(&resolved)
                .map_err(|err| ImportError::LocalRead { source: import.source.clone(), message: err.to_string() })?;
            let nested_base = Some(resolved);
            (canonical, text, nested_base)
        }
        Source::Http(url) => {
            check_remote_allowed(url, config)?;
            let text = fetcher.fetch(url, config.timeout, config.max_file_size)?;
            (url.clone(), text, None)
        }
    };

    if stack.contains(&canonical) {
        let mut path = stack.clone();
        path.push(canonical.clone());
        return Err(ImportError::Cycle(path.join(" -> ")));
    }
    stack.push(canonical);

    let parsed = parse_source(&text, ParseMode::InstrumentFile)
        .map_err(|err| ImportError::InvalidInsFile { source: import.source.clone(), message: err.to_string() })?;
    diagnostics.extend(parsed.diagnostics);

    let mut acc: Vec<InstDecl> = Vec::new();
    for nested in &parsed.song.imports {
        let nested_insts =
            load_and_merge(nested, nested_base.as_deref(), config, fetcher, stack, diagnostics)?;
        merge_insts(&mut acc, nested_insts, config, diagnostics, &nested.source)?;
    }
    merge_insts(&mut acc, parsed.song.insts, config, diagnostics, &import.source)?;

    stack.pop();
    Ok(acc)
}

/// Folds `incoming` into `into` by name, later entries winning. A clash
/// either warns (default) or errors (`strictMode`) — `spec.md` §4.H:
/// "duplicate imported names emit warnings (or errors in strictMode)".
fn merge_insts(
    into: &mut Vec<InstDecl>,
    incoming: Vec<InstDecl>,
    config: &ImportConfig,
    diagnostics: &mut Vec<Diagnostic>,
    context_source: &str,
) -> Result<(), ImportError> {
    for decl in incoming {
        if let Some(existing_idx) = into.iter().position(|d| d.name == decl.name) {
            if config.strict_mode {
                return Err(ImportError::DuplicateInstrument {
                    name: decl.name,
                    source: context_source.to_string(),
                });
            }
            diagnostics.push(Diagnostic::warning(
                format!("instrument '{}' redefined by import '{}'", decl.name, context_source),
                decl.loc,
            ));
            into[existing_idx] = decl;
        } else {
            into.push(decl);
        }
    }
    Ok(())
}

fn check_remote_allowed(url: &str, config: &ImportConfig) -> Result<(), ImportError> {
    if config.https_only && !url.starts_with("https://") {
        return Err(ImportError::Disallowed(url.to_string()));
    }
    if let Some(allowed) = &config.allowed_domains {
        let host = url
            .split("://")
            .nth(1)
            .and_then(|rest| rest.split('/').next())
            .unwrap_or("");
        if !allowed.iter().any(|domain| domain == host) {
            return Err(ImportError::Disallowed(url.to_string()));
        }
    }
    Ok(())
}

/// Resolves a `local:`-prefixed import path against the importing file's
/// own directory and `config.search_paths`, rejecting anything that would
/// land outside every allowed root unless `allow_absolute_paths` is set.
fn resolve_local_path(rel: &str, base_file_path: Option<&Path>, config: &ImportConfig) -> Result<PathBuf, ImportError> {
    let candidate = Path::new(rel);
    if candidate.is_absolute() {
        return if config.allow_absolute_paths {
            Ok(candidate.to_path_buf())
        } else {
            Err(ImportError::PathEscape(rel.to_string()))
        };
    }

    let mut roots: Vec<PathBuf> = Vec::new();
    if let Some(base) = base_file_path {
        if let Some(parent) = base.parent() {
            roots.push(parent.to_path_buf());
        }
    }
    roots.extend(config.search_paths.iter().cloned());
    if roots.is_empty() {
        roots.push(PathBuf::from("."));
    }

    for root in &roots {
        let joined = root.join(rel);
        if !joined.exists() {
            continue;
        }
        let canonical_joined = joined.canonicalize().unwrap_or_else(|_| joined.clone());
        let canonical_root = root.canonicalize().unwrap_or_else(|_| root.clone());
        if canonical_joined.starts_with(&canonical_root) {
            return Ok(canonical_joined);
        }
        return Err(ImportError::PathEscape(rel.to_string()));
    }

    Err(ImportError::LocalRead {
        source: rel.to_string(),
        message: "not found in any search root".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MapFetcher;
    use beatbax_common::diag::SourceLocation;
    use std::io::Write;

    fn loc() -> SourceLocation {
        SourceLocation::point(1, 1)
    }

    fn import(source: &str) -> ImportDirective {
        ImportDirective { source: source.to_string(), loc: loc() }
    }

    #[test]
    fn github_source_expands_to_raw_githubusercontent_url() {
        assert_eq!(
            expand_github("acme/songs/main/lead.ins"),
            "https://raw.githubusercontent.com/acme/songs/main/lead.ins"
        );
    }

    #[test]
    fn https_only_rejects_plain_http() {
        let config = ImportConfig::default();
        let err = check_remote_allowed("http://example.com/a.ins", &config).unwrap_err();
        assert!(matches!(err, ImportError::Disallowed(_)));
    }

    #[test]
    fn allowed_domains_rejects_other_hosts() {
        let config = ImportConfig { allowed_domains: Some(vec!["good.example".to_string()]), ..ImportConfig::default() };
        assert!(check_remote_allowed("https://good.example/a.ins", &config).is_ok());
        assert!(check_remote_allowed("https://evil.example/a.ins", &config).is_err());
    }

    #[test]
    fn local_absolute_path_rejected_without_allow_flag() {
        let config = ImportConfig::default();
        let err = resolve_local_path("/etc/passwd", None, &config).unwrap_err();
        assert!(matches!(err, ImportError::PathEscape(_)));
    }

    #[test]
    fn local_path_outside_search_root_is_an_escape() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("sneaky.ins"), "inst x type=pulse1\n").unwrap();
        let config = ImportConfig { search_paths: vec![dir.path().to_path_buf()], ..ImportConfig::default() };
        let rel = format!("../{}/sneaky.ins", outside.path().file_name().unwrap().to_string_lossy());
        let result = resolve_local_path(&rel, None, &config);
        assert!(result.is_err());
    }

    #[test]
    fn resolves_a_local_ins_file_relative_to_the_importing_file() {
        let dir = tempfile::tempdir().unwrap();
        let shared_path = dir.path().join("shared.ins");
        std::fs::write(&shared_path, "inst lead type=pulse1 duty=25\n").unwrap();
        let song_path = dir.path().join("song.bbx");
        std::fs::write(&song_path, "chip gameboy\n").unwrap();

        let mut song = Song::default();
        song.imports.push(import("local:shared.ins"));

        let config = ImportConfig::default();
        let fetcher = MapFetcher::default();
        let (resolved, diags) = resolve_imports(&song, Some(&song_path), &config, &fetcher).unwrap();

        assert!(diags.is_empty());
        assert_eq!(resolved.insts.len(), 1);
        assert_eq!(resolved.insts[0].name, "lead");
        assert!(resolved.imports.is_empty());
    }

    #[test]
    fn songs_own_instrument_overrides_an_imported_one_silently() {
        let dir = tempfile::tempdir().unwrap();
        let shared_path = dir.path().join("shared.ins");
        std::fs::write(&shared_path, "inst lead type=pulse1 duty=25\n").unwrap();
        let song_path = dir.path().join("song.bbx");

        let mut song = Song::default();
        song.imports.push(import("local:shared.ins"));
        song.insts.push(InstDecl {
            name: "lead".to_string(),
            properties: vec![("type".to_string(), "pulse2".to_string())],
            loc: loc(),
        });

        let config = ImportConfig::default();
        let fetcher = MapFetcher::default();
        let (resolved, diags) = resolve_imports(&song, Some(&song_path), &config, &fetcher).unwrap();

        assert!(diags.is_empty());
        assert_eq!(resolved.insts.len(), 1);
        assert_eq!(resolved.insts[0].properties[0].1, "pulse2");
    }

    #[test]
    fn duplicate_instrument_across_two_imports_warns_by_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ins"), "inst lead type=pulse1\n").unwrap();
        std::fs::write(dir.path().join("b.ins"), "inst lead type=pulse2\n").unwrap();
        let song_path = dir.path().join("song.bbx");

        let mut song = Song::default();
        song.imports.push(import("local:a.ins"));
        song.imports.push(import("local:b.ins"));

        let config = ImportConfig::default();
        let fetcher = MapFetcher::default();
        let (resolved, diags) = resolve_imports(&song, Some(&song_path), &config, &fetcher).unwrap();

        assert_eq!(diags.len(), 1);
        assert_eq!(resolved.insts.len(), 1);
        assert_eq!(resolved.insts[0].properties[0].1, "pulse2");
    }

    #[test]
    fn duplicate_instrument_across_two_imports_errors_in_strict_mode() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ins"), "inst lead type=pulse1\n").unwrap();
        std::fs::write(dir.path().join("b.ins"), "inst lead type=pulse2\n").unwrap();
        let song_path = dir.path().join("song.bbx");

        let mut song = Song::default();
        song.imports.push(import("local:a.ins"));
        song.imports.push(import("local:b.ins"));

        let config = ImportConfig { strict_mode: true, ..ImportConfig::default() };
        let fetcher = MapFetcher::default();
        let err = resolve_imports(&song, Some(&song_path), &config, &fetcher).unwrap_err();
        assert!(matches!(err, ImportError::DuplicateInstrument { .. }));
    }

    #[test]
    fn self_referencing_import_is_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loop.ins");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "import \"local:loop.ins\"").unwrap();
        drop(file);
        let song_path = dir.path().join("song.bbx");

        let mut song = Song::default();
        song.imports.push(import("local:loop.ins"));

        let config = ImportConfig::default();
        let fetcher = MapFetcher::default();
        let err = resolve_imports(&song, Some(&song_path), &config, &fetcher).unwrap_err();
        assert!(matches!(err, ImportError::Cycle(_)));
    }

    #[test]
    fn remote_import_is_fetched_through_the_injected_fetcher() {
        let mut map = std::collections::HashMap::new();
        map.insert("https://raw.githubusercontent.com/acme/songs/main/lead.ins".to_string(), "inst lead type=pulse1\n".to_string());
        let fetcher = MapFetcher(map);

        let mut song = Song::default();
        song.imports.push(import("github:acme/songs/main/lead.ins"));

        let config = ImportConfig::default();
        let (resolved, diags) = resolve_imports(&song, None, &config, &fetcher).unwrap();
        assert!(diags.is_empty());
        assert_eq!(resolved.insts.len(), 1);
    }

    #[test]
    fn non_ins_statements_in_an_import_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.ins"), "pat p = C4\n").unwrap();
        let song_path = dir.path().join("song.bbx");

        let mut song = Song::default();
        song.imports.push(import("local:bad.ins"));

        let config = ImportConfig::default();
        let fetcher = MapFetcher::default();
        let err = resolve_imports(&song, Some(&song_path), &config, &fetcher).unwrap_err();
        assert!(matches!(err, ImportError::InvalidInsFile { .. }));
    }
}
