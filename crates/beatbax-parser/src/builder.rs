//! Folds a flat statement stream into a [`Song`].

use beatbax_common::diag::Diagnostic;
use beatbax_common::notes::note_to_midi;

use crate::ast::{Metadata, Song};
use crate::error::ParseError;
use crate::statements::{parse_line, Statement};

/// Which grammar subset a source file is parsed under.
///
/// `.ins` files (`spec.md` §4.B / §4.H) are restricted to `inst` and
/// `import` statements; anything else in one is a [`ParseError`] rather
/// than a silently-ignored line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// A full song source file: every statement kind is valid.
    Song,
    /// An instrument-library (`.ins`) file: only `inst` and `import`.
    InstrumentFile,
}

/// The result of a successful parse: the typed [`Song`] plus any
/// non-fatal diagnostics collected along the way (currently just the
/// ambiguous-pattern-name warning).
#[derive(Debug, Clone)]
pub struct ParseOutput {
    /// The parsed song.
    pub song: Song,
    /// Non-fatal diagnostics gathered during parsing.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parses a full source string under the given [`ParseMode`].
pub fn parse_source(source: &str, mode: ParseMode) -> Result<ParseOutput, ParseError> {
    let mut song = Song::default();
    let mut diagnostics = Vec::new();

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = (idx + 1) as u32;
        let Some(statement) = parse_line(raw_line, line_no)? else {
            continue;
        };

        if mode == ParseMode::InstrumentFile {
            match &statement {
                Statement::Inst(_) | Statement::Import(_) => {}
                _ => {
                    return Err(ParseError::new(
                        "instrument files may only contain 'inst' and 'import' statements",
                        beatbax_common::diag::SourceLocation::point(line_no, 1),
                    ));
                }
            }
        }

        fold_statement(&mut song, statement, &mut diagnostics);
    }

    Ok(ParseOutput { song, diagnostics })
}

fn fold_statement(song: &mut Song, statement: Statement, diagnostics: &mut Vec<Diagnostic>) {
    match statement {
        Statement::Chip(name) => song.chip = Some(name),
        Statement::Bpm(v) => song.bpm = Some(v),
        Statement::Volume(v) => song.volume = Some(v),
        Statement::Time(b, u) => song.time_signature = Some((b, u)),
        Statement::SongName(n) => song.metadata.name = Some(n),
        Statement::SongArtist(a) => song.metadata.artist = Some(a),
        Statement::SongTags(t) => song.metadata.tags = t,
        Statement::SongDescription(d) => song.metadata.description = Some(d),
        Statement::Import(i) => song.imports.push(i),
        Statement::Inst(i) => song.insts.push(i),
        Statement::Effect(e) => song.effect_presets.push(e),
        Statement::Pattern(p) => {
            warn_if_ambiguous_name(&p.name, p.loc, diagnostics);
            song.patterns.push(p);
        }
        Statement::Sequence(s) => {
            warn_if_ambiguous_name(&s.name, s.loc, diagnostics);
            song.sequences.push(s);
        }
        Statement::Channel(c) => song.channels.push(c),
        Statement::Play(p) => song.play = Some(p),
        Statement::Export(e) => song.exports.push(e),
    }
}

fn warn_if_ambiguous_name(
    name: &str,
    loc: beatbax_common::diag::SourceLocation,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if name.chars().count() == 1 || note_to_midi(name).is_some() {
        diagnostics.push(Diagnostic::warning(
            format!("pattern/sequence name '{name}' is ambiguous with a pattern atom token"),
            loc,
        ));
    }
}

impl Metadata {
    /// True if no metadata field was ever set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.artist.is_none() && self.tags.is_empty() && self.description.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_song() {
        let source = "chip gameboy\nbpm 140\ninst lead type=pulse1\npat p = C4 D4\nseq s = p\nchannel 1 => inst lead seq s\nplay auto\n";
        let out = parse_source(source, ParseMode::Song).unwrap();
        assert_eq!(out.song.chip, Some("gameboy".to_string()));
        assert_eq!(out.song.bpm, Some(140.0));
        assert_eq!(out.song.insts.len(), 1);
        assert_eq!(out.song.patterns.len(), 1);
        assert_eq!(out.song.sequences.len(), 1);
        assert_eq!(out.song.channels.len(), 1);
        assert!(out.song.play.unwrap().auto);
    }

    #[test]
    fn warns_on_single_letter_pattern_name() {
        let out = parse_source("pat A = C4 D4\n", ParseMode::Song).unwrap();
        assert_eq!(out.diagnostics.len(), 1);
    }

    #[test]
    fn instrument_file_rejects_non_inst_import_statements() {
        let result = parse_source("pat p = C4 D4\n", ParseMode::InstrumentFile);
        assert!(result.is_err());
    }

    #[test]
    fn instrument_file_accepts_inst_and_import() {
        let source = "import \"local:shared.ins\"\ninst lead type=pulse1 duty=50\n";
        let out = parse_source(source, ParseMode::InstrumentFile).unwrap();
        assert_eq!(out.song.imports.len(), 1);
        assert_eq!(out.song.insts.len(), 1);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let source = "# a comment\n\nchip gameboy\n";
        let out = parse_source(source, ParseMode::Song).unwrap();
        assert_eq!(out.song.chip, Some("gameboy".to_string()));
    }

    #[test]
    fn propagates_parse_error_with_location() {
        let result = parse_source("chip gameboy\nbogus line here\n", ParseMode::Song);
        let error = result.unwrap_err();
        assert_eq!(error.location.start.line, 2);
    }
}
