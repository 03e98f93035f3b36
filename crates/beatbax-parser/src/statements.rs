//! Line-level statement grammar.
//!
//! BeatBax source is line-oriented: one statement per line, keyword-led.
//! Dispatch and per-statement shape checking is plain recursive-descent
//! Rust (see the module doc on [`crate::lexer`] for why); only the leaf
//! literals (quoted strings, numbers, identifiers) go through `nom`.

use beatbax_common::diag::{Position, SourceLocation};

use crate::ast::{
    ChannelDecl, ChannelSource, EffectPresetDecl, ExportDecl, ImportDirective, InstDecl, PatternDecl,
    PlayDecl, SequenceDecl,
};
use crate::error::ParseError;
use crate::lexer::quoted_string;
use crate::pattern::{parse_pattern_atoms, parse_ref_list, parse_transform_part};

/// One parsed line, tagged by statement kind. `Song` metadata statements
/// (`chip`/`bpm`/`volume`/`time`/`song ...`) are represented directly
/// rather than via an intermediate enum layer, since they fold straight
/// into scalar [`crate::ast::Song`] fields.
#[derive(Debug, Clone)]
pub enum Statement {
    /// `chip NAME`.
    Chip(String),
    /// `bpm N`.
    Bpm(f64),
    /// `volume N`.
    Volume(f32),
    /// `time B/U`.
    Time(u32, u32),
    /// `song name "..."`.
    SongName(String),
    /// `song artist "..."`.
    SongArtist(String),
    /// `song tags a,b,c`.
    SongTags(Vec<String>),
    /// `song description "..."`.
    SongDescription(String),
    /// `import "<source>"`.
    Import(ImportDirective),
    /// `inst NAME key=value...`.
    Inst(InstDecl),
    /// `effect NAME = type:param,param`.
    Effect(EffectPresetDecl),
    /// `pat NAME[:mod...] = <rhs>`.
    Pattern(PatternDecl),
    /// `seq NAME = item, item, ...`.
    Sequence(SequenceDecl),
    /// `channel N => inst NAME (seq|pat) <ref> [speed N]`.
    Channel(ChannelDecl),
    /// `play [auto] [repeat]`.
    Play(PlayDecl),
    /// `export FORMAT "path"`.
    Export(ExportDecl),
}

fn point(line: u32) -> SourceLocation {
    SourceLocation::point(line, 1)
}

fn err(line: u32, message: impl Into<String>) -> ParseError {
    ParseError::new(message, point(line))
}

/// Parses one source line. Returns `Ok(None)` for blank lines and
/// comments (`#...`); fails with [`ParseError`] for any non-blank line
/// that doesn't match a recognized statement form.
pub fn parse_line(raw_line: &str, line_no: u32) -> Result<Option<Statement>, ParseError> {
    let line = raw_line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (keyword, rest) = split_keyword(line);
    match keyword {
        "chip" => Ok(Some(Statement::Chip(require_word(rest, line_no, "chip name")?))),
        "bpm" => parse_bpm(rest, line_no).map(Some),
        "volume" => parse_volume(rest, line_no).map(Some),
        "time" => parse_time(rest, line_no).map(Some),
        "song" => parse_song_meta(rest, line_no).map(Some),
        "import" => parse_import(rest, line_no).map(Some),
        "inst" => parse_inst(rest, line_no).map(Some),
        "effect" => parse_effect(rest, line_no).map(Some),
        "pat" => parse_pattern(rest, line_no).map(Some),
        "seq" => parse_sequence(rest, line_no).map(Some),
        "channel" => parse_channel(rest, line_no).map(Some),
        "play" => parse_play(rest, line_no).map(Some),
        "export" => parse_export(rest, line_no).map(Some),
        other => Err(err(line_no, format!("unrecognized statement '{other}'"))),
    }
}

fn split_keyword(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((k, rest)) => (k, rest.trim_start()),
        None => (line, ""),
    }
}

fn require_word(rest: &str, line_no: u32, what: &str) -> Result<String, ParseError> {
    let word = rest.split_whitespace().next();
    match word {
        Some(w) => Ok(w.to_string()),
        None => Err(err(line_no, format!("expected {what}"))),
    }
}

fn parse_bpm(rest: &str, line_no: u32) -> Result<Statement, ParseError> {
    let value: f64 = rest
        .trim()
        .parse()
        .map_err(|_| err(line_no, format!("invalid bpm value '{}'", rest.trim())))?;
    if value <= 0.0 {
        return Err(err(line_no, "bpm must be positive"));
    }
    Ok(Statement::Bpm(value))
}

fn parse_volume(rest: &str, line_no: u32) -> Result<Statement, ParseError> {
    let value: f32 = rest
        .trim()
        .parse()
        .map_err(|_| err(line_no, format!("invalid volume value '{}'", rest.trim())))?;
    Ok(Statement::Volume(value.clamp(0.0, 1.0)))
}

fn parse_time(rest: &str, line_no: u32) -> Result<Statement, ParseError> {
    let rest = rest.trim();
    let (beats_str, unit_str) = rest
        .split_once('/')
        .or_else(|| rest.split_once(char::is_whitespace))
        .ok_or_else(|| err(line_no, format!("invalid time signature '{rest}', expected B/U")))?;
    let beats: u32 = beats_str
        .trim()
        .parse()
        .map_err(|_| err(line_no, format!("invalid time signature '{rest}'")))?;
    let unit: u32 = unit_str
        .trim()
        .parse()
        .map_err(|_| err(line_no, format!("invalid time signature '{rest}'")))?;
    if beats == 0 || unit == 0 {
        return Err(err(line_no, "time signature components must be positive"));
    }
    Ok(Statement::Time(beats, unit))
}

fn parse_song_meta(rest: &str, line_no: u32) -> Result<Statement, ParseError> {
    let (field, rest) = split_keyword(rest);
    match field {
        "name" => Ok(Statement::SongName(parse_quoted_or_bare(rest, line_no)?)),
        "artist" => Ok(Statement::SongArtist(parse_quoted_or_bare(rest, line_no)?)),
        "description" => Ok(Statement::SongDescription(parse_quoted_or_bare(rest, line_no)?)),
        "tags" => Ok(Statement::SongTags(
            rest.split(',').map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect(),
        )),
        other => Err(err(line_no, format!("unrecognized song metadata field '{other}'"))),
    }
}

fn parse_quoted_or_bare(rest: &str, line_no: u32) -> Result<String, ParseError> {
    let rest = rest.trim();
    if rest.starts_with('"') {
        quoted_string(rest)
            .map(|(_, s)| s)
            .map_err(|_| err(line_no, format!("unterminated string literal '{rest}'")))
    } else if rest.is_empty() {
        Err(err(line_no, "expected a value"))
    } else {
        Ok(rest.to_string())
    }
}

fn parse_import(rest: &str, line_no: u32) -> Result<Statement, ParseError> {
    let source = parse_quoted_or_bare(rest, line_no)?;
    Ok(Statement::Import(ImportDirective { source, loc: point(line_no) }))
}

fn parse_inst(rest: &str, line_no: u32) -> Result<Statement, ParseError> {
    let (name, rest) = split_keyword(rest);
    if name.is_empty() {
        return Err(err(line_no, "expected instrument name"));
    }
    let mut properties = Vec::new();
    for field in rest.split_whitespace() {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| err(line_no, format!("expected key=value, got '{field}'")))?;
        properties.push((key.to_string(), value.to_string()));
    }
    Ok(Statement::Inst(InstDecl {
        name: name.to_string(),
        properties,
        loc: point(line_no),
    }))
}

fn parse_effect(rest: &str, line_no: u32) -> Result<Statement, ParseError> {
    let (name, rest) = split_keyword(rest);
    if name.is_empty() {
        return Err(err(line_no, "expected effect preset name"));
    }
    let rest = rest.trim_start();
    let rest = rest
        .strip_prefix('=')
        .ok_or_else(|| err(line_no, format!("expected '=' in effect declaration for '{name}'")))?
        .trim();
    let (effect_type, params_str) = match rest.split_once(':') {
        Some((t, p)) => (t.trim(), p.trim()),
        None => (rest, ""),
    };
    if effect_type.is_empty() {
        return Err(err(line_no, format!("effect preset '{name}' is missing an effect type")));
    }
    let params = if params_str.is_empty() {
        Vec::new()
    } else {
        params_str.split(',').map(|p| p.trim().to_string()).collect()
    };
    Ok(Statement::Effect(EffectPresetDecl {
        name: name.to_string(),
        effect_type: effect_type.to_string(),
        params,
        loc: point(line_no),
    }))
}

fn parse_pattern(rest: &str, line_no: u32) -> Result<Statement, ParseError> {
    let eq_idx = rest
        .find('=')
        .ok_or_else(|| err(line_no, "expected '=' in pattern declaration"))?;
    let (head, body) = (rest[..eq_idx].trim(), rest[eq_idx + 1..].trim());
    let (name, modifier_text) = match head.split_once(':') {
        Some((n, m)) => (n.trim(), m.trim()),
        None => (head, ""),
    };
    if name.is_empty() {
        return Err(err(line_no, "expected pattern name"));
    }
    if body.is_empty() {
        return Err(err(line_no, format!("pattern '{name}' has an empty right-hand side")));
    }
    let modifiers = modifier_text.split(':').filter(|s| !s.is_empty()).map(parse_transform_part).collect();
    let loc = point(line_no);
    let (atoms, flat_tokens) = parse_pattern_atoms(body, loc);
    Ok(Statement::Pattern(PatternDecl {
        name: name.to_string(),
        modifiers,
        atoms,
        flat_tokens,
        loc,
    }))
}

fn parse_sequence(rest: &str, line_no: u32) -> Result<Statement, ParseError> {
    let eq_idx = rest
        .find('=')
        .ok_or_else(|| err(line_no, "expected '=' in sequence declaration"))?;
    let (name, body) = (rest[..eq_idx].trim(), rest[eq_idx + 1..].trim());
    if name.is_empty() {
        return Err(err(line_no, "expected sequence name"));
    }
    if body.is_empty() {
        return Err(err(line_no, format!("sequence '{name}' has an empty right-hand side")));
    }
    let loc = point(line_no);
    let items = parse_ref_list(body, loc);
    Ok(Statement::Sequence(SequenceDecl {
        name: name.to_string(),
        items,
        loc,
    }))
}

fn parse_channel(rest: &str, line_no: u32) -> Result<Statement, ParseError> {
    let arrow_idx = rest
        .find("=>")
        .ok_or_else(|| err(line_no, "expected '=>' in channel declaration"))?;
    let (id_str, body) = (rest[..arrow_idx].trim(), rest[arrow_idx + 2..].trim());
    let id: u32 = id_str
        .parse()
        .map_err(|_| err(line_no, format!("invalid channel number '{id_str}'")))?;

    let mut instrument_default = None;
    let mut source = None;
    let mut speed_multiplier = None;

    let mut tokens = body.split_whitespace().peekable();
    while let Some(tok) = tokens.next() {
        match tok {
            "inst" => {
                let name = tokens
                    .next()
                    .ok_or_else(|| err(line_no, "expected instrument name after 'inst'"))?;
                instrument_default = Some(name.to_string());
            }
            "bpm" => {
                return Err(err(line_no, "channel declarations may not set a channel-local bpm"));
            }
            "pat" | "seq" => {
                let mut expr = String::new();
                let mut depth: i32 = 0;
                while let Some(&piece) = tokens.peek() {
                    if depth == 0 && (piece == "speed" || piece == "bpm") {
                        break;
                    }
                    for c in piece.chars() {
                        match c {
                            '(' => depth += 1,
                            ')' => depth -= 1,
                            _ => {}
                        }
                    }
                    if !expr.is_empty() {
                        expr.push(' ');
                    }
                    expr.push_str(piece);
                    tokens.next();
                }
                if expr.trim().is_empty() {
                    return Err(err(line_no, format!("expected a reference after '{tok}'")));
                }
                source = Some(if tok == "pat" {
                    ChannelSource::Pattern(expr)
                } else {
                    ChannelSource::Sequence(expr)
                });
            }
            "speed" => {
                let value = tokens
                    .next()
                    .ok_or_else(|| err(line_no, "expected a number after 'speed'"))?;
                let parsed: f64 = value
                    .parse()
                    .map_err(|_| err(line_no, format!("invalid speed value '{value}'")))?;
                speed_multiplier = Some(parsed);
            }
            other => {
                return Err(err(line_no, format!("unexpected token '{other}' in channel declaration")));
            }
        }
    }

    Ok(Statement::Channel(ChannelDecl {
        id,
        instrument_default,
        source,
        speed_multiplier,
        loc: point(line_no),
    }))
}

fn parse_play(rest: &str, line_no: u32) -> Result<Statement, ParseError> {
    let mut auto = false;
    let mut repeat = false;
    for tok in rest.split_whitespace() {
        match tok {
            "auto" => auto = true,
            "repeat" => repeat = true,
            other => return Err(err(line_no, format!("unexpected token '{other}' in play declaration"))),
        }
    }
    Ok(Statement::Play(PlayDecl { auto, repeat, loc: point(line_no) }))
}

fn parse_export(rest: &str, line_no: u32) -> Result<Statement, ParseError> {
    let (format, rest) = split_keyword(rest);
    if format.is_empty() {
        return Err(err(line_no, "expected export format"));
    }
    let path = parse_quoted_or_bare(rest, line_no)?;
    Ok(Statement::Export(ExportDecl {
        format: format.to_string(),
        path,
        loc: point(line_no),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert!(parse_line("", 1).unwrap().is_none());
        assert!(parse_line("   ", 1).unwrap().is_none());
        assert!(parse_line("# a comment", 1).unwrap().is_none());
    }

    #[test]
    fn parses_chip_and_bpm() {
        assert!(matches!(parse_line("chip gameboy", 1).unwrap(), Some(Statement::Chip(n)) if n == "gameboy"));
        assert!(matches!(parse_line("bpm 140", 1).unwrap(), Some(Statement::Bpm(v)) if v == 140.0));
    }

    #[test]
    fn rejects_negative_bpm() {
        assert!(parse_line("bpm -5", 1).is_err());
    }

    #[test]
    fn parses_time_signature_with_slash() {
        assert!(matches!(parse_line("time 3/4", 1).unwrap(), Some(Statement::Time(3, 4))));
    }

    #[test]
    fn parses_song_metadata() {
        assert!(matches!(
            parse_line(r#"song name "Test Song""#, 1).unwrap(),
            Some(Statement::SongName(n)) if n == "Test Song"
        ));
        assert!(matches!(
            parse_line("song tags chiptune, 8bit", 1).unwrap(),
            Some(Statement::SongTags(tags)) if tags == vec!["chiptune", "8bit"]
        ));
    }

    #[test]
    fn parses_inst_with_properties() {
        let stmt = parse_line("inst lead type=pulse1 duty=50 env=12,down", 1).unwrap().unwrap();
        match stmt {
            Statement::Inst(decl) => {
                assert_eq!(decl.name, "lead");
                assert_eq!(decl.properties.len(), 3);
                assert_eq!(decl.properties[0], ("type".to_string(), "pulse1".to_string()));
            }
            other => panic!("expected Inst, got {other:?}"),
        }
    }

    #[test]
    fn parses_pattern_decl() {
        let stmt = parse_line("pat p = C4 D4 . E4", 1).unwrap().unwrap();
        match stmt {
            Statement::Pattern(decl) => {
                assert_eq!(decl.name, "p");
                assert_eq!(decl.flat_tokens, vec!["C4", "D4", ".", "E4"]);
            }
            other => panic!("expected Pattern, got {other:?}"),
        }
    }

    #[test]
    fn parses_sequence_decl() {
        let stmt = parse_line("seq s = intro, verse:rev, chorus*2", 1).unwrap().unwrap();
        match stmt {
            Statement::Sequence(decl) => {
                assert_eq!(decl.items.len(), 3);
                assert_eq!(decl.items[2].repeat, 2);
            }
            other => panic!("expected Sequence, got {other:?}"),
        }
    }

    #[test]
    fn parses_channel_decl() {
        let stmt = parse_line("channel 1 => inst lead seq main", 1).unwrap().unwrap();
        match stmt {
            Statement::Channel(decl) => {
                assert_eq!(decl.id, 1);
                assert_eq!(decl.instrument_default, Some("lead".to_string()));
                assert!(matches!(decl.source, Some(ChannelSource::Sequence(_))));
            }
            other => panic!("expected Channel, got {other:?}"),
        }
    }

    #[test]
    fn rejects_channel_local_bpm() {
        let result = parse_line("channel 1 => inst lead pat p bpm 140", 1);
        assert!(result.is_err());
    }

    #[test]
    fn parses_channel_with_speed() {
        let stmt = parse_line("channel 2 => inst bass seq main speed 2", 1).unwrap().unwrap();
        match stmt {
            Statement::Channel(decl) => assert_eq!(decl.speed_multiplier, Some(2.0)),
            other => panic!("expected Channel, got {other:?}"),
        }
    }

    #[test]
    fn parses_play_flags() {
        let stmt = parse_line("play auto repeat", 1).unwrap().unwrap();
        match stmt {
            Statement::Play(decl) => {
                assert!(decl.auto);
                assert!(decl.repeat);
            }
            other => panic!("expected Play, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_statement_fails() {
        assert!(parse_line("wobble 1 2 3", 1).is_err());
    }
}
