//! Note-name/MIDI/frequency conversions and textual pattern expansion.
//!
//! This is "Note Math" (component A of the BeatBax pipeline): the leaf
//! utilities every other stage builds on. Nothing here knows about
//! instruments, channels, or the DSL grammar.

/// Sharp-only note names for MIDI-to-name conversion, indexed by semitone
/// within the octave (0 = C).
const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// The rest token used throughout the DSL and ISM.
pub const REST_TOKEN: &str = ".";

/// Tokens that extend the previous event's duration by one tick.
pub const SUSTAIN_TOKENS: [&str; 2] = ["_", "-"];

/// Returns true if `token` is one of the sustain tokens (`_` or `-`).
pub fn is_sustain_token(token: &str) -> bool {
    SUSTAIN_TOKENS.contains(&token)
}

/// Returns true if `token` is the rest token (`.`).
pub fn is_rest_token(token: &str) -> bool {
    token == REST_TOKEN
}

fn semitone_for_letter(letter: char) -> Option<i32> {
    match letter.to_ascii_uppercase() {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

fn letter_for_semitone(semitone: i32) -> char {
    // Only used by midi_to_note, which always emits sharp spellings, so this
    // only ever needs to cover the seven natural-letter anchors used below.
    match semitone {
        0 => 'C',
        2 => 'D',
        4 => 'E',
        5 => 'F',
        7 => 'G',
        9 => 'A',
        11 => 'B',
        _ => unreachable!("semitone not a natural anchor"),
    }
}

/// Parses a note name of the form `[A-Ga-g][#b]?-?\d+` into a MIDI index.
///
/// `midi = (octave + 1) * 12 + semitone(letter, accidental)`. Returns `None`
/// for anything that doesn't match the grammar (callers treat that as the
/// bottom element `⊥` from `spec.md` §4.A).
pub fn note_to_midi(name: &str) -> Option<i32> {
    let mut chars = name.chars().peekable();
    let letter = chars.next()?;
    let mut semitone = semitone_for_letter(letter)?;

    match chars.peek() {
        Some('#') => {
            semitone += 1;
            chars.next();
        }
        Some('b') => {
            semitone -= 1;
            chars.next();
        }
        _ => {}
    }

    let rest: String = chars.collect();
    if rest.is_empty() {
        return None;
    }
    let octave: i32 = rest.parse().ok()?;
    Some((octave + 1) * 12 + semitone)
}

/// Renders a MIDI index as a note name, always using sharp spellings.
///
/// `midiToNote(noteToMidi(name)) == midi` for all `midi` in `0..=127`
/// (testable property 1 in `spec.md` §8), though the round trip the other
/// way (`note_to_midi(midi_to_note(m))`) only holds exactly since flats are
/// never produced by this function.
pub fn midi_to_note(midi: i32) -> String {
    let semitone = midi.rem_euclid(12);
    let octave = midi.div_euclid(12) - 1;
    format!("{}{}", SHARP_NAMES[semitone as usize], octave)
}

/// Returns the sharp note-name letter/accidental pair for a semitone index,
/// without an octave suffix. Exposed for callers that build compound names.
pub fn sharp_name_for_semitone(semitone: i32) -> &'static str {
    SHARP_NAMES[semitone.rem_euclid(12) as usize]
}

/// `letter_for_semitone` is only valid for the seven natural-letter anchors;
/// kept private-ish but exported for the rare caller that needs the plain
/// letter without accidental/octave (e.g. instrument wave-table debug dumps).
#[doc(hidden)]
pub fn natural_letter_for_semitone(semitone: i32) -> Option<char> {
    match semitone.rem_euclid(12) {
        0 | 2 | 4 | 5 | 7 | 9 | 11 => Some(letter_for_semitone(semitone.rem_euclid(12))),
        _ => None,
    }
}

/// Converts a MIDI note index to frequency in Hz: `440 * 2^((midi-69)/12)`.
pub fn note_to_frequency(midi: i32) -> f64 {
    440.0 * 2f64.powf((midi as f64 - 69.0) / 12.0)
}

/// Convenience: parse a note name straight to frequency, or `None` if the
/// name doesn't parse.
pub fn name_to_frequency(name: &str) -> Option<f64> {
    note_to_midi(name).map(note_to_frequency)
}

/// Parameters for [`transpose`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TransposeParams {
    /// Semitone shift applied directly.
    pub semitones: i32,
    /// Octave shift; multiplied by 12 and added to `semitones`.
    pub octaves: i32,
}

/// Transposes a flat atom list by `params.semitones + 12 * params.octaves`.
///
/// Rests pass through unchanged. Tokens that don't parse as a note name also
/// pass through unchanged (testable property 3 in `spec.md` §8).
pub fn transpose(atoms: &[String], params: TransposeParams) -> Vec<String> {
    let shift = params.semitones + params.octaves * 12;
    atoms
        .iter()
        .map(|atom| match note_to_midi(atom) {
            Some(midi) => midi_to_note(midi + shift),
            None => atom.clone(),
        })
        .collect()
}

/// Expands pattern text into a flat list of atoms.
///
/// Supported syntax:
/// - whitespace-separated items
/// - element repeat, `X*N`
/// - parenthesised groups with repeat, `(...)*N`, nesting allowed
/// - the rest token `.`
///
/// Edge cases (`spec.md` §4.A): `*0` yields an empty expansion; a malformed
/// `X*` (no trailing count) yields the token unchanged.
pub fn expand_pattern(text: &str) -> Vec<String> {
    split_top_level(text)
        .into_iter()
        .flat_map(|tok| expand_token(&tok))
        .collect()
}

/// Splits on whitespace, but never inside parenthesised groups (so a group's
/// trailing `*N` survives as part of the same token).
fn split_top_level(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut depth: i32 = 0;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            c if c.is_whitespace() && depth <= 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn expand_token(tok: &str) -> Vec<String> {
    if let Some(rest) = tok.strip_prefix('(') {
        let chars: Vec<char> = rest.chars().collect();
        if let Some(close) = find_matching_paren(&chars) {
            let inner: String = chars[..close].iter().collect();
            let suffix: String = chars[close + 1..].iter().collect();
            let inner_expanded = expand_pattern(&inner);
            return apply_repeat_suffix(tok, &suffix, inner_expanded);
        }
        // Unmatched paren: pass through unchanged.
        return vec![tok.to_string()];
    }

    if let Some(star_idx) = tok.rfind('*') {
        let (base, suffix) = tok.split_at(star_idx);
        let suffix = &suffix[1..]; // drop the '*'
        if base.is_empty() {
            return vec![tok.to_string()];
        }
        return match suffix.parse::<usize>() {
            Ok(n) => repeat(vec![base.to_string()], n),
            Err(_) => vec![tok.to_string()],
        };
    }

    vec![tok.to_string()]
}

/// `chars` is everything after the opening `(`; finds the index (within
/// `chars`) of the matching close, accounting for nesting.
fn find_matching_paren(chars: &[char]) -> Option<usize> {
    let mut depth = 1;
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn apply_repeat_suffix(original: &str, suffix: &str, expanded: Vec<String>) -> Vec<String> {
    if suffix.is_empty() {
        return expanded;
    }
    match suffix.strip_prefix('*') {
        Some(count_str) => match count_str.parse::<usize>() {
            Ok(n) => repeat(expanded, n),
            Err(_) => vec![original.to_string()],
        },
        None => vec![original.to_string()],
    }
}

fn repeat(items: Vec<String>, n: usize) -> Vec<String> {
    let mut out = Vec::with_capacity(items.len() * n);
    for _ in 0..n {
        out.extend(items.iter().cloned());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_round_trip_over_full_midi_range() {
        for m in 0..=127 {
            let name = midi_to_note(m);
            assert_eq!(note_to_midi(&name), Some(m), "round trip failed for {m} -> {name}");
        }
    }

    #[test]
    fn note_to_midi_rejects_malformed_names() {
        assert_eq!(note_to_midi(""), None);
        assert_eq!(note_to_midi("H4"), None);
        assert_eq!(note_to_midi("C"), None);
        assert_eq!(note_to_midi("C#"), None);
    }

    #[test]
    fn note_to_midi_accepts_negative_octaves() {
        assert_eq!(note_to_midi("C-1"), Some(0));
        assert_eq!(note_to_midi("C4"), Some(60));
        assert_eq!(note_to_midi("A4"), Some(69));
    }

    #[test]
    fn frequency_reference_a4_is_440() {
        assert!((note_to_frequency(69) - 440.0).abs() < 1e-9);
    }

    #[test]
    fn expand_pattern_handles_element_repeat() {
        assert_eq!(expand_pattern("C4*3"), vec!["C4", "C4", "C4"]);
    }

    #[test]
    fn expand_pattern_handles_zero_repeat() {
        assert_eq!(expand_pattern("C4*0"), Vec::<String>::new());
    }

    #[test]
    fn expand_pattern_passes_through_malformed_repeat() {
        assert_eq!(expand_pattern("C4*"), vec!["C4*"]);
    }

    #[test]
    fn expand_pattern_handles_nested_groups() {
        assert_eq!(
            expand_pattern("(A B)*2"),
            vec!["A", "B", "A", "B"]
        );
        assert_eq!(
            expand_pattern("((A)*2 B)*2"),
            vec!["A", "A", "B", "A", "A", "B"]
        );
    }

    #[test]
    fn expand_pattern_length_matches_spec_property() {
        let base = expand_pattern("X");
        let grouped = expand_pattern("(X)*4");
        assert_eq!(grouped.len(), 4 * base.len());
    }

    #[test]
    fn transpose_preserves_rests_and_unknown_tokens() {
        let atoms = vec![".".to_string(), "bass".to_string(), "C4".to_string()];
        let out = transpose(&atoms, TransposeParams { semitones: 2, octaves: 0 });
        assert_eq!(out, vec![".", "bass", "D4"]);
    }

    #[test]
    fn transpose_shifts_notes_by_semitones_and_octaves() {
        let atoms = vec!["C4".to_string()];
        let out = transpose(&atoms, TransposeParams { semitones: 1, octaves: 1 });
        assert_eq!(out, vec!["C#5"]);
    }
}
