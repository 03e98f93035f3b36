//! Pattern-atom and reference-expression grammar.
//!
//! This is the part of the grammar the resolver (component C) reuses
//! directly rather than re-deriving: [`parse_ref_list`] and
//! [`parse_transform_chain`] are exposed so a channel's `pat`/`seq`
//! reference expression (`spec.md` §4.C step 2: "split by top-level
//! commas... each item may carry a modifier chain and repeat count") goes
//! through the exact same code as a sequence declaration's right-hand side.

use beatbax_common::diag::SourceLocation;
use beatbax_common::notes::{expand_pattern, note_to_midi};

use crate::ast::{InlineEffect, PatternAtom, SequenceItem, Transform};

/// Parses a pattern declaration's right-hand side into atoms, alongside
/// the flat textual projection (`spec.md` §4.B: both representations are
/// emitted). Never fails — malformed fragments degrade to [`PatternAtom::Token`],
/// matching the graceful-degradation style `expand_pattern` itself uses.
pub fn parse_pattern_atoms(raw: &str, loc: SourceLocation) -> (Vec<PatternAtom>, Vec<String>) {
    let tokens = expand_pattern(raw);
    let mut atoms = Vec::with_capacity(tokens.len());
    let mut flat = Vec::with_capacity(tokens.len());
    for tok in tokens {
        flat.push(tok.clone());
        atoms.push(classify_atom(&tok, loc));
    }
    (atoms, flat)
}

fn classify_atom(tok: &str, loc: SourceLocation) -> PatternAtom {
    let (text, effects) = extract_inline_effects(tok);

    if let Some((name, count)) = parse_call(&text, "inst") {
        return match count {
            Some(n) => PatternAtom::TempInst { name, count: n, loc },
            None => PatternAtom::InlineInst { name, loc },
        };
    }

    let (value, duration) = split_duration(&text);

    if value == "." {
        return PatternAtom::Rest { duration, loc };
    }

    if note_to_midi(value).is_some() {
        return PatternAtom::Note {
            value: value.to_string(),
            duration,
            effects,
            loc,
        };
    }

    PatternAtom::Token {
        raw: value.to_string(),
        effects,
        loc,
    }
}

/// Strips every top-level `<name:param,param>` group from `tok`, returning
/// the remaining text (with the groups removed in place) and the parsed
/// effects in written order. Angle-bracket groups never nest.
fn extract_inline_effects(tok: &str) -> (String, Vec<InlineEffect>) {
    let chars: Vec<char> = tok.chars().collect();
    let mut base = String::new();
    let mut effects = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '<' {
            if let Some(close) = chars[i + 1..].iter().position(|&c| c == '>') {
                let inner: String = chars[i + 1..i + 1 + close].iter().collect();
                effects.push(parse_inline_effect_body(&inner));
                i += close + 2;
                continue;
            }
        }
        base.push(chars[i]);
        i += 1;
    }
    (base, effects)
}

fn parse_inline_effect_body(inner: &str) -> InlineEffect {
    let mut parts = inner.splitn(2, ':');
    let name = parts.next().unwrap_or_default().trim().to_string();
    let params = match parts.next() {
        Some(rest) => rest.split(',').map(|p| p.trim().to_string()).collect(),
        None => Vec::new(),
    };
    InlineEffect { name, params }
}

/// Splits off a trailing `:N` duration suffix. Returns `(prefix, 1)` if
/// there's no such suffix (or it doesn't parse), `(prefix, n.max(1))`
/// otherwise — a duration of zero ticks has no meaning, so it's clamped up
/// rather than rejected.
fn split_duration(text: &str) -> (&str, u32) {
    if let Some(idx) = text.rfind(':') {
        let suffix = &text[idx + 1..];
        if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = suffix.parse::<u32>() {
                return (&text[..idx], n.max(1));
            }
        }
    }
    (text, 1)
}

/// Recognizes a `name(arg)` or `name(arg, count)` call form, returning the
/// first argument and an optional second integer argument.
fn parse_call(text: &str, fname: &str) -> Option<(String, Option<u32>)> {
    let rest = text.strip_prefix(fname)?.strip_prefix('(')?;
    let inner = rest.strip_suffix(')')?;
    let mut parts = inner.splitn(2, ',');
    let name = parts.next()?.trim();
    if name.is_empty() {
        return None;
    }
    let count = parts.next().and_then(|c| c.trim().parse::<u32>().ok());
    Some((name.to_string(), count))
}

/// Splits a reference expression into its top-level comma- or
/// whitespace-separated items (`spec.md` §4.B: "comma- or
/// whitespace-separated items"), stripping one enclosing pair of parens if
/// present (`"(A, B)"` and `"A, B"` are equivalent). Each item is then
/// parsed by [`parse_ref_item`].
pub fn parse_ref_list(expr: &str, loc: SourceLocation) -> Vec<SequenceItem> {
    split_top_level_items(unwrap_parens(expr.trim()))
        .into_iter()
        .map(|item| parse_ref_item(&item, loc))
        .collect()
}

/// Parses the sub-items inside one level of a parenthesised group, e.g. the
/// `A B` inside `(A B)*2` (`spec.md` §4.A/§4.B: "parenthesised groups with
/// repeat, `(…)*N`, nesting allowed"). Each sub-item may itself carry its
/// own modifier chain and repeat count, parsed recursively by whichever
/// caller expands the resulting [`SequenceItem`]s.
pub fn parse_group_items(body: &str, loc: SourceLocation) -> Vec<SequenceItem> {
    split_top_level_items(body)
        .into_iter()
        .map(|item| parse_ref_item(&item, loc))
        .collect()
}

fn unwrap_parens(s: &str) -> &str {
    if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Splits on top-level commas or whitespace (either separates items; a run
/// of both, as in `"A, B"`, still yields exactly two items), never inside a
/// parenthesised group.
fn split_top_level_items(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
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
            ',' if depth <= 0 => {
                parts.push(std::mem::take(&mut current));
            }
            c if c.is_whitespace() && depth <= 0 => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Parses one reference-expression item: `NAME[:modifier...][*repeat]`.
fn parse_ref_item(text: &str, loc: SourceLocation) -> SequenceItem {
    let (body, repeat) = strip_trailing_repeat(text);
    let mut parts = split_top_level_colons(body);
    let reference = if parts.is_empty() {
        String::new()
    } else {
        parts.remove(0)
    };
    let modifiers = parts.iter().map(|p| parse_transform_part(p)).collect();
    SequenceItem {
        reference,
        modifiers,
        repeat,
        loc,
    }
}

fn strip_trailing_repeat(s: &str) -> (&str, u32) {
    let mut depth: i32 = 0;
    let mut star_idx = None;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            '*' if depth == 0 => star_idx = Some(i),
            _ => {}
        }
    }
    if let Some(idx) = star_idx {
        let suffix = &s[idx + 1..];
        if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = suffix.parse::<u32>() {
                return (&s[..idx], n);
            }
        }
    }
    (s, 1)
}

fn split_top_level_colons(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
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
            ':' if depth <= 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts.into_iter().map(|p| p.trim().to_string()).collect()
}

/// Parses a single modifier-chain entry into a [`Transform`].
pub fn parse_transform_part(part: &str) -> Transform {
    let part = part.trim();
    if part == "rev" {
        return Transform::Reverse;
    }
    if let Some(args) = call_args(part, "oct") {
        return args
            .parse::<i32>()
            .map(Transform::Octave)
            .unwrap_or_else(|_| Transform::Unknown(part.to_string()));
    }
    if let Some(args) = call_args(part, "transpose") {
        return args
            .parse::<i32>()
            .map(Transform::Transpose)
            .unwrap_or_else(|_| Transform::Unknown(part.to_string()));
    }
    if let Some(args) = call_args(part, "slow") {
        return args
            .parse::<u32>()
            .map(Transform::Slow)
            .unwrap_or_else(|_| Transform::Unknown(part.to_string()));
    }
    if let Some(args) = call_args(part, "fast") {
        return args
            .parse::<u32>()
            .map(Transform::Fast)
            .unwrap_or_else(|_| Transform::Unknown(part.to_string()));
    }
    if let Some(args) = call_args(part, "pan") {
        return args
            .parse::<f32>()
            .map(Transform::Pan)
            .unwrap_or_else(|_| Transform::Unknown(part.to_string()));
    }
    if let Some(args) = call_args(part, "inst") {
        if args.is_empty() {
            return Transform::Unknown(part.to_string());
        }
        return Transform::Instrument(args.to_string());
    }
    if part.contains('(') {
        return Transform::Unknown(part.to_string());
    }
    if part.is_empty() {
        return Transform::Unknown(part.to_string());
    }
    Transform::EffectPreset(part.to_string())
}

fn call_args<'a>(text: &'a str, fname: &str) -> Option<&'a str> {
    text.strip_prefix(fname)?.strip_prefix('(')?.strip_suffix(')')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::point(1, 1)
    }

    #[test]
    fn classifies_note_rest_and_token() {
        let (atoms, _) = parse_pattern_atoms("C4 . bass", loc());
        assert!(matches!(atoms[0], PatternAtom::Note { .. }));
        assert!(matches!(atoms[1], PatternAtom::Rest { .. }));
        assert!(matches!(atoms[2], PatternAtom::Token { .. }));
    }

    #[test]
    fn parses_duration_and_inline_effects() {
        let (atoms, flat) = parse_pattern_atoms("C4<arp:3,7>:4", loc());
        assert_eq!(flat, vec!["C4<arp:3,7>:4"]);
        match &atoms[0] {
            PatternAtom::Note { value, duration, effects, .. } => {
                assert_eq!(value, "C4");
                assert_eq!(*duration, 4);
                assert_eq!(effects.len(), 1);
                assert_eq!(effects[0].name, "arp");
                assert_eq!(effects[0].params, vec!["3", "7"]);
            }
            other => panic!("expected Note, got {other:?}"),
        }
    }

    #[test]
    fn parses_inline_inst_calls() {
        let (atoms, _) = parse_pattern_atoms("C4 inst(bass) D4 inst(lead,3) E4", loc());
        assert!(matches!(&atoms[1], PatternAtom::InlineInst { name, .. } if name == "bass"));
        assert!(matches!(&atoms[3], PatternAtom::TempInst { name, count: 3, .. } if name == "lead"));
    }

    #[test]
    fn parses_ref_list_with_modifiers_and_repeat() {
        let items = parse_ref_list("(A, B:oct(-1)*2)", loc());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].reference, "A");
        assert_eq!(items[0].repeat, 1);
        assert_eq!(items[1].reference, "B");
        assert_eq!(items[1].modifiers, vec![Transform::Octave(-1)]);
        assert_eq!(items[1].repeat, 2);
    }

    #[test]
    fn parses_bare_ref_list_without_parens() {
        let items = parse_ref_list("intro, verse:rev, chorus", loc());
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].reference, "verse");
        assert_eq!(items[1].modifiers, vec![Transform::Reverse]);
    }

    #[test]
    fn unknown_transform_is_kept_not_dropped() {
        let items = parse_ref_list("A:bogus(1,2)", loc());
        assert_eq!(items[0].modifiers, vec![Transform::Unknown("bogus(1,2)".to_string())]);
    }

    #[test]
    fn bare_identifier_modifier_is_effect_preset() {
        let items = parse_ref_list("A:myPreset", loc());
        assert_eq!(items[0].modifiers, vec![Transform::EffectPreset("myPreset".to_string())]);
    }
}
