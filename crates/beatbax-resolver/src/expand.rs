//! Sequence/pattern reference materialization.
//!
//! `spec.md` §4.C step 1-2: a channel's `pat`/`seq` reference expression is
//! split into top-level comma/whitespace items (reusing
//! [`beatbax_parser::pattern::parse_ref_list`]), and each item's named
//! pattern or sequence — or, for a parenthesised group, each of its
//! sub-references (`beatbax_parser::pattern::parse_group_items`) — is
//! expanded into a flat atom stream with that item's modifier chain and
//! repeat count applied.

use std::collections::HashSet;

use beatbax_common::diag::Diagnostic;
use beatbax_common::notes::{midi_to_note, note_to_midi};
use beatbax_parser::ast::{InlineEffect, PatternAtom, SequenceItem, Song, Transform};

use crate::warn::warn_once;

/// A pattern atom with resolver-applied annotations layered on top.
#[derive(Debug, Clone)]
pub struct ResolvedAtom {
    /// The underlying parsed atom.
    pub atom: PatternAtom,
    /// An instrument forced onto this atom by an enclosing `inst(name)`
    /// transform, if any.
    pub forced_instrument: Option<String>,
    /// Effects merged in by `pan(v)` or a named effect-preset transform;
    /// literal `<...>` effects on the atom itself take precedence over
    /// these when both name the same effect.
    pub extra_effects: Vec<InlineEffect>,
}

impl ResolvedAtom {
    fn plain(atom: PatternAtom) -> Self {
        Self { atom, forced_instrument: None, extra_effects: Vec::new() }
    }
}

/// Recursively expands a single `SequenceItem`-shaped reference (name +
/// modifier chain + repeat) into a flat [`ResolvedAtom`] stream.
pub fn expand_item(
    item: &SequenceItem,
    song: &Song,
    visiting: &mut HashSet<String>,
    seen_warnings: &mut HashSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<ResolvedAtom> {
    let base = expand_reference(&item.reference, song, visiting, seen_warnings, diagnostics);
    let mut atoms = apply_modifiers(base, &item.modifiers, song, seen_warnings, diagnostics);
    atoms = repeat_atoms(atoms, item.repeat);
    atoms
}

fn expand_reference(
    name: &str,
    song: &Song,
    visiting: &mut HashSet<String>,
    seen_warnings: &mut HashSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<ResolvedAtom> {
    // A reference that is itself a parenthesised group (e.g. the `(A B)` in
    // `(A B)*2`) isn't a pattern/sequence name to look up — it's a nested
    // list of sub-references, each of which may carry its own modifier
    // chain and repeat count (`spec.md` §4.A/§4.B group syntax). Expand and
    // concatenate the sub-references in written order; the group's own
    // trailing `:mods`/`*N` are applied by the caller in `expand_item`.
    if name.starts_with('(') && name.ends_with(')') && name.len() >= 2 {
        let inner = &name[1..name.len() - 1];
        let loc = beatbax_common::diag::SourceLocation::point(0, 0);
        let sub_items = beatbax_parser::pattern::parse_group_items(inner, loc);
        let mut out = Vec::new();
        for sub in &sub_items {
            out.extend(expand_item(sub, song, visiting, seen_warnings, diagnostics));
        }
        return out;
    }

    if let Some(pattern) = song.patterns.iter().find(|p| p.name == name) {
        // The pattern's own declared modifiers (`pat P:oct(-1):rev = ...`)
        // are baked into its atoms every time it's referenced, using the
        // same transform grammar a sequence item's modifier chain uses
        // (`spec.md` §4.C step 1: "honoring ... modifiers (via the same
        // transform grammar the parser uses for pattern-modifier suffixes)").
        let base: Vec<ResolvedAtom> = pattern.atoms.iter().cloned().map(ResolvedAtom::plain).collect();
        return apply_modifiers(base, &pattern.modifiers, song, seen_warnings, diagnostics);
    }

    if let Some(sequence) = song.sequences.iter().find(|s| s.name == name) {
        if !visiting.insert(name.to_string()) {
            warn_once(
                diagnostics,
                seen_warnings,
                format!("sequence '{name}' references itself (directly or indirectly), treating further expansion as empty"),
                sequence.loc,
            );
            return Vec::new();
        }
        let mut out = Vec::new();
        for sub_item in &sequence.items {
            out.extend(expand_item(sub_item, song, visiting, seen_warnings, diagnostics));
        }
        visiting.remove(name);
        return out;
    }

    warn_once(
        diagnostics,
        seen_warnings,
        format!("unknown pattern/sequence reference '{name}'"),
        beatbax_common::diag::SourceLocation::point(0, 0),
    );
    Vec::new()
}

fn apply_modifiers(
    mut atoms: Vec<ResolvedAtom>,
    modifiers: &[Transform],
    song: &Song,
    seen_warnings: &mut HashSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<ResolvedAtom> {
    for modifier in modifiers {
        match modifier {
            Transform::Reverse => atoms.reverse(),
            Transform::Octave(n) => shift_pitch(&mut atoms, n * 12),
            Transform::Transpose(n) => shift_pitch(&mut atoms, *n),
            Transform::Slow(n) => scale_duration(&mut atoms, *n, true),
            Transform::Fast(n) => scale_duration(&mut atoms, *n, false),
            Transform::Instrument(name) => {
                for ra in atoms.iter_mut() {
                    ra.forced_instrument = Some(name.clone());
                }
            }
            Transform::Pan(v) => {
                let effect = InlineEffect { name: "pan".to_string(), params: vec![v.to_string()] };
                for ra in atoms.iter_mut() {
                    merge_effect(&mut ra.extra_effects, effect.clone());
                }
            }
            Transform::EffectPreset(name) => match song.effect_presets.iter().find(|p| p.name == *name) {
                Some(preset) => {
                    let effect = InlineEffect { name: preset.effect_type.clone(), params: preset.params.clone() };
                    for ra in atoms.iter_mut() {
                        merge_effect(&mut ra.extra_effects, effect.clone());
                    }
                }
                None => warn_once(
                    diagnostics,
                    seen_warnings,
                    format!("unknown transform or effect preset '{name}'"),
                    beatbax_common::diag::SourceLocation::point(0, 0),
                ),
            },
            Transform::Unknown(text) => warn_once(
                diagnostics,
                seen_warnings,
                format!("unknown transform '{text}'"),
                beatbax_common::diag::SourceLocation::point(0, 0),
            ),
        }
    }
    atoms
}

fn merge_effect(effects: &mut Vec<InlineEffect>, new_effect: InlineEffect) {
    if !effects.iter().any(|e| e.name == new_effect.name) {
        effects.push(new_effect);
    }
}

fn shift_pitch(atoms: &mut [ResolvedAtom], shift: i32) {
    for ra in atoms.iter_mut() {
        if let PatternAtom::Note { value, .. } = &mut ra.atom {
            if let Some(midi) = note_to_midi(value) {
                *value = midi_to_note(midi + shift);
            }
        }
    }
}

fn scale_duration(atoms: &mut [ResolvedAtom], factor: u32, slow: bool) {
    let factor = factor.max(1);
    for ra in atoms.iter_mut() {
        let duration = match &mut ra.atom {
            PatternAtom::Note { duration, .. } | PatternAtom::Rest { duration, .. } => duration,
            _ => continue,
        };
        *duration = if slow {
            duration.saturating_mul(factor)
        } else {
            (*duration / factor).max(1)
        };
    }
}

fn repeat_atoms(atoms: Vec<ResolvedAtom>, n: u32) -> Vec<ResolvedAtom> {
    let mut out = Vec::with_capacity(atoms.len() * n as usize);
    for _ in 0..n {
        out.extend(atoms.iter().cloned());
    }
    out
}
