//! The per-channel token-list walk: `spec.md` §4.C step 3.
//!
//! Consumes a flat [`ResolvedAtom`] stream (already pattern/sequence
//! expanded, transformed, and repeated) and produces the channel's final
//! [`ChannelEvent`] list — applying instrument-switch atoms, temporary
//! overrides, sustain folding, and named-hit classification along the way.

use std::collections::HashSet;

use beatbax_common::diag::Diagnostic;
use beatbax_common::notes::{is_sustain_token, note_to_midi};
use beatbax_parser::ast::PatternAtom;

use crate::expand::ResolvedAtom;
use crate::ism::{ChannelEvent, ChannelEventKind};
use crate::warn::warn_once;

/// Any threshold an `arp` offset is allowed to reach before it's flagged
/// as likely a mistake (`spec.md` §4.C step 5: "arpeggio-offset-range
/// warnings"). Two octaves either way covers every legitimate arpeggio
/// voicing; beyond that it's almost certainly a typo'd parameter.
const ARP_OFFSET_WARNING_THRESHOLD: i64 = 24;

/// Walks one channel's expanded atom stream into a final event list.
pub fn walk_channel(
    atoms: &[ResolvedAtom],
    default_instrument: Option<&str>,
    known_instruments: &HashSet<String>,
    seen_warnings: &mut HashSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<ChannelEvent> {
    let mut events: Vec<ChannelEvent> = Vec::new();
    let mut current_instrument = default_instrument.map(|s| s.to_string());
    let mut temp_override: Option<(String, u32)> = None;
    let mut tick: u32 = 0;

    for ra in atoms {
        if let Some(forced) = &ra.forced_instrument {
            current_instrument = Some(forced.clone());
        }

        match &ra.atom {
            PatternAtom::InlineInst { name, .. } => {
                current_instrument = Some(name.clone());
            }
            PatternAtom::TempInst { name, count, loc } => {
                if *count == 0 {
                    warn_once(
                        diagnostics,
                        seen_warnings,
                        format!("temporary instrument override for '{name}' covers zero events"),
                        *loc,
                    );
                } else {
                    temp_override = Some((name.clone(), *count));
                }
            }
            PatternAtom::Rest { duration, loc } => {
                events.push(ChannelEvent {
                    kind: ChannelEventKind::Rest,
                    instrument: current_instrument.clone().unwrap_or_default(),
                    start_tick: tick,
                    duration_ticks: *duration,
                    effects: Vec::new(),
                    loc: *loc,
                });
                tick += duration;
            }
            PatternAtom::Note { value, duration, effects, loc } => {
                let instrument = next_instrument(&current_instrument, &mut temp_override);
                let effective_effects = merge_event_effects(effects, &ra.extra_effects);
                check_arp_offsets(&effective_effects, *loc, seen_warnings, diagnostics);
                let midi = match note_to_midi(value) {
                    Some(m) => m,
                    None => {
                        warn_once(
                            diagnostics,
                            seen_warnings,
                            format!("note atom '{value}' did not parse as a note name"),
                            *loc,
                        );
                        continue;
                    }
                };
                events.push(ChannelEvent {
                    kind: ChannelEventKind::Note { note: value.clone(), midi },
                    instrument,
                    start_tick: tick,
                    duration_ticks: *duration,
                    effects: effective_effects,
                    loc: *loc,
                });
                tick += duration;
            }
            PatternAtom::Token { raw, effects, loc } => {
                if is_sustain_token(raw) {
                    match events.last_mut() {
                        Some(last) => last.duration_ticks += 1,
                        None => warn_once(
                            diagnostics,
                            seen_warnings,
                            "sustain token has no preceding event to extend".to_string(),
                            *loc,
                        ),
                    }
                    tick += 1;
                    continue;
                }

                if known_instruments.contains(raw) {
                    // A named hit consumes a temporary-override slot like a
                    // note would, but always sounds the named instrument
                    // itself rather than the channel's current one.
                    let _ = next_instrument(&current_instrument, &mut temp_override);
                    let effective_effects = merge_event_effects(effects, &ra.extra_effects);
                    events.push(ChannelEvent {
                        kind: ChannelEventKind::NamedHit { name: raw.clone() },
                        instrument: raw.clone(),
                        start_tick: tick,
                        duration_ticks: 1,
                        effects: effective_effects,
                        loc: *loc,
                    });
                    tick += 1;
                } else {
                    warn_once(
                        diagnostics,
                        seen_warnings,
                        format!("unresolved token '{raw}': not a note, instrument, or sustain marker"),
                        *loc,
                    );
                }
            }
        }
    }

    events
}

fn next_instrument(current: &Option<String>, temp_override: &mut Option<(String, u32)>) -> String {
    if let Some((name, remaining)) = temp_override {
        let chosen = name.clone();
        *remaining -= 1;
        if *remaining == 0 {
            *temp_override = None;
        }
        chosen
    } else {
        current.clone().unwrap_or_default()
    }
}

fn merge_event_effects(
    atom_effects: &[beatbax_parser::ast::InlineEffect],
    extra_effects: &[beatbax_parser::ast::InlineEffect],
) -> Vec<beatbax_parser::ast::InlineEffect> {
    let mut out = atom_effects.to_vec();
    for extra in extra_effects {
        if !out.iter().any(|e| e.name == extra.name) {
            out.push(extra.clone());
        }
    }
    out
}

fn check_arp_offsets(
    effects: &[beatbax_parser::ast::InlineEffect],
    loc: beatbax_common::diag::SourceLocation,
    seen_warnings: &mut HashSet<String>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for effect in effects {
        if effect.name != "arp" {
            continue;
        }
        for param in &effect.params {
            if let Ok(offset) = param.trim().parse::<i64>() {
                if offset.abs() > ARP_OFFSET_WARNING_THRESHOLD {
                    warn_once(
                        diagnostics,
                        seen_warnings,
                        format!("arp offset {offset} is unusually large (beyond +/-{ARP_OFFSET_WARNING_THRESHOLD} semitones)"),
                        loc,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatbax_common::diag::SourceLocation;

    fn loc() -> SourceLocation {
        SourceLocation::point(1, 1)
    }

    fn note(value: &str, duration: u32) -> ResolvedAtom {
        ResolvedAtom {
            atom: PatternAtom::Note { value: value.to_string(), duration, effects: Vec::new(), loc: loc() },
            forced_instrument: None,
            extra_effects: Vec::new(),
        }
    }

    fn rest(duration: u32) -> ResolvedAtom {
        ResolvedAtom { atom: PatternAtom::Rest { duration, loc: loc() }, forced_instrument: None, extra_effects: Vec::new() }
    }

    fn sustain() -> ResolvedAtom {
        ResolvedAtom {
            atom: PatternAtom::Token { raw: "_".to_string(), effects: Vec::new(), loc: loc() },
            forced_instrument: None,
            extra_effects: Vec::new(),
        }
    }

    #[test]
    fn sustain_folds_into_previous_event() {
        let atoms = vec![note("C4", 1), sustain(), sustain()];
        let mut diags = Vec::new();
        let mut seen = HashSet::new();
        let events = walk_channel(&atoms, Some("lead"), &HashSet::new(), &mut seen, &mut diags);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration_ticks, 3);
        assert!(diags.is_empty());
    }

    #[test]
    fn rest_does_not_fold_into_previous_note() {
        let atoms = vec![note("C4", 1), rest(1)];
        let mut diags = Vec::new();
        let mut seen = HashSet::new();
        let events = walk_channel(&atoms, Some("lead"), &HashSet::new(), &mut seen, &mut diags);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1].kind, ChannelEventKind::Rest));
    }

    #[test]
    fn event_conservation_total_ticks_match_atom_durations() {
        let atoms = vec![note("C4", 2), rest(3), note("D4", 1)];
        let mut diags = Vec::new();
        let mut seen = HashSet::new();
        let events = walk_channel(&atoms, Some("lead"), &HashSet::new(), &mut seen, &mut diags);
        let total: u32 = events.iter().map(|e| e.duration_ticks).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn temp_inst_override_covers_exactly_n_notes() {
        let atoms = vec![
            ResolvedAtom {
                atom: PatternAtom::TempInst { name: "snare".to_string(), count: 2, loc: loc() },
                forced_instrument: None,
                extra_effects: Vec::new(),
            },
            note("C4", 1),
            note("D4", 1),
            note("E4", 1),
        ];
        let mut diags = Vec::new();
        let mut seen = HashSet::new();
        let events = walk_channel(&atoms, Some("lead"), &HashSet::new(), &mut seen, &mut diags);
        assert_eq!(events[0].instrument, "snare");
        assert_eq!(events[1].instrument, "snare");
        assert_eq!(events[2].instrument, "lead");
    }

    #[test]
    fn unresolved_token_warns_once() {
        let atoms = vec![
            ResolvedAtom {
                atom: PatternAtom::Token { raw: "bogus".to_string(), effects: Vec::new(), loc: loc() },
                forced_instrument: None,
                extra_effects: Vec::new(),
            },
            ResolvedAtom {
                atom: PatternAtom::Token { raw: "bogus".to_string(), effects: Vec::new(), loc: loc() },
                forced_instrument: None,
                extra_effects: Vec::new(),
            },
        ];
        let mut diags = Vec::new();
        let mut seen = HashSet::new();
        let events = walk_channel(&atoms, None, &HashSet::new(), &mut seen, &mut diags);
        assert!(events.is_empty());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn named_hit_uses_the_hit_instrument_not_the_channel_default() {
        let mut known = HashSet::new();
        known.insert("kick".to_string());
        let atoms = vec![ResolvedAtom {
            atom: PatternAtom::Token { raw: "kick".to_string(), effects: Vec::new(), loc: loc() },
            forced_instrument: None,
            extra_effects: Vec::new(),
        }];
        let mut diags = Vec::new();
        let mut seen = HashSet::new();
        let events = walk_channel(&atoms, Some("lead"), &known, &mut seen, &mut diags);
        assert_eq!(events[0].instrument, "kick");
        assert!(matches!(&events[0].kind, ChannelEventKind::NamedHit { name } if name == "kick"));
    }
}
