//! Top-level `Song` (AST) to `ResolvedSong` (ISM) resolution.

use std::collections::{HashMap, HashSet};

use beatbax_common::diag::Diagnostic;
use beatbax_common::instrument::Instrument;
use beatbax_parser::ast::{ChannelSource, Song};
use beatbax_parser::pattern::parse_ref_list;

use crate::expand::expand_item;
use crate::ism::{ChannelEventKind, PlaybackMode, ResolvedChannel, ResolvedSong};
use crate::walk::walk_channel;

/// Resolves a parsed [`Song`] into a [`ResolvedSong`], alongside every
/// warning collected along the way.
///
/// Never fails: every malformed or dangling reference degrades to a
/// warning and an empty/dropped event, per `spec.md` §7's split between
/// fatal parse/import errors and non-fatal resolve warnings.
pub fn resolve(song: &Song) -> (ResolvedSong, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let mut seen_warnings = HashSet::new();

    let instruments = merge_instruments(song, &mut diagnostics);
    let known_instrument_names: HashSet<String> = instruments.keys().cloned().collect();

    let mut channels = Vec::with_capacity(song.channels.len());
    for channel in &song.channels {
        let Some(source) = &channel.source else {
            diagnostics.push(Diagnostic::warning(
                format!("channel {} declares no pattern or sequence to play", channel.id),
                channel.loc,
            ));
            channels.push(ResolvedChannel {
                id: channel.id,
                instrument_default: channel.instrument_default.clone(),
                speed_multiplier: channel.speed_multiplier.unwrap_or(1.0),
                events: Vec::new(),
            });
            continue;
        };

        let expr = match source {
            ChannelSource::Pattern(e) | ChannelSource::Sequence(e) => e,
        };
        let items = parse_ref_list(expr, channel.loc);

        let mut atoms = Vec::new();
        for item in &items {
            let mut visiting = HashSet::new();
            atoms.extend(expand_item(item, song, &mut visiting, &mut seen_warnings, &mut diagnostics));
        }

        let events = walk_channel(
            &atoms,
            channel.instrument_default.as_deref(),
            &known_instrument_names,
            &mut seen_warnings,
            &mut diagnostics,
        );

        channels.push(ResolvedChannel {
            id: channel.id,
            instrument_default: channel.instrument_default.clone(),
            speed_multiplier: channel.speed_multiplier.unwrap_or(1.0),
            events,
        });
    }

    let play = song.play.map(|p| PlaybackMode { auto: p.auto, repeat: p.repeat }).unwrap_or_default();

    let resolved = ResolvedSong {
        chip: song.chip.clone().unwrap_or_else(|| "gameboy".to_string()),
        bpm: song.bpm.unwrap_or(120.0),
        volume: song.volume.unwrap_or(1.0),
        time_signature: song.time_signature.unwrap_or((4, 4)),
        metadata: song.metadata.clone(),
        instruments,
        channels,
        play,
    };

    (resolved, diagnostics)
}

fn merge_instruments(song: &Song, diagnostics: &mut Vec<Diagnostic>) -> HashMap<String, Instrument> {
    let mut map = HashMap::new();
    for decl in &song.insts {
        if let Some(instrument) = Instrument::from_raw_properties(&decl.properties, decl.loc, diagnostics) {
            if map.insert(decl.name.clone(), instrument).is_some() {
                diagnostics.push(Diagnostic::warning(
                    format!("instrument '{}' redefined, later declaration wins", decl.name),
                    decl.loc,
                ));
            }
        } else {
            diagnostics.push(Diagnostic::warning(
                format!("instrument '{}' has no recognized 'type', dropped", decl.name),
                decl.loc,
            ));
        }
    }
    map
}

/// Total event count across all channels, useful for the event-conservation
/// testable property (`spec.md` §8 property 5).
pub fn total_events(resolved: &ResolvedSong) -> usize {
    resolved.channels.iter().map(|c| c.events.len()).sum()
}

/// Total note-producing (non-rest) events across all channels.
pub fn total_sounding_events(resolved: &ResolvedSong) -> usize {
    resolved
        .channels
        .iter()
        .flat_map(|c| &c.events)
        .filter(|e| !matches!(e.kind, ChannelEventKind::Rest))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatbax_parser::builder::{parse_source, ParseMode};

    fn resolve_source(source: &str) -> (ResolvedSong, Vec<Diagnostic>) {
        let out = parse_source(source, ParseMode::Song).unwrap();
        resolve(&out.song)
    }

    #[test]
    fn resolves_a_minimal_song_with_defaults() {
        let (resolved, diags) = resolve_source(
            "inst lead type=pulse1\npat p = C4 D4 . E4\nchannel 1 => inst lead pat p\n",
        );
        assert_eq!(resolved.chip, "gameboy");
        assert_eq!(resolved.bpm, 120.0);
        assert_eq!(resolved.channels.len(), 1);
        assert_eq!(resolved.channels[0].events.len(), 4);
        assert!(diags.is_empty());
    }

    #[test]
    fn sustain_tokens_fold_and_are_never_emitted() {
        let (resolved, _) = resolve_source(
            "inst lead type=pulse1\npat p = C4 _ _ D4\nchannel 1 => inst lead pat p\n",
        );
        let events = &resolved.channels[0].events;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].duration_ticks, 3);
    }

    #[test]
    fn unknown_reference_warns_and_produces_no_events() {
        let (resolved, diags) = resolve_source("inst lead type=pulse1\nchannel 1 => inst lead pat missing\n");
        assert!(resolved.channels[0].events.is_empty());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn duplicate_unknown_reference_warns_only_once() {
        let (_, diags) = resolve_source(
            "inst lead type=pulse1\nchannel 1 => inst lead seq (missing, missing, missing)\n",
        );
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn resolve_is_deterministic() {
        let source = "inst lead type=pulse1\npat p = C4 D4 E4 F4\nseq s = p:oct(-1), p:rev\nchannel 1 => inst lead seq s\n";
        let (a, _) = resolve_source(source);
        let (b, _) = resolve_source(source);
        assert_eq!(a, b);
    }

    #[test]
    fn event_conservation_across_transforms() {
        let source = "inst lead type=pulse1\npat p = C4 D4 E4\nseq s = p:slow(2)\nchannel 1 => inst lead seq s\n";
        let (resolved, _) = resolve_source(source);
        let total_ticks: u32 = resolved.channels[0].events.iter().map(|e| e.duration_ticks).sum();
        assert_eq!(total_ticks, 6);
        assert_eq!(total_events(&resolved), 3);
    }
}
