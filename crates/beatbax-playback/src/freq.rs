//! Maps a resolved event's classification to the base frequency a voice is
//! constructed with.

use beatbax_common::notes::note_to_frequency;
use beatbax_resolver::ChannelEventKind;

/// MIDI 69 (A4, 440 Hz): the placeholder pitch for percussion-style named
/// hits, which carry no pitch information of their own.
const NAMED_HIT_MIDI: i32 = 69;

/// The base frequency a voice is built with for `kind`. Never called for
/// `Rest`, which is never scheduled as a sounding event.
pub(crate) fn base_frequency(kind: &ChannelEventKind) -> f32 {
    match kind {
        ChannelEventKind::Note { midi, .. } => note_to_frequency(*midi) as f32,
        ChannelEventKind::NamedHit { .. } => note_to_frequency(NAMED_HIT_MIDI) as f32,
        ChannelEventKind::Rest => unreachable!("rests are never scheduled as sounding events"),
    }
}
