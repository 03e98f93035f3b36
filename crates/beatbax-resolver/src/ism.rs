//! The Intermediate Song Model: the resolver's output, and the playback
//! orchestrator's (component G) input.
//!
//! `spec.md` §4.C: "`ChannelEvent` = note/rest/sustain/named-hit" describes
//! the classification the resolver's walk performs; sustain tokens are
//! folded into the previous event's duration and never survive into this
//! model (invariant), so [`ChannelEventKind`] has three variants, not four.

use std::collections::HashMap;

use beatbax_common::diag::SourceLocation;
use beatbax_common::instrument::Instrument;
use beatbax_parser::ast::{InlineEffect, Metadata};

/// What a resolved event actually does when it sounds.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ChannelEventKind {
    /// A pitched note.
    Note {
        /// Note name, as written (post-transform).
        note: String,
        /// MIDI index, derived from `note`.
        midi: i32,
    },
    /// Silence.
    Rest,
    /// An instrument referenced by name directly within pattern text,
    /// sounding once regardless of the channel's current instrument.
    NamedHit {
        /// The instrument name that was hit.
        name: String,
    },
}

/// One fully-resolved channel event.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelEvent {
    /// What this event does.
    pub kind: ChannelEventKind,
    /// The instrument in effect for this event (for `NamedHit`, same as
    /// `kind`'s `name`).
    pub instrument: String,
    /// Start time, in channel ticks from the channel's own start.
    pub start_tick: u32,
    /// Duration in ticks, already sustain-folded.
    pub duration_ticks: u32,
    /// Inline effects attached to this event (merged: literal `<...>`
    /// suffixes win over transform-derived effects of the same name).
    pub effects: Vec<InlineEffect>,
    /// Source location of the originating atom.
    pub loc: SourceLocation,
}

/// `play` mode, resolved from the AST's [`beatbax_parser::ast::PlayDecl`]
/// (defaults applied when no `play` statement was present).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlaybackMode {
    /// Start without an explicit user action.
    pub auto: bool,
    /// Loop back to the start on completion.
    pub repeat: bool,
}

impl Default for PlaybackMode {
    fn default() -> Self {
        Self { auto: false, repeat: false }
    }
}

/// A fully-resolved channel: its instrument default, speed, and flat
/// ordered event list.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResolvedChannel {
    /// Channel number.
    pub id: u32,
    /// Default instrument, used whenever no override is active.
    pub instrument_default: Option<String>,
    /// Playback speed multiplier (ticks run `speed_multiplier` times as
    /// fast as the song's base tick rate).
    pub speed_multiplier: f64,
    /// Flat, time-ordered event list.
    pub events: Vec<ChannelEvent>,
}

/// The Intermediate Song Model: everything the playback orchestrator
/// (component G) needs, with every DSL-level reference already resolved.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResolvedSong {
    /// Target chip, defaults to `"gameboy"` if undeclared.
    pub chip: String,
    /// Tempo in beats per minute, defaults to 120.0 if undeclared.
    pub bpm: f64,
    /// Master volume, defaults to 1.0 if undeclared.
    pub volume: f32,
    /// Time signature, defaults to `(4, 4)` if undeclared.
    pub time_signature: (u32, u32),
    /// Song metadata.
    pub metadata: Metadata,
    /// The fully-merged instrument table (song-local plus imported).
    pub instruments: HashMap<String, Instrument>,
    /// Resolved channels, in declaration order.
    pub channels: Vec<ResolvedChannel>,
    /// Playback mode.
    pub play: PlaybackMode,
}
