//! Per-application context an effect handler runs with.

use beatbax_common::graph::{Capability, VoiceGraph};

/// Per-channel state that must outlive any single note so effects can read
/// their previous invocation's result.
///
/// `spec.md` §4.D: only `port` (portamento) needs this — it ramps "from
/// previous channel frequency to current target", so it must remember what
/// the previous target was. `stop()` on the playback orchestrator clears
/// this (testable property 8), via [`ChannelEffectState::reset`].
#[derive(Debug, Clone, Default)]
pub struct ChannelEffectState {
    /// The last frequency `port` ramped to on this channel, in Hz.
    pub last_portamento_freq: Option<f32>,
}

impl ChannelEffectState {
    /// Clears all per-channel effect state (called on channel/playback stop).
    pub fn reset(&mut self) {
        self.last_portamento_freq = None;
    }
}

/// Everything a handler needs to schedule automation for one note event.
pub struct EffectContext<'a> {
    /// The voice graph this note sounds through.
    pub voice: &'a mut VoiceGraph,
    /// Which optional render features are available; handlers that need an
    /// absent feature (e.g. `pan` with no panner node) no-op rather than
    /// erroring (testable property 7).
    pub capability: Capability,
    /// This note's scheduled start time, in seconds.
    pub start_time: f64,
    /// This note's duration, in seconds.
    pub duration: f64,
    /// The channel's current tick length, in seconds — `cut`/`retrig`/`echo`
    /// schedule relative to this rather than to `duration` (`spec.md` §4.D:
    /// `cut(ticks, tickSec?)` etc).
    pub tick_seconds: f64,
    /// The note's un-ramped base frequency/rate (same value the voice graph
    /// itself was constructed with).
    pub base_freq: f32,
    /// This channel's carried-forward effect state (portamento memory).
    pub channel_state: &'a mut ChannelEffectState,
}
