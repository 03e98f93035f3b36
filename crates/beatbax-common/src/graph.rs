//! Minimal node-graph primitives built on [`Param`](crate::param::Param).
//!
//! `spec.md` §4.F describes each voice as a small Web-Audio-style node
//! graph ("Oscillator → GainNode → destination", "looping buffer source").
//! [`VoiceGraph`] is that graph: channel synthesis (component F) builds one
//! per sounding event, the effect registry (component D) schedules ramps on
//! its nodes, and the playback orchestrator (component G) renders it.
//!
//! This crate models only the node *shapes*; mixing/rendering to PCM lives
//! in `beatbax-synth` and `beatbax-playback`, which is where the actual
//! waveform generation happens.

pub use crate::param::{Param, RampKind};

/// Which optional render features the current host/renderer supports.
///
/// Mirrors `spec.md` §6 Environment ("If any optional node factory is
/// missing, effects requiring it no-op") and DESIGN NOTES item replacing
/// "try/catch-everywhere defensive style around audio nodes" with an
/// explicit capability struct effects branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    /// Whether a stereo panner node is available (`createStereoPanner`).
    pub stereo_pan: bool,
}

impl Default for Capability {
    fn default() -> Self {
        Self { stereo_pan: true }
    }
}

/// `GainNode`-equivalent: wraps a gain [`Param`].
#[derive(Debug, Clone)]
pub struct GainNode {
    /// Linear gain automation.
    pub gain: Param,
}

impl GainNode {
    /// Creates a gain node at a fixed initial gain.
    pub fn new(initial_gain: f32) -> Self {
        Self { gain: Param::new(initial_gain) }
    }
}

/// `StereoPannerNode`-equivalent: wraps a pan [`Param`] in `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct PannerNode {
    /// Pan automation, -1 (full left) to 1 (full right).
    pub pan: Param,
}

impl PannerNode {
    /// Creates a panner centered at `initial_pan`.
    pub fn new(initial_pan: f32) -> Self {
        Self { pan: Param::new(initial_pan.clamp(-1.0, 1.0)) }
    }
}

/// Periodic-wave oscillator, used by the pulse channels.
///
/// Carries `base_freq`, the frozen value sampled at voice construction time
/// (`spec.md` §4.F: "Store `_baseFreq = freq` on the oscillator for effects'
/// benefit") — `port`/`bend`/`sweep` read this rather than the live
/// automated frequency to compute their target.
#[derive(Debug, Clone)]
pub struct OscillatorNode {
    /// Live frequency automation, in Hz.
    pub frequency: Param,
    /// The frequency the voice was constructed with, frozen for effects.
    pub base_freq: f32,
}

impl OscillatorNode {
    /// Creates an oscillator at a fixed base frequency.
    pub fn new(base_freq: f32) -> Self {
        Self {
            frequency: Param::new(base_freq),
            base_freq,
        }
    }
}

/// Looping buffer source, used by the wave and noise channels.
#[derive(Debug, Clone)]
pub struct BufferSourceNode {
    /// Live playback-rate automation (multiplier on the buffer's native rate).
    pub playback_rate: Param,
    /// The frequency/rate the voice was constructed with, frozen for effects
    /// (same role as [`OscillatorNode::base_freq`]).
    pub base_freq: f32,
}

impl BufferSourceNode {
    /// Creates a buffer source at a fixed base playback rate (1.0 = native).
    pub fn new(base_freq: f32, initial_playback_rate: f32) -> Self {
        Self {
            playback_rate: Param::new(initial_playback_rate),
            base_freq,
        }
    }
}

/// The pitch-bearing part of a voice graph: either an oscillator
/// (pulse channels) or a buffer source (wave/noise channels).
#[derive(Debug, Clone)]
pub enum PitchNode {
    /// Oscillator-driven voice (pulse1/pulse2).
    Oscillator(OscillatorNode),
    /// Buffer-source-driven voice (wave/noise).
    BufferSource(BufferSourceNode),
}

impl PitchNode {
    /// The frozen base frequency, regardless of which variant this is.
    pub fn base_freq(&self) -> f32 {
        match self {
            Self::Oscillator(o) => o.base_freq,
            Self::BufferSource(b) => b.base_freq,
        }
    }

    /// The live automated frequency/rate-equivalent `Param`.
    pub fn param_mut(&mut self) -> &mut Param {
        match self {
            Self::Oscillator(o) => &mut o.frequency,
            Self::BufferSource(b) => &mut b.playback_rate,
        }
    }

    /// Read-only access to the live automated `Param`.
    pub fn param(&self) -> &Param {
        match self {
            Self::Oscillator(o) => &o.frequency,
            Self::BufferSource(b) => &b.playback_rate,
        }
    }
}

/// One voice's full node graph: pitch node → gain → optional panner →
/// destination, matching `spec.md` §4.F's "Oscillator → GainNode →
/// destination" shape with the optional panner §4.D's `pan` effect adds.
#[derive(Debug, Clone)]
pub struct VoiceGraph {
    /// The pitch-bearing node (oscillator or buffer source).
    pub pitch: PitchNode,
    /// Gain stage every voice has.
    pub gain: GainNode,
    /// Panner stage, present only when the render capability supports it.
    pub pan: Option<PannerNode>,
}

impl VoiceGraph {
    /// Builds a voice graph around an oscillator, with panning enabled only
    /// if `capability.stereo_pan` is set.
    pub fn with_oscillator(base_freq: f32, initial_gain: f32, capability: Capability) -> Self {
        Self {
            pitch: PitchNode::Oscillator(OscillatorNode::new(base_freq)),
            gain: GainNode::new(initial_gain),
            pan: capability.stereo_pan.then(|| PannerNode::new(0.0)),
        }
    }

    /// Builds a voice graph around a buffer source, with panning enabled
    /// only if `capability.stereo_pan` is set.
    pub fn with_buffer_source(
        base_freq: f32,
        initial_playback_rate: f32,
        initial_gain: f32,
        capability: Capability,
    ) -> Self {
        Self {
            pitch: PitchNode::BufferSource(BufferSourceNode::new(base_freq, initial_playback_rate)),
            gain: GainNode::new(initial_gain),
            pan: capability.stereo_pan.then(|| PannerNode::new(0.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_gated_panner_is_absent_when_unsupported() {
        let cap = Capability { stereo_pan: false };
        let voice = VoiceGraph::with_oscillator(440.0, 1.0, cap);
        assert!(voice.pan.is_none());
    }

    #[test]
    fn oscillator_base_freq_is_frozen() {
        let mut voice = VoiceGraph::with_oscillator(440.0, 1.0, Capability::default());
        voice.pitch.param_mut().linear_ramp_to_value_at_time(880.0, 1.0);
        assert_eq!(voice.pitch.base_freq(), 440.0);
        assert_eq!(voice.pitch.param().value_at(1.0), 880.0);
    }
}
