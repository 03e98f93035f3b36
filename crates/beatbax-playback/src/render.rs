//! Offline PCM rendering: `spec.md` §6's `export wav` surface, and the
//! authoritative non-realtime counterpart to [`crate::orchestrator::Orchestrator`].
//!
//! Where the orchestrator schedules callbacks through [`beatbax_scheduler`]
//! and lets voices render as the host's audio graph pulls samples, offline
//! rendering has no host loop to drive it: every event's voice graph is
//! built and rendered up front, then mixed down sample-by-sample into one
//! buffer. Both paths share the same per-event construction
//! (`beatbax_synth::build_voice`) and effect application
//! (`beatbax_effects::default_registry`), so a rendered WAV matches what
//! realtime playback would have produced.

use std::collections::HashMap;

use beatbax_common::graph::Capability;
use beatbax_effects::{default_registry, ChannelEffectState, EffectContext};
use beatbax_resolver::{ChannelEventKind, ResolvedSong};
use beatbax_synth::{build_voice, render_voice};

use crate::freq::base_frequency;

/// The 0.1s pre-roll every render uses before the first event, matching the
/// realtime orchestrator's scheduling lead (`spec.md` §4.G/§4.E).
const PREROLL_SECONDS: f64 = 0.1;

/// Configuration for an offline render.
#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    /// Output sample rate, in Hz.
    pub sample_rate: u32,
    /// Which optional render features to simulate as available.
    pub capability: Capability,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { sample_rate: 44_100, capability: Capability::default() }
    }
}

/// Renders `song` to a single mono `f32` PCM buffer at `config.sample_rate`,
/// mixing every channel's events by simple summation (no limiter or
/// loudness normalization is applied beyond unity-peak clamping; final
/// gain staging is left to the `export wav` caller).
pub fn render(song: &ResolvedSong, config: &RenderConfig) -> Vec<f32> {
    let registry = default_registry();
    let mut channel_state: HashMap<u32, ChannelEffectState> = HashMap::new();

    let mut max_end = PREROLL_SECONDS;
    for channel in &song.channels {
        let tick_seconds = 60.0 / (song.bpm * channel.speed_multiplier) / 4.0;
        let total_ticks: u32 = channel.events.iter().map(|e| e.duration_ticks).sum();
        max_end = max_end.max(PREROLL_SECONDS + total_ticks as f64 * tick_seconds);
    }

    let total_samples = (max_end * config.sample_rate as f64).ceil() as usize;
    let mut mix = vec![0.0f32; total_samples];

    for channel in &song.channels {
        let tick_seconds = 60.0 / (song.bpm * channel.speed_multiplier) / 4.0;
        let state = channel_state.entry(channel.id).or_default();
        let mut t = PREROLL_SECONDS;
        for event in &channel.events {
            let duration = event.duration_ticks as f64 * tick_seconds;
            if matches!(event.kind, ChannelEventKind::Rest) {
                t += duration;
                continue;
            }
            if let Some(instrument) = song.instruments.get(&event.instrument) {
                let base_freq = base_frequency(&event.kind);
                let (mut graph, kind) = build_voice(instrument, base_freq, config.capability, t, duration);

                for inline in &event.effects {
                    let mut ctx = EffectContext {
                        voice: &mut graph,
                        capability: config.capability,
                        start_time: t,
                        duration,
                        tick_seconds,
                        base_freq,
                        channel_state: state,
                    };
                    registry.apply(&inline.name, &mut ctx, &inline.params);
                }

                let voice_buffer = render_voice(&kind, &graph, config.sample_rate, t, duration);
                mix_into(&mut mix, &voice_buffer, t, config.sample_rate);
            }
            t += duration;
        }
    }

    let peak = mix.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak > 1.0 {
        for sample in &mut mix {
            *sample /= peak;
        }
    }

    mix
}

/// Adds `voice_buffer` into `mix` starting at `start_time`, clamping to the
/// mix buffer's bounds (a voice's release tail never exceeds what
/// [`render`]'s duration accounting already reserved, but this guards
/// against floating-point rounding at the very last sample).
fn mix_into(mix: &mut [f32], voice_buffer: &[f32], start_time: f64, sample_rate: u32) {
    let start_sample = (start_time * sample_rate as f64).round() as usize;
    for (i, sample) in voice_buffer.iter().enumerate() {
        let index = start_sample + i;
        if index >= mix.len() {
            break;
        }
        mix[index] += sample;
    }
}
