//! Ties an instrument definition to a concrete voice graph and renders it.
//!
//! `spec.md` §4.F: "Each voice is built lazily at schedule time and
//! destroys itself at `start + dur + ε`." [`build_voice`] is the
//! construction half (run once, at schedule time, by the playback
//! orchestrator); [`render_voice`] is the rendering half (run by the
//! realtime or offline renderer once the voice's automation — envelope,
//! sweep, and whatever effect handlers ran — is fully scheduled).

use beatbax_common::graph::{Capability, VoiceGraph};
use beatbax_common::instrument::{Instrument, InstrumentType, Noise, SweepDirection};

use crate::envelope::apply_envelope;
use crate::noise::render_noise_buffer;
use crate::pulse::PulseOscillator;
use crate::wave::{normalize_wave_table, WaveOscillator};

/// Which generator a built voice renders through.
#[derive(Debug, Clone)]
pub enum VoiceKind {
    /// Fourier-series band-limited pulse, at the given duty percentage.
    Pulse {
        /// Duty cycle, 0..100.
        duty: f32,
    },
    /// 16-sample wavetable, already normalized to `[-1, 1]`.
    Wave {
        /// The normalized wave table.
        table: [f32; 16],
        /// Output scale, 0..100 (`spec.md`'s `volume/100`).
        volume_percent: f32,
    },
    /// Software LFSR noise.
    Noise {
        /// `true` for 7-bit ("short"/"Mad Max") mode.
        lfsr_width7: bool,
        /// Clock divisor code.
        divisor: u32,
        /// Clock shift exponent.
        shift: u32,
    },
}

/// Builds the voice graph and generator kind for one sounding event,
/// scheduling the instrument's envelope (and, for `pulse1`, its hardware
/// sweep) onto the graph immediately.
pub fn build_voice(
    instrument: &Instrument,
    base_freq: f32,
    capability: Capability,
    start_time: f64,
    duration: f64,
) -> (VoiceGraph, VoiceKind) {
    match instrument.instrument_type {
        InstrumentType::Pulse1 | InstrumentType::Pulse2 => {
            let mut graph = VoiceGraph::with_oscillator(base_freq, 0.0, capability);
            apply_envelope(&mut graph.gain.gain, &instrument.env, start_time, duration);
            if instrument.instrument_type == InstrumentType::Pulse1 {
                if let Some(sweep) = instrument.sweep {
                    apply_hardware_sweep(&mut graph, sweep, base_freq, start_time, duration);
                }
            }
            let duty = instrument.duty.unwrap_or(50.0);
            (graph, VoiceKind::Pulse { duty })
        }
        InstrumentType::Wave => {
            let mut graph = VoiceGraph::with_buffer_source(base_freq, base_freq, 0.0, capability);
            schedule_wave_gain(&mut graph, start_time, duration);
            let table = instrument.wave.map(|raw| normalize_wave_table(&raw)).unwrap_or([0.0; 16]);
            (graph, VoiceKind::Wave { table, volume_percent: instrument.wave_volume.gain() * 100.0 })
        }
        InstrumentType::Noise => {
            let mut graph = VoiceGraph::with_buffer_source(base_freq, base_freq, 0.0, capability);
            apply_envelope(&mut graph.gain.gain, &instrument.env, start_time, duration);
            let noise = instrument.noise.unwrap_or(Noise { clock_shift: 0, width_mode: 15, divisor: 1 });
            (
                graph,
                VoiceKind::Noise {
                    lfsr_width7: noise.width_mode == 7,
                    divisor: noise.divisor as u32,
                    shift: noise.clock_shift as u32,
                },
            )
        }
    }
}

/// The wave channel has no NR-style envelope (`spec.md` §4.F only describes
/// one for pulse/noise); this just holds full gain and applies the same
/// click-avoiding tail release every voice gets.
fn schedule_wave_gain(graph: &mut VoiceGraph, start_time: f64, duration: f64) {
    const RELEASE_LEAD_SECONDS: f64 = 0.02;
    graph.gain.gain.set_value_at_time(1.0, start_time);
    let end = start_time + duration;
    let release_start = (end - RELEASE_LEAD_SECONDS).max(start_time);
    if release_start < end {
        graph.gain.gain.set_value_at_time(1.0, release_start);
        graph.gain.gain.linear_ramp_to_value_at_time(0.0, end);
    }
}

fn apply_hardware_sweep(
    graph: &mut VoiceGraph,
    sweep: beatbax_common::instrument::Sweep,
    base_freq: f32,
    start_time: f64,
    duration: f64,
) {
    if sweep.time == 0 || sweep.shift == 0 {
        return;
    }
    let period = sweep.time as f64 / 128.0;
    let mut freq = base_freq;
    let mut t = start_time;
    let param = graph.pitch.param_mut();
    param.set_value_at_time(freq, t);
    while t < start_time + duration {
        let delta = freq / 2f32.powi(sweep.shift as i32);
        freq = match sweep.direction {
            SweepDirection::Up => freq + delta,
            SweepDirection::Down => (freq - delta).max(1.0),
        };
        t += period;
        param.linear_ramp_to_value_at_time(freq, t);
        if freq <= 1.0 {
            break;
        }
    }
}

/// Renders `duration` seconds of `kind` starting at `start_time`, sampling
/// `graph`'s automated frequency/gain `Param`s (already carrying envelope,
/// sweep, and any effect-handler ramps) at each output sample.
pub fn render_voice(kind: &VoiceKind, graph: &VoiceGraph, sample_rate: u32, start_time: f64, duration: f64) -> Vec<f32> {
    let sample_count = (duration.max(0.0) * sample_rate as f64).round() as usize;
    let mut buffer = vec![0.0f32; sample_count];

    match kind {
        VoiceKind::Pulse { duty } => {
            let mut osc = PulseOscillator::new(*duty);
            for (i, out) in buffer.iter_mut().enumerate() {
                let t = start_time + i as f64 / sample_rate as f64;
                let freq = graph.pitch.param().value_at(t);
                let gain = graph.gain.gain.value_at(t);
                *out = osc.sample(freq, sample_rate as f64) * gain;
            }
        }
        VoiceKind::Wave { table, volume_percent } => {
            let mut osc = WaveOscillator::new(*table);
            let scale = (volume_percent / 100.0).clamp(0.0, 1.0);
            for (i, out) in buffer.iter_mut().enumerate() {
                let t = start_time + i as f64 / sample_rate as f64;
                let rate_hz = graph.pitch.param().value_at(t);
                let gain = graph.gain.gain.value_at(t);
                *out = osc.sample(rate_hz, sample_rate as f64) * gain * scale;
            }
        }
        VoiceKind::Noise { lfsr_width7, divisor, shift } => {
            let noise_buffer = render_noise_buffer(*divisor, *shift, *lfsr_width7, duration, sample_rate as f64);
            for (i, out) in buffer.iter_mut().enumerate() {
                let t = start_time + i as f64 / sample_rate as f64;
                let gain = graph.gain.gain.value_at(t);
                *out = noise_buffer.get(i).copied().unwrap_or(0.0) * gain;
            }
        }
    }

    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatbax_common::instrument::{Envelope, EnvelopeDirection};

    fn pulse_instrument() -> Instrument {
        Instrument {
            instrument_type: InstrumentType::Pulse1,
            duty: Some(50.0),
            env: Envelope { initial: 15, direction: EnvelopeDirection::None, period: 0 },
            wave: None,
            wave_volume: beatbax_common::instrument::WaveVolume::Full,
            sweep: None,
            noise: None,
        }
    }

    #[test]
    fn build_voice_for_pulse_exposes_frozen_base_frequency() {
        let inst = pulse_instrument();
        let (graph, _kind) = build_voice(&inst, 440.0, Capability::default(), 0.0, 0.5);
        assert_eq!(graph.pitch.base_freq(), 440.0);
    }

    #[test]
    fn render_voice_produces_the_requested_sample_count() {
        let inst = pulse_instrument();
        let (graph, kind) = build_voice(&inst, 440.0, Capability::default(), 0.0, 0.1);
        let buffer = render_voice(&kind, &graph, 44_100, 0.0, 0.1);
        assert_eq!(buffer.len(), 4410);
    }

    #[test]
    fn render_voice_fades_to_silence_at_the_very_end() {
        let inst = pulse_instrument();
        let (graph, kind) = build_voice(&inst, 440.0, Capability::default(), 0.0, 0.1);
        let buffer = render_voice(&kind, &graph, 44_100, 0.0, 0.1);
        assert_eq!(*buffer.last().unwrap(), 0.0);
    }

    #[test]
    fn noise_voice_renders_without_a_wave_table() {
        let inst = Instrument {
            instrument_type: InstrumentType::Noise,
            duty: None,
            env: Envelope { initial: 15, direction: EnvelopeDirection::None, period: 0 },
            wave: None,
            wave_volume: beatbax_common::instrument::WaveVolume::Full,
            sweep: None,
            noise: Some(Noise { clock_shift: 0, width_mode: 15, divisor: 1 }),
        };
        let (graph, kind) = build_voice(&inst, 200.0, Capability::default(), 0.0, 0.05);
        let buffer = render_voice(&kind, &graph, 44_100, 0.0, 0.05);
        assert_eq!(buffer.len(), 2205);
    }
}
