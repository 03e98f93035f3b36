//! Built-in effect handlers.
//!
//! Each handler schedules [`beatbax_common::param::Param`] automation on
//! the voice graph it's given; none of them mix audio directly (that's
//! `beatbax-synth`'s job at render time). Every handler degrades
//! gracefully when an optional node is absent (`pan` with no panner) or a
//! parameter is missing/malformed (`beatbax-effects::params`'s lenient
//! parsing) — `spec.md` §8 testable property 7.

use std::f64::consts::PI;

use crate::context::EffectContext;
use crate::params::{f32_at, f64_at, u32_at};

const LFO_STEPS: u32 = 16;

/// `pan(value)` — sets stereo position immediately; no-op without a panner.
pub fn pan(ctx: &mut EffectContext, params: &[String]) {
    let Some(panner) = ctx.voice.pan.as_mut() else { return };
    let value = f32_at(params, 0, 0.0).clamp(-1.0, 1.0);
    panner.pan.set_value_at_time(value, ctx.start_time);
}

/// `vib(depth, rate=4)` — frequency vibrato, sampled as a piecewise-linear
/// approximation of a sine LFO (`Param` has no native oscillator). `depth`
/// is scaled to a tracker-style 0..15 step count and then to Hz, tuned to
/// match hUGETracker (`spec.md` §4.D): `trackerDepth = round(clamp(depth·4,
/// 0, 15))`, amplitude (Hz) = `baseFreq · trackerDepth · 0.012`.
pub fn vib(ctx: &mut EffectContext, params: &[String]) {
    if ctx.duration <= 0.0 {
        return;
    }
    let depth = f32_at(params, 0, 2.0);
    let rate = f32_at(params, 1, 4.0).max(0.0);
    let tracker_depth = (depth * 4.0).clamp(0.0, 15.0).round();
    let amplitude_hz = ctx.base_freq * tracker_depth * 0.012;
    let base = ctx.base_freq;
    let param = ctx.voice.pitch.param_mut();
    for i in 0..=LFO_STEPS {
        let t = ctx.start_time + ctx.duration * (i as f64 / LFO_STEPS as f64);
        let phase = 2.0 * PI * rate as f64 * (t - ctx.start_time);
        let freq = base + amplitude_hz * phase.sin() as f32;
        if i == 0 {
            param.set_value_at_time(freq, t);
        } else {
            param.linear_ramp_to_value_at_time(freq, t);
        }
    }
}

/// `port(speed∈[1,255])` — portamento: exponential (fallback linear) ramp
/// from the previous note's frequency on this channel to this note's
/// frequency, only when the two differ by more than 1 Hz (`spec.md` §4.D):
/// `portDuration = (256 − speed)/256 · dur · 0.6`, then holds the target
/// until the event ends.
pub fn port(ctx: &mut EffectContext, params: &[String]) {
    let speed = f32_at(params, 0, 128.0).clamp(1.0, 255.0);
    let port_duration = ((256.0 - speed) / 256.0) as f64 * ctx.duration * 0.6;
    let from = ctx.channel_state.last_portamento_freq.unwrap_or(ctx.base_freq);
    let to = ctx.base_freq;
    if (to - from).abs() > 1.0 {
        let param = ctx.voice.pitch.param_mut();
        param.set_value_at_time(from, ctx.start_time);
        param.exponential_ramp_to_value_at_time(to, ctx.start_time + port_duration);
    }
    ctx.channel_state.last_portamento_freq = Some(to);
}

/// `arp(offset, offset, ...)` — arpeggio: cycles `[0, offsets...]`, the
/// base note always sounding first, through `base_freq` shifted by each
/// offset in semitones, at the chip's frame rate (`spec.md` §4.D: Game Boy
/// 60 Hz), for the event's whole duration.
pub fn arp(ctx: &mut EffectContext, params: &[String]) {
    const GAMEBOY_FRAME_HZ: f64 = 60.0;
    let mut offsets: Vec<i32> = vec![0];
    offsets.extend(params.iter().filter_map(|p| p.trim().parse::<i32>().ok()));
    let step = 1.0 / GAMEBOY_FRAME_HZ;
    let base = ctx.base_freq;
    let param = ctx.voice.pitch.param_mut();
    let mut t = ctx.start_time;
    let mut i = 0usize;
    while t < ctx.start_time + ctx.duration {
        let ratio = 2f32.powf(offsets[i % offsets.len()] as f32 / 12.0);
        param.set_value_at_time(base * ratio, t);
        t += step;
        i += 1;
    }
}

/// `volSlide(targetGain, timeSeconds?)` — cancels existing gain automation
/// and ramps linearly to `targetGain`.
pub fn vol_slide(ctx: &mut EffectContext, params: &[String]) {
    let target = f32_at(params, 0, 1.0).max(0.0);
    let time = f64_at(params, 1, ctx.duration).max(0.0);
    ctx.voice.gain.gain.cancel_and_hold_at_time(ctx.start_time);
    ctx.voice.gain.gain.linear_ramp_to_value_at_time(target, ctx.start_time + time);
}

/// `trem(depth∈[0,15], rate=6)` — tremolo: amplitude LFO around the gain
/// value already in effect at the event's start. Modulation depth
/// (`spec.md` §4.D) = `(depth/15)·0.5`.
pub fn trem(ctx: &mut EffectContext, params: &[String]) {
    if ctx.duration <= 0.0 {
        return;
    }
    let depth = f32_at(params, 0, 8.0).clamp(0.0, 15.0);
    let rate = f32_at(params, 1, 6.0).max(0.0);
    let modulation_depth = (depth / 15.0) * 0.5;
    let base_gain = ctx.voice.gain.gain.value_at(ctx.start_time);
    let param = &mut ctx.voice.gain.gain;
    for i in 0..=LFO_STEPS {
        let t = ctx.start_time + ctx.duration * (i as f64 / LFO_STEPS as f64);
        let phase = 2.0 * PI * rate as f64 * (t - ctx.start_time);
        let modulation = (phase.sin() as f32 + 1.0) / 2.0;
        let gain = (base_gain * (1.0 - modulation_depth + modulation_depth * modulation)).max(0.0);
        if i == 0 {
            param.set_value_at_time(gain, t);
        } else {
            param.linear_ramp_to_value_at_time(gain, t);
        }
    }
}

/// `cut(ticks, tickSec?)` — ramps the gain to zero over a 5 ms fade,
/// starting at `start + ticks·tickSec` (`spec.md` §4.D). `tickSec` defaults
/// to the channel's own tick length.
pub fn cut(ctx: &mut EffectContext, params: &[String]) {
    const FADE_SECONDS: f64 = 0.005;
    let ticks = f64_at(params, 0, 0.0).max(0.0);
    let tick_seconds = f64_at(params, 1, ctx.tick_seconds).max(0.0);
    let cut_time = ctx.start_time + ticks * tick_seconds;
    let gain = &mut ctx.voice.gain.gain;
    let held = gain.value_at(cut_time);
    gain.set_value_at_time(held, cut_time);
    gain.linear_ramp_to_value_at_time(0.0, cut_time + FADE_SECONDS);
}

/// `retrig(intervalSeconds, gain?)` — restrikes the gain envelope at fixed
/// sub-intervals across the event's duration.
pub fn retrig(ctx: &mut EffectContext, params: &[String]) {
    let interval = f64_at(params, 0, 0.1).max(0.001);
    let gain = f32_at(params, 1, 1.0).max(0.0);
    let gain_param = &mut ctx.voice.gain.gain;
    let mut t = ctx.start_time;
    while t < ctx.start_time + ctx.duration {
        gain_param.set_value_at_time(0.0, t);
        gain_param.linear_ramp_to_value_at_time(gain, t + interval * 0.1);
        t += interval;
    }
}

/// `bend(semitones, timeSeconds?)` — a one-shot pitch bend ramp.
pub fn bend(ctx: &mut EffectContext, params: &[String]) {
    let semitones = f32_at(params, 0, 0.0);
    let time = f64_at(params, 1, ctx.duration).max(0.0);
    let target = ctx.base_freq * 2f32.powf(semitones / 12.0);
    let param = ctx.voice.pitch.param_mut();
    param.set_value_at_time(ctx.base_freq, ctx.start_time);
    param.linear_ramp_to_value_at_time(target, ctx.start_time + time);
}

/// `sweep(timeCode, direction, shift)` — NR10-style hardware frequency
/// sweep: `timeCode` in `0..=7` steps of `1/128` second, `shift` in
/// `0..=7`. A `timeCode` or `shift` of zero is a documented hardware
/// no-op.
pub fn sweep(ctx: &mut EffectContext, params: &[String]) {
    let time_code = u32_at(params, 0, 0).min(7);
    let shift = u32_at(params, 2, 0).min(7);
    if time_code == 0 || shift == 0 {
        return;
    }
    let up = params.get(1).map(|s| s.trim().eq_ignore_ascii_case("up")).unwrap_or(false);
    let period = time_code as f64 / 128.0;
    let mut freq = ctx.base_freq;
    let mut t = ctx.start_time;
    let param = ctx.voice.pitch.param_mut();
    param.set_value_at_time(freq, t);
    while t < ctx.start_time + ctx.duration {
        let delta = freq / 2f32.powi(shift as i32);
        freq = if up { freq + delta } else { (freq - delta).max(1.0) };
        t += period;
        param.linear_ramp_to_value_at_time(freq, t);
        if freq <= 1.0 {
            break;
        }
    }
}

/// `echo(delaySeconds, decay, repeats)` — schedules decaying gain bumps
/// after the event's own duration, approximating a tap-delay echo without
/// spawning additional voices (`beatbax-synth`/`beatbax-playback` own
/// voice lifecycle; this handler only ever touches the one voice it was
/// given).
pub fn echo(ctx: &mut EffectContext, params: &[String]) {
    let delay = f64_at(params, 0, 0.2).max(0.01);
    let decay = f32_at(params, 1, 0.5).clamp(0.0, 1.0);
    let repeats = u32_at(params, 2, 3);
    let mut amplitude = ctx.voice.gain.gain.value_at(ctx.start_time);
    let gain_param = &mut ctx.voice.gain.gain;
    for i in 1..=repeats {
        let t = ctx.start_time + ctx.duration + delay * i as f64;
        amplitude *= decay;
        gain_param.set_value_at_time(amplitude.max(0.0001), t);
        gain_param.linear_ramp_to_value_at_time(0.0, t + delay * 0.5);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatbax_common::graph::{Capability, VoiceGraph};

    fn ctx_for<'a>(voice: &'a mut VoiceGraph, state: &'a mut crate::context::ChannelEffectState) -> EffectContext<'a> {
        EffectContext {
            voice,
            capability: Capability::default(),
            start_time: 0.0,
            duration: 1.0,
            tick_seconds: 0.125,
            base_freq: 440.0,
            channel_state: state,
        }
    }

    #[test]
    fn pan_no_ops_without_panner_node() {
        let mut voice = VoiceGraph::with_oscillator(440.0, 1.0, Capability { stereo_pan: false });
        let mut state = crate::context::ChannelEffectState::default();
        let mut ctx = ctx_for(&mut voice, &mut state);
        pan(&mut ctx, &["1.0".to_string()]);
        assert!(ctx.voice.pan.is_none());
    }

    #[test]
    fn pan_sets_value_when_available() {
        let mut voice = VoiceGraph::with_oscillator(440.0, 1.0, Capability::default());
        let mut state = crate::context::ChannelEffectState::default();
        let mut ctx = ctx_for(&mut voice, &mut state);
        pan(&mut ctx, &["0.5".to_string()]);
        assert_eq!(ctx.voice.pan.as_ref().unwrap().pan.value_at(0.0), 0.5);
    }

    #[test]
    fn port_uses_and_updates_channel_state() {
        let mut voice = VoiceGraph::with_oscillator(880.0, 1.0, Capability::default());
        let mut state = crate::context::ChannelEffectState { last_portamento_freq: Some(440.0) };
        {
            let mut ctx = ctx_for(&mut voice, &mut state);
            port(&mut ctx, &["64".to_string()]);
        }
        assert_eq!(state.last_portamento_freq, Some(880.0));
        assert_eq!(voice.pitch.param().value_at(0.0), 440.0);
    }

    #[test]
    fn port_is_a_no_op_within_one_hertz() {
        let mut voice = VoiceGraph::with_oscillator(440.0, 1.0, Capability::default());
        let mut state = crate::context::ChannelEffectState { last_portamento_freq: Some(440.5) };
        let mut ctx = ctx_for(&mut voice, &mut state);
        port(&mut ctx, &["64".to_string()]);
        assert_eq!(ctx.voice.pitch.param().value_at(1.0), 440.0);
    }

    #[test]
    fn sweep_is_a_no_op_with_zero_shift() {
        let mut voice = VoiceGraph::with_oscillator(440.0, 1.0, Capability::default());
        let mut state = crate::context::ChannelEffectState::default();
        let mut ctx = ctx_for(&mut voice, &mut state);
        sweep(&mut ctx, &["4".to_string(), "up".to_string(), "0".to_string()]);
        assert_eq!(ctx.voice.pitch.param().value_at(10.0), 440.0);
    }

    #[test]
    fn cut_silences_after_ticks_with_a_five_millisecond_fade() {
        let mut voice = VoiceGraph::with_oscillator(440.0, 1.0, Capability::default());
        let mut state = crate::context::ChannelEffectState::default();
        let mut ctx = ctx_for(&mut voice, &mut state);
        cut(&mut ctx, &["2".to_string()]);
        assert_eq!(ctx.voice.gain.gain.value_at(0.2), 1.0);
        assert_eq!(ctx.voice.gain.gain.value_at(0.25), 1.0);
        assert_eq!(ctx.voice.gain.gain.value_at(0.255), 0.0);
    }

    #[test]
    fn arp_always_cycles_the_base_note_first() {
        let mut voice = VoiceGraph::with_oscillator(440.0, 1.0, Capability::default());
        let mut state = crate::context::ChannelEffectState::default();
        let mut ctx = ctx_for(&mut voice, &mut state);
        ctx.duration = 1.0 / 60.0;
        arp(&mut ctx, &["3".to_string(), "7".to_string()]);
        assert_eq!(ctx.voice.pitch.param().value_at(0.0), 440.0);
    }
}
