//! Game Boy NR-style volume envelope, scheduled onto a voice's gain `Param`.

use beatbax_common::instrument::{Envelope, EnvelopeDirection};
use beatbax_common::param::Param;

/// Length of one hardware envelope step, in seconds (`1/64 s`).
pub const ENVELOPE_STEP_SECONDS: f64 = 1.0 / 64.0;

/// How many envelope steps make a full sweep from silent to full volume (or
/// vice versa) — `spec.md` §4.F: "`period · (1/64) · 7` seconds".
pub const ENVELOPE_STEPS_TO_EXTREME: f64 = 7.0;

/// How long before `start + dur` the release ramp begins.
pub const RELEASE_LEAD_SECONDS: f64 = 0.02;

/// Schedules `envelope`'s ramp onto `gain`, then schedules the release ramp
/// to silence ending at `start_time + duration`.
///
/// `direction: none` holds the initial level for the ramp phase, but the
/// release ramp at the tail always applies — a note always fades out by its
/// own end, full stop or not, so that back-to-back voices on the same
/// channel never click.
pub fn apply_envelope(gain: &mut Param, envelope: &Envelope, start_time: f64, duration: f64) {
    let initial_gain = (envelope.initial as f32 / 15.0).clamp(0.0, 1.0);
    gain.set_value_at_time(initial_gain, start_time);

    let ramp_seconds = envelope.period as f64 * ENVELOPE_STEP_SECONDS * ENVELOPE_STEPS_TO_EXTREME;
    match envelope.direction {
        EnvelopeDirection::Down => {
            gain.linear_ramp_to_value_at_time(0.0, start_time + ramp_seconds);
        }
        EnvelopeDirection::Up => {
            gain.linear_ramp_to_value_at_time(1.0, start_time + ramp_seconds);
        }
        EnvelopeDirection::None => {}
    }

    let end_time = start_time + duration;
    let release_start = (end_time - RELEASE_LEAD_SECONDS).max(start_time);
    if release_start < end_time {
        let held = gain.value_at(release_start);
        gain.set_value_at_time(held, release_start);
        gain.linear_ramp_to_value_at_time(0.0, end_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sets_initial_level_from_envelope() {
        let mut gain = Param::new(0.0);
        let env = Envelope { initial: 12, direction: EnvelopeDirection::None, period: 0 };
        apply_envelope(&mut gain, &env, 0.0, 1.0);
        assert!((gain.value_at(0.0) - 12.0 / 15.0).abs() < 1e-6);
    }

    #[test]
    fn down_direction_ramps_toward_silence() {
        let mut gain = Param::new(0.0);
        let env = Envelope { initial: 15, direction: EnvelopeDirection::Down, period: 4 };
        apply_envelope(&mut gain, &env, 0.0, 10.0);
        let ramp_end = 4.0 * ENVELOPE_STEP_SECONDS * ENVELOPE_STEPS_TO_EXTREME;
        assert!(gain.value_at(ramp_end) < 0.05);
    }

    #[test]
    fn release_fades_to_zero_by_the_end() {
        let mut gain = Param::new(0.0);
        let env = Envelope { initial: 15, direction: EnvelopeDirection::None, period: 0 };
        apply_envelope(&mut gain, &env, 0.0, 0.5);
        assert_eq!(gain.value_at(0.5), 0.0);
        assert!(gain.value_at(0.5 - RELEASE_LEAD_SECONDS) > 0.9);
    }

    #[test]
    fn short_notes_still_release_cleanly() {
        let mut gain = Param::new(0.0);
        let env = Envelope { initial: 15, direction: EnvelopeDirection::None, period: 0 };
        apply_envelope(&mut gain, &env, 0.0, 0.005);
        assert_eq!(gain.value_at(0.005), 0.0);
    }
}
