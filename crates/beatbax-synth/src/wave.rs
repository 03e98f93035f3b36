//! 4-bit wavetable oscillator (the `wave` channel).
//!
//! `spec.md` §4.F: "16-sample table normalized to `[-1, +1]` written into a
//! 1-cycle buffer sampled at 8192 Hz; looping buffer source, `playbackRate =
//! (freq · cycleLen)/8192`".
//!
//! This crate's [`VoiceGraph`](beatbax_common::graph::VoiceGraph) models
//! every pitch node's live `Param` in Hz-equivalent units (so effects like
//! `port`/`bend` can treat the oscillator and buffer-source cases
//! uniformly) — [`WAVE_CYCLE_SAMPLE_RATE`] and [`playback_rate_for`] are
//! exposed to document the hardware-accurate ratio, but playback itself
//! derives its phase increment directly from the Hz-equivalent rate.

const WAVE_TABLE_LEN: usize = 16;

/// The reference sample rate the one-cycle wave buffer is nominally stored
/// at; kept for documentation/parity with `spec.md`'s formula.
pub const WAVE_CYCLE_SAMPLE_RATE: f64 = 8192.0;

/// `spec.md`'s `playbackRate = (freq · cycleLen) / 8192` formula, exposed
/// for callers that want the literal hardware ratio (e.g. diagnostics) even
/// though [`WaveOscillator::sample`] doesn't need it directly.
pub fn playback_rate_for(freq: f32) -> f32 {
    (freq * WAVE_TABLE_LEN as f32) / WAVE_CYCLE_SAMPLE_RATE as f32
}

/// Normalizes a 4-bit (`0..=15`) wave table to `[-1, 1]`.
pub fn normalize_wave_table(raw: &[u8; WAVE_TABLE_LEN]) -> [f32; WAVE_TABLE_LEN] {
    let mut out = [0.0f32; WAVE_TABLE_LEN];
    for (i, &sample) in raw.iter().enumerate() {
        out[i] = (sample as f32 / 7.5) - 1.0;
    }
    out
}

/// A looping 16-sample wavetable oscillator.
#[derive(Debug, Clone)]
pub struct WaveOscillator {
    table: [f32; WAVE_TABLE_LEN],
    phase: f64,
}

impl WaveOscillator {
    /// Creates an oscillator over an already-normalized table.
    pub fn new(table: [f32; WAVE_TABLE_LEN]) -> Self {
        Self { table, phase: 0.0 }
    }

    /// Advances by one sample at `rate_hz` (the fundamental frequency the
    /// 16-sample cycle should repeat at) and `sample_rate`, with linear
    /// interpolation between table entries.
    pub fn sample(&mut self, rate_hz: f32, sample_rate: f64) -> f32 {
        let step = (rate_hz as f64 * WAVE_TABLE_LEN as f64) / sample_rate;
        self.phase += step;
        self.phase -= (self.phase / WAVE_TABLE_LEN as f64).floor() * WAVE_TABLE_LEN as f64;

        let index = self.phase.floor() as usize % WAVE_TABLE_LEN;
        let next_index = (index + 1) % WAVE_TABLE_LEN;
        let frac = (self.phase - self.phase.floor()) as f32;
        self.table[index] * (1.0 - frac) + self.table[next_index] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_full_scale_table_to_unit_range() {
        let raw = [0u8, 15, 0, 15, 0, 15, 0, 15, 0, 15, 0, 15, 0, 15, 0, 15];
        let table = normalize_wave_table(&raw);
        assert!((table[0] - (-1.0)).abs() < 1e-6);
        assert!((table[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn oscillator_cycles_through_the_table_without_runaway_growth() {
        let table = normalize_wave_table(&[8; 16]);
        let mut osc = WaveOscillator::new(table);
        for _ in 0..1000 {
            let s = osc.sample(440.0, 44_100.0);
            assert!(s.abs() < 1.01, "unexpected sample {s}");
        }
    }

    #[test]
    fn playback_rate_formula_matches_documented_ratio() {
        let rate = playback_rate_for(512.0);
        assert!((rate - 1.0).abs() < 1e-6, "512 Hz over a 16-sample/8192Hz cycle should be rate 1.0, got {rate}");
    }
}
