//! Software LFSR noise generator (the `noise` channel).
//!
//! `spec.md` §4.F: "software LFSR clocked at `4,194,304 / (max(1,divisor) ·
//! 2^(shift+1))` Hz; output = LSB as ±1; 7-bit mode XORs into bit 6.
//! Rendered into a PCM buffer covering `min(1s, dur + 0.05s)`". A
//! free-running shift register clocked independently of the output sample
//! rate, sampled by a phase accumulator.

/// The Game Boy's base noise clock, in Hz.
pub const GB_NOISE_BASE_CLOCK_HZ: f64 = 4_194_304.0;

/// How much of a note's tail the noise buffer pads beyond its own duration.
pub const NOISE_BUFFER_TAIL_SECONDS: f64 = 0.05;

/// The hard ceiling on a single noise buffer's length.
pub const NOISE_BUFFER_MAX_SECONDS: f64 = 1.0;

/// `spec.md`'s clock-divider formula: `divisor` is clamped to at least 1 on
/// real hardware (a divisor code of 0 behaves as 0.5, but this crate treats
/// the post-resolution value already as `max(1, divisor)` per the formula
/// text).
pub fn clock_hz(divisor: u32, shift: u32) -> f64 {
    GB_NOISE_BASE_CLOCK_HZ / (divisor.max(1) as f64 * 2f64.powi(shift as i32 + 1))
}

/// A 15-bit (or, in 7-bit mode, short-period) Galois LFSR.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    lfsr: u16,
    width7: bool,
}

impl NoiseGenerator {
    /// Creates a generator with all-ones seed state (the documented
    /// power-on LFSR value).
    pub fn new(width7: bool) -> Self {
        Self { lfsr: 0x7FFF, width7 }
    }

    /// Clocks the LFSR once and returns the new output bit as `±1`.
    pub fn step(&mut self) -> f32 {
        let feedback = (self.lfsr & 1) ^ ((self.lfsr >> 1) & 1);
        self.lfsr >>= 1;
        self.lfsr |= feedback << 14;
        if self.width7 {
            self.lfsr &= !(1 << 6);
            self.lfsr |= feedback << 6;
        }
        if self.lfsr & 1 == 1 { 1.0 } else { -1.0 }
    }
}

/// Pre-renders a noise voice's whole PCM buffer: `min(1s, dur + 0.05s)` of
/// sample-and-hold LFSR output at `sample_rate`, clocked independently at
/// [`clock_hz`].
pub fn render_noise_buffer(divisor: u32, shift: u32, width7: bool, duration: f64, sample_rate: f64) -> Vec<f32> {
    let buffer_seconds = (duration + NOISE_BUFFER_TAIL_SECONDS).min(NOISE_BUFFER_MAX_SECONDS).max(0.0);
    let len = (buffer_seconds * sample_rate).round() as usize;
    let clock = clock_hz(divisor, shift);

    let mut generator = NoiseGenerator::new(width7);
    let mut current = generator.step();
    let mut phase = 0.0;
    let mut buffer = Vec::with_capacity(len);
    for _ in 0..len {
        phase += clock / sample_rate;
        while phase >= 1.0 {
            phase -= 1.0;
            current = generator.step();
        }
        buffer.push(current);
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formula_matches_spec() {
        let hz = clock_hz(2, 3);
        assert!((hz - GB_NOISE_BASE_CLOCK_HZ / (2.0 * 16.0)).abs() < 1e-6);
    }

    #[test]
    fn zero_divisor_clamps_to_one() {
        assert_eq!(clock_hz(0, 0), clock_hz(1, 0));
    }

    #[test]
    fn lfsr_output_varies_over_time() {
        let mut gen = NoiseGenerator::new(false);
        let outputs: Vec<f32> = (0..200).map(|_| gen.step()).collect();
        assert!(outputs.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn buffer_length_is_capped_at_one_second() {
        let buf = render_noise_buffer(1, 0, false, 10.0, 1000.0);
        assert_eq!(buf.len(), 1000);
    }

    #[test]
    fn buffer_covers_duration_plus_tail_when_under_the_cap() {
        let buf = render_noise_buffer(1, 0, false, 0.1, 1000.0);
        assert_eq!(buf.len(), 150);
    }
}
