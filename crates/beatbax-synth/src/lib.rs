//! Game Boy channel synthesis: pulse, wave, and noise voice generators, and
//! the envelope automation shared across them.
//!
//! - [`pulse`] — band-limited Fourier-series pulse oscillator.
//! - [`wave`] — 16-sample wavetable oscillator.
//! - [`noise`] — software LFSR noise generator.
//! - [`envelope`] — NR-style volume envelope scheduling.
//! - [`voice`] — ties an [`Instrument`](beatbax_common::instrument::Instrument)
//!   to a concrete voice graph and renders PCM from it.

#![warn(missing_docs)]

pub mod envelope;
pub mod noise;
pub mod pulse;
pub mod voice;
pub mod wave;

pub use voice::{build_voice, render_voice, VoiceKind};
