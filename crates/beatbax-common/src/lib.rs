//! Shared note math, data model, and audio node-graph primitives for BeatBax.
//!
//! This crate has no dependency on the DSL grammar or the resolver: it
//! provides the vocabulary every other BeatBax crate shares.
//!
//! - [`notes`] — note-name/MIDI/frequency conversions and pattern-text expansion.
//! - [`instrument`] — the instrument data model (envelope, sweep, noise, wave table).
//! - [`param`] — a Web-Audio-`AudioParam`-style automation primitive used by
//!   both the synthesis and effect layers.
//! - [`graph`] — minimal node types (gain, panner, oscillator, buffer source)
//!   built on top of [`param::Param`], plus the [`graph::Capability`] struct
//!   effect handlers use to no-op around missing optional features.
//! - [`diag`] — diagnostics (warnings/errors) with source locations.

#![warn(missing_docs)]

pub mod diag;
pub mod graph;
pub mod instrument;
pub mod notes;
pub mod param;

pub use diag::{Diagnostic, Severity, SourceLocation};
pub use graph::{Capability, GainNode, OscillatorNode, Param, RampKind};
pub use instrument::{Envelope, EnvelopeDirection, Instrument, InstrumentType, Noise, Sweep, SweepDirection};
pub use notes::{midi_to_note, note_to_midi, note_to_frequency};
