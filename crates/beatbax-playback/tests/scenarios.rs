//! Black-box coverage of the end-to-end scenarios in `spec.md` §8 (S5, S6)
//! that exercise the full parse -> resolve -> offline render pipeline,
//! checking the rendered PCM rather than one module's internals.

use beatbax_parser::builder::{parse_source, ParseMode};
use beatbax_playback::render::{render, RenderConfig};
use beatbax_resolver::{resolve, ResolvedSong};

fn resolved(source: &str) -> ResolvedSong {
    let out = parse_source(source, ParseMode::Song).unwrap();
    resolve(&out.song).0
}

fn average_abs(buffer: &[f32], start: usize, end: usize) -> f32 {
    let end = end.min(buffer.len());
    if start >= end {
        return 0.0;
    }
    let slice = &buffer[start..end];
    slice.iter().map(|s| s.abs()).sum::<f32>() / slice.len() as f32
}

/// S5 - An `arp` effect keeps the voice sounding for the whole event,
/// cycling `[0, 3, 7]` semitones over the base note at 1/60 s steps, so
/// audio stays well above noise floor well past the first two ticks.
#[test]
fn s5_arpeggio_keeps_the_voice_sounding_across_the_event() {
    let song = resolved(
        "inst L type=pulse1 env=15,flat\npat p = C4<arp:3,7>:4\nchannel 1 => inst L pat p\n",
    );
    let config = RenderConfig { sample_rate: 8_000, ..RenderConfig::default() };
    let buffer = render(&song, &config);

    // preroll 0.1s, tick = 60/120/4 = 0.125s, 2 ticks = 0.25s in.
    let sample_rate = config.sample_rate as f32;
    let start = (0.25 * sample_rate) as usize;
    let end = ((0.25 + 0.2) * sample_rate) as usize;
    assert!(
        average_abs(&buffer, start, end) > 0.1,
        "arpeggiated event should stay audible well past the first two ticks"
    );
}

/// S6 - A `cut(2)` effect silences the voice 2 ticks (0.25 s) into the
/// event, with a 5 ms linear fade, leaving it silent thereafter.
#[test]
fn s6_cut_effect_silences_after_the_requested_ticks() {
    let song = resolved("inst lead type=pulse1\npat p = C4<cut:2>:8\nchannel 1 => inst lead pat p\n");
    let config = RenderConfig { sample_rate: 8_000, ..RenderConfig::default() };
    let buffer = render(&song, &config);

    let sample_rate = config.sample_rate as f32;
    // preroll 0.1s, tick = 0.125s, cut fires at 0.1 + 0.25 = 0.35s and
    // completes its 5ms fade at 0.355s.
    let before_start = (0.2 * sample_rate) as usize;
    let before_end = (0.34 * sample_rate) as usize;
    let after_start = (0.355 * sample_rate) as usize;
    let after_end = (1.0 * sample_rate) as usize;

    assert!(
        average_abs(&buffer, before_start, before_end) > 0.1,
        "event should be audible before the cut point"
    );
    assert!(
        average_abs(&buffer, after_start, after_end) < 0.01,
        "event should be silent after the cut point"
    );
}

/// Testable property 7 (`spec.md` §8): an effect naming an unknown effect
/// name is a silent no-op rather than an error, and the note still renders.
#[test]
fn unknown_inline_effect_name_is_a_no_op_not_an_error() {
    let song = resolved("inst lead type=pulse1\npat p = C4<madeUpEffect:1,2,3>\nchannel 1 => inst lead pat p\n");
    let config = RenderConfig::default();
    let buffer = render(&song, &config);
    assert!(buffer.iter().any(|s| s.abs() > 0.0));
}
