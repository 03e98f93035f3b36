//! `beatbax export <json|midi|uge|wav> <file> [-o <out>]` (`spec.md` §6).
//!
//! JSON and WAV are implemented in full here. MIDI and UGE are documented
//! as "contracts only, implementations external" (`spec.md` §6) — this
//! crate reports that plainly rather than guessing at a vendor-specific
//! binary format it has no specification for.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use beatbax_playback::{render, RenderConfig};
use clap::ValueEnum;
use serde_json::json;

use crate::pipeline::load_song;

/// Which export format to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// The ISM as a stable `{song}` JSON object.
    Json,
    /// Four-track MIDI preserving the tick grid (external contract).
    Midi,
    /// hUGETracker v6 binary (external contract).
    Uge,
    /// PCM rendering of the ISM through the offline renderer.
    Wav,
}

/// Runs the `export` subcommand.
pub fn run(format: ExportFormat, file: &Path, output: Option<PathBuf>) -> Result<()> {
    let loaded = load_song(file)?;
    let out_path = output.unwrap_or_else(|| default_output_path(file, format));

    match format {
        ExportFormat::Json => export_json(&loaded.ism, &out_path)?,
        ExportFormat::Wav => export_wav(&loaded.ism, &out_path)?,
        ExportFormat::Midi | ExportFormat::Uge => {
            bail!(
                "{} export is a contract-only surface (spec.md §6): the binary writer is an external collaborator, not implemented by beatbax-cli",
                format_name(format)
            );
        }
    }

    for diagnostic in &loaded.diagnostics {
        eprintln!("{}", diagnostic.render());
    }

    println!("wrote {}", out_path.display());
    Ok(())
}

fn format_name(format: ExportFormat) -> &'static str {
    match format {
        ExportFormat::Json => "json",
        ExportFormat::Midi => "midi",
        ExportFormat::Uge => "uge",
        ExportFormat::Wav => "wav",
    }
}

fn default_output_path(file: &Path, format: ExportFormat) -> PathBuf {
    let extension = match format {
        ExportFormat::Json => "json",
        ExportFormat::Midi => "mid",
        ExportFormat::Uge => "uge",
        ExportFormat::Wav => "wav",
    };
    file.with_extension(extension)
}

fn export_json(ism: &beatbax_resolver::ResolvedSong, out_path: &Path) -> Result<()> {
    let document = json!({ "song": ism });
    let text = serde_json::to_string_pretty(&document).context("serializing ISM to JSON")?;
    std::fs::write(out_path, text).with_context(|| format!("writing {}", out_path.display()))
}

fn export_wav(ism: &beatbax_resolver::ResolvedSong, out_path: &Path) -> Result<()> {
    let config = RenderConfig::default();
    let samples = render(ism, &config);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(out_path, spec).with_context(|| format!("creating {}", out_path.display()))?;
    for sample in samples {
        let clamped = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(clamped).context("writing WAV sample")?;
    }
    writer.finalize().context("finalizing WAV file")
}
