//! The `beatbax` command-line interface (`spec.md` §6): `play`, `verify`,
//! and `export` wired to concrete implementations of every other crate in
//! the workspace.

mod commands;
mod pipeline;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::export::ExportFormat;

#[derive(Parser)]
#[command(name = "beatbax")]
#[command(about = "Game Boy-style chiptune live-coding compiler and playback engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parses, resolves, and plays a song.
    Play {
        /// Path to a `.bbx` song file.
        file: PathBuf,
    },
    /// Parses and validates a song, exiting 0 on success and 2 on failure.
    Verify {
        /// Path to a `.bbx` song file.
        file: PathBuf,
    },
    /// Exports a song to one of the documented formats.
    Export {
        /// Which format to write.
        #[arg(value_enum)]
        format: ExportFormat,
        /// Path to a `.bbx` song file.
        file: PathBuf,
        /// Output path; defaults to the input file with the format's
        /// extension.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::Play { file } => {
            commands::play::run(&file)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify { file } => Ok(commands::verify::run(&file)),
        Command::Export { format, file, output } => {
            commands::export::run(format, &file, output)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
