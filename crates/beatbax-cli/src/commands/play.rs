//! `beatbax play <file>` (`spec.md` §6): parses, resolves, and plays.
//!
//! With no audio-output crate in the dependency stack (no `cpal`/`rodio`),
//! `play` drives the real [`Orchestrator`] against a wall clock and renders
//! its progress as a terminal visualizer rather than producing actual
//! sound. `beatbax export wav` is the surface that produces real PCM
//! output.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Result;
use beatbax_common::graph::Capability;
use beatbax_playback::{Orchestrator, PlaybackObserver};
use beatbax_scheduler::DEFAULT_INTERVAL_SECONDS;

use crate::pipeline::load_song;

struct TerminalObserver {
    complete: Rc<Cell<bool>>,
}

impl PlaybackObserver for TerminalObserver {
    fn on_schedule(&mut self, channel_id: u32, instrument: &str, token: &str, time: f64, duration: f64) {
        println!("[{:>7.3}s] ch{channel_id} {instrument:<12} {token:<4} ({duration:.3}s)", time);
    }

    fn on_complete(&mut self) {
        self.complete.set(true);
    }

    fn on_repeat(&mut self) {
        println!("-- repeat --");
    }
}

/// Runs the `play` subcommand.
pub fn run(file: &Path) -> Result<()> {
    let loaded = load_song(file)?;
    for diagnostic in &loaded.diagnostics {
        eprintln!("{}", diagnostic.render());
    }

    println!("playing {} ({} channel(s), {:.1} bpm)", file.display(), loaded.ism.channels.len(), loaded.ism.bpm);

    let repeat = loaded.ism.play.repeat;
    let start = Instant::now();
    let clock: beatbax_playback::Clock = Rc::new(move || start.elapsed().as_secs_f64());

    let mut orchestrator = Orchestrator::new(loaded.ism, clock, Capability::default());
    let complete = Rc::new(Cell::new(false));
    orchestrator.set_observer(Box::new(TerminalObserver { complete: complete.clone() }));
    orchestrator.play();

    let interval = Duration::from_secs_f64(DEFAULT_INTERVAL_SECONDS);
    while !complete.get() {
        orchestrator.tick();
        std::thread::sleep(interval);
    }

    if repeat {
        println!("song loops (play.repeat) — stopping after one full pass");
    }
    orchestrator.stop();
    Ok(())
}
