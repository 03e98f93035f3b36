//! The playback orchestrator: `spec.md` §4.G.
//!
//! Schedules an entire [`ResolvedSong`] through [`beatbax_scheduler`],
//! constructing voices lazily (via [`beatbax_synth::build_voice`]) and
//! applying effects (via [`beatbax_effects`]) exactly when each event's
//! scheduled callback fires — matching the Web-Audio-style "schedule now,
//! synthesize later" model the spec describes. The scheduler, voice table,
//! and effect state all live behind one `Rc<RefCell<_>>` (`spec.md` §5: "one
//! owning thread... no locks required"), shared between the public
//! [`Orchestrator`] handle and the closures it hands to the scheduler.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use beatbax_common::graph::{Capability, VoiceGraph};
use beatbax_effects::{default_registry, ChannelEffectState, EffectContext, EffectRegistry};
use beatbax_resolver::{ChannelEvent, ChannelEventKind, ResolvedSong};
use beatbax_scheduler::Scheduler;
use beatbax_synth::{build_voice, VoiceKind};

use crate::freq::base_frequency;
use crate::observer::{NullObserver, PlaybackObserver};

/// A shared, cheaply-clonable wall/virtual clock: `() -> seconds`.
pub type Clock = Rc<dyn Fn() -> f64>;

/// One voice currently tracked as sounding, kept in the active voice table
/// so `stop()`/`stop_channel()` can account for it (`spec.md` §4.G: "track
/// the voice in an active voice table keyed by channel ID").
pub struct ActiveVoice {
    /// Monotonic id, used to remove this exact entry once it finishes.
    pub id: u64,
    /// The instrument this voice was built from.
    pub instrument: String,
    /// Which generator it renders through.
    pub kind: VoiceKind,
    /// Its node graph, carrying every automation ramp scheduled for it.
    pub graph: VoiceGraph,
    /// Scheduled start time, in seconds.
    pub start_time: f64,
    /// Duration, in seconds.
    pub duration: f64,
}

struct Shared {
    song: ResolvedSong,
    registry: EffectRegistry,
    channel_state: HashMap<u32, ChannelEffectState>,
    active: HashMap<u32, Vec<ActiveVoice>>,
    muted: HashSet<u32>,
    stopped_channels: HashSet<u32>,
    solo: Option<u32>,
    capability: Capability,
    observer: Box<dyn PlaybackObserver>,
    next_voice_id: u64,
    remaining: usize,
    completed: bool,
}

/// Drives an entire [`ResolvedSong`] through the scheduler/synth/effect
/// pipeline. Owns the [`Scheduler`] directly; everything the scheduler's
/// closures need to mutate lives behind the shared `Rc<RefCell<_>>`.
pub struct Orchestrator {
    shared: Rc<RefCell<Shared>>,
    scheduler: Scheduler,
    clock: Clock,
    last_start_time: f64,
    song_length: f64,
}

impl Orchestrator {
    /// Builds an orchestrator for `song`, driven by `clock`. The same clock
    /// value should be used to drive the caller's host loop (interval- or
    /// frame-driven) that calls [`Orchestrator::tick`].
    pub fn new(song: ResolvedSong, clock: Clock, capability: Capability) -> Self {
        let clock_for_scheduler = clock.clone();
        let scheduler = Scheduler::new(move || clock_for_scheduler());
        let shared = Rc::new(RefCell::new(Shared {
            song,
            registry: default_registry(),
            channel_state: HashMap::new(),
            active: HashMap::new(),
            muted: HashSet::new(),
            stopped_channels: HashSet::new(),
            solo: None,
            capability,
            observer: Box::new(NullObserver),
            next_voice_id: 0,
            remaining: 0,
            completed: false,
        }));
        Self { shared, scheduler, clock, last_start_time: 0.0, song_length: 0.0 }
    }

    /// Installs the observer that receives `onSchedule`/`onPositionChange`/
    /// `onComplete`/`onRepeat` callbacks.
    pub fn set_observer(&mut self, observer: Box<dyn PlaybackObserver>) {
        self.shared.borrow_mut().observer = observer;
    }

    /// Mutes or unmutes `channel_id`. A muted channel's scheduled callback
    /// returns immediately without building a voice (`spec.md` §4.G).
    pub fn set_muted(&mut self, channel_id: u32, muted: bool) {
        let mut shared = self.shared.borrow_mut();
        if muted {
            shared.muted.insert(channel_id);
        } else {
            shared.muted.remove(&channel_id);
        }
    }

    /// Solos `channel_id` (every other channel is treated as muted), or
    /// clears solo mode with `None`.
    pub fn set_solo(&mut self, channel_id: Option<u32>) {
        self.shared.borrow_mut().solo = channel_id;
    }

    /// How many voices are currently tracked as active for `channel_id`.
    pub fn active_voice_count(&self, channel_id: u32) -> usize {
        self.shared.borrow().active.get(&channel_id).map(Vec::len).unwrap_or(0)
    }

    /// Whether the underlying scheduler is currently dispatching.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Schedules every channel's events starting at `now() + 0.1` (the
    /// documented pre-roll) and starts the scheduler. Call [`Orchestrator::tick`]
    /// afterwards, on the same cadence used to drive `clock`, to dispatch.
    pub fn play(&mut self) {
        let start_time = (self.clock)() + 0.1;
        self.schedule_from(start_time);
        self.scheduler.start();
    }

    fn schedule_from(&mut self, start_time: f64) {
        self.song_length = schedule_song(&self.shared, &mut self.scheduler, start_time);
        self.last_start_time = start_time;
    }

    /// Dispatches everything due within the scheduler's lookahead window,
    /// and handles `play.repeat` re-scheduling once the song completes.
    pub fn tick(&mut self) {
        self.scheduler.tick();

        let should_repeat = {
            let mut shared = self.shared.borrow_mut();
            if shared.completed && shared.song.play.repeat {
                shared.completed = false;
                true
            } else {
                false
            }
        };

        if should_repeat {
            self.shared.borrow_mut().observer.on_repeat();
            let next_start = self.last_start_time + self.song_length;
            self.schedule_from(next_start);
        }
    }

    /// Stops playback: clears the scheduler queue, the active voice table,
    /// and every channel's effect state (`spec.md` §4.G / testable
    /// property 8: "After `stop()`, the per-channel last-frequency map is
    /// empty").
    pub fn stop(&mut self) {
        self.scheduler.stop();
        let mut shared = self.shared.borrow_mut();
        shared.active.clear();
        for state in shared.channel_state.values_mut() {
            state.reset();
        }
        shared.channel_state.clear();
        shared.stopped_channels.clear();
        shared.remaining = 0;
        shared.completed = false;
    }

    /// Stops just `channel_id`: its active voices are dropped and its
    /// effect state is reset, and any still-pending callback for it
    /// becomes a no-op.
    pub fn stop_channel(&mut self, channel_id: u32) {
        let mut shared = self.shared.borrow_mut();
        shared.stopped_channels.insert(channel_id);
        shared.active.remove(&channel_id);
        if let Some(state) = shared.channel_state.get_mut(&channel_id) {
            state.reset();
        }
    }

    /// Pauses dispatch without dropping pending events; [`Orchestrator::resume`]
    /// picks up exactly where playback left off.
    pub fn pause(&mut self) {
        self.scheduler.pause();
    }

    /// Resumes dispatch after [`Orchestrator::pause`].
    pub fn resume(&mut self) {
        self.scheduler.start();
    }
}

/// Schedules every channel of `shared`'s song starting at `start_time`,
/// returning the song's total duration in seconds (the time from
/// `start_time` to the last channel's final event end).
fn schedule_song(shared: &Rc<RefCell<Shared>>, scheduler: &mut Scheduler, start_time: f64) -> f64 {
    let (bpm, channels) = {
        let song = &shared.borrow().song;
        (song.bpm, song.channels.clone())
    };

    let total_sounding: usize = channels
        .iter()
        .flat_map(|c| &c.events)
        .filter(|e| !matches!(e.kind, ChannelEventKind::Rest))
        .count();

    {
        let mut shared_mut = shared.borrow_mut();
        shared_mut.remaining = total_sounding;
        shared_mut.completed = total_sounding == 0;
    }
    if total_sounding == 0 {
        shared.borrow_mut().observer.on_complete();
        return 0.0;
    }

    let mut max_end = start_time;
    for channel in &channels {
        let channel_id = channel.id;
        let tick_seconds = 60.0 / (bpm * channel.speed_multiplier) / 4.0;
        let total_events = channel.events.len();
        let mut t = start_time;
        for (index, event) in channel.events.iter().enumerate() {
            let duration = event.duration_ticks as f64 * tick_seconds;
            if !matches!(event.kind, ChannelEventKind::Rest) {
                let shared_for_event = shared.clone();
                let event_for_closure = event.clone();
                let event_start = t;
                scheduler.schedule(event_start, move || {
                    fire_event(
                        &shared_for_event,
                        channel_id,
                        index,
                        total_events,
                        &event_for_closure,
                        event_start,
                        duration,
                        tick_seconds,
                    );
                });
            }
            t += duration;
        }
        max_end = max_end.max(t);
    }
    max_end - start_time
}

/// A voice's tail past its nominal duration before it's dropped from the
/// active table, matching `beatbax-synth`'s documented `start + dur + ε`
/// voice lifetime.
const VOICE_TAIL_EPSILON_SECONDS: f64 = 0.05;

fn fire_event(
    shared: &Rc<RefCell<Shared>>,
    channel_id: u32,
    event_index: usize,
    total_events: usize,
    event: &ChannelEvent,
    start_time: f64,
    duration: f64,
    tick_seconds: f64,
) {
    let mut shared_ref = shared.borrow_mut();

    let skip = shared_ref.stopped_channels.contains(&channel_id)
        || shared_ref.muted.contains(&channel_id)
        || matches!(shared_ref.solo, Some(solo_id) if solo_id != channel_id);

    if !skip {
        let instrument = shared_ref.song.instruments.get(&event.instrument).cloned();
        if let Some(instrument) = instrument {
            let capability = shared_ref.capability;
            let base_freq = base_frequency(&event.kind);
            let (mut graph, kind) = build_voice(&instrument, base_freq, capability, start_time, duration);

            {
                let Shared { registry, channel_state, .. } = &mut *shared_ref;
                let state = channel_state.entry(channel_id).or_default();
                for inline in &event.effects {
                    let mut ctx = EffectContext {
                        voice: &mut graph,
                        capability,
                        start_time,
                        duration,
                        tick_seconds,
                        base_freq,
                        channel_state: state,
                    };
                    registry.apply(&inline.name, &mut ctx, &inline.params);
                }
            }

            let voice_id = shared_ref.next_voice_id;
            shared_ref.next_voice_id += 1;
            let voices = shared_ref.active.entry(channel_id).or_default();
            // Voices past their tail are never explicitly removed by a
            // scheduled callback (the scheduler has no handle available
            // from inside an already-firing one); instead each new event
            // sweeps its own channel's table first, matching `spec.md`
            // §4.F's "destroys itself at `start + dur + ε`" lifetime.
            voices.retain(|v| v.start_time + v.duration + VOICE_TAIL_EPSILON_SECONDS > start_time);
            voices.push(ActiveVoice {
                id: voice_id,
                instrument: event.instrument.clone(),
                kind,
                graph,
                start_time,
                duration,
            });
        }

        let token = match &event.kind {
            ChannelEventKind::Note { note, .. } => note.clone(),
            ChannelEventKind::NamedHit { name } => name.clone(),
            ChannelEventKind::Rest => String::new(),
        };
        let instrument_name = event.instrument.clone();
        shared_ref.observer.on_schedule(channel_id, &instrument_name, &token, start_time, duration);
        shared_ref.observer.on_position_change(channel_id, event_index, total_events);
    }

    shared_ref.remaining = shared_ref.remaining.saturating_sub(1);
    if shared_ref.remaining == 0 {
        shared_ref.completed = true;
        shared_ref.observer.on_complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatbax_parser::builder::{parse_source, ParseMode};
    use beatbax_resolver::resolve;
    use std::cell::RefCell as StdRefCell;

    fn resolved(source: &str) -> ResolvedSong {
        let out = parse_source(source, ParseMode::Song).unwrap();
        resolve(&out.song).0
    }

    fn fixed_clock(t: f64) -> Clock {
        Rc::new(move || t)
    }

    #[derive(Default)]
    struct RecordingObserver {
        scheduled: Rc<StdRefCell<Vec<(u32, String, String, f64, f64)>>>,
        completed: Rc<StdRefCell<bool>>,
    }

    impl PlaybackObserver for RecordingObserver {
        fn on_schedule(&mut self, channel_id: u32, instrument: &str, token: &str, time: f64, duration: f64) {
            self.scheduled.borrow_mut().push((channel_id, instrument.to_string(), token.to_string(), time, duration));
        }
        fn on_complete(&mut self) {
            *self.completed.borrow_mut() = true;
        }
    }

    #[test]
    fn play_schedules_every_sounding_event_and_reports_completion() {
        let song = resolved("inst lead type=pulse1\npat p = C4 D4 . E4\nchannel 1 => inst lead pat p\n");
        let mut orchestrator = Orchestrator::new(song, fixed_clock(0.0), Capability::default());
        let scheduled = Rc::new(StdRefCell::new(Vec::new()));
        let completed = Rc::new(StdRefCell::new(false));
        orchestrator.set_observer(Box::new(RecordingObserver { scheduled: scheduled.clone(), completed: completed.clone() }));
        orchestrator.play();
        orchestrator.tick();
        assert_eq!(scheduled.borrow().len(), 3);
        assert!(*completed.borrow());
    }

    #[test]
    fn muted_channel_builds_no_voices() {
        let song = resolved("inst lead type=pulse1\npat p = C4 D4\nchannel 1 => inst lead pat p\n");
        let mut orchestrator = Orchestrator::new(song, fixed_clock(0.0), Capability::default());
        orchestrator.set_muted(1, true);
        orchestrator.play();
        orchestrator.tick();
        assert_eq!(orchestrator.active_voice_count(1), 0);
    }

    #[test]
    fn solo_excludes_every_other_channel() {
        let song = resolved(
            "inst lead type=pulse1\npat p = C4\nchannel 1 => inst lead pat p\nchannel 2 => inst lead pat p\n",
        );
        let mut orchestrator = Orchestrator::new(song, fixed_clock(0.0), Capability::default());
        orchestrator.set_solo(Some(1));
        orchestrator.play();
        orchestrator.tick();
        assert!(orchestrator.active_voice_count(1) > 0);
        assert_eq!(orchestrator.active_voice_count(2), 0);
    }

    #[test]
    fn stop_clears_active_voices_and_effect_state() {
        let song = resolved("inst lead type=pulse1\npat p = C4<port:0.1> D4\nchannel 1 => inst lead pat p\n");
        let mut orchestrator = Orchestrator::new(song, fixed_clock(0.0), Capability::default());
        orchestrator.play();
        orchestrator.tick();
        orchestrator.stop();
        assert_eq!(orchestrator.active_voice_count(1), 0);
        assert!(!orchestrator.is_running());
    }

    #[test]
    fn pause_then_resume_keeps_pending_events() {
        let song = resolved("inst lead type=pulse1\npat p = C4\nchannel 1 => inst lead pat p\n");
        let mut orchestrator = Orchestrator::new(song, fixed_clock(100.0), Capability::default());
        orchestrator.play();
        orchestrator.pause();
        assert!(!orchestrator.is_running());
        orchestrator.resume();
        assert!(orchestrator.is_running());
    }
}
