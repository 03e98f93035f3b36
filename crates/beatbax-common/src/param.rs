//! A minimal Web-Audio-`AudioParam`-style automation primitive.
//!
//! `spec.md` repeatedly describes effects as scheduling ramps on a node's
//! `AudioParam` (gain, frequency, playback rate, pan) rather than computing
//! samples directly — e.g. 4.D `vib`: "LFO modulates oscillator frequency",
//! `port`: "exponential (fallback linear) ramp ... from previous channel
//! frequency to current target". [`Param`] is the Rust stand-in for that
//! automation timeline: a base value plus an ordered list of scheduled
//! ramps, sampled at render time by [`Param::value_at`].

/// How a scheduled [`ParamEvent`] reaches its value from the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampKind {
    /// Value jumps to the target at the event's time and holds.
    Set,
    /// Value ramps linearly from the previous value to the target.
    Linear,
    /// Value ramps exponentially; falls back to linear if either endpoint is
    /// `<= 0` (exponential ramps are undefined through zero), matching the
    /// documented fallback for `port` in `spec.md` §4.D.
    Exponential,
}

#[derive(Debug, Clone, Copy)]
struct ParamEvent {
    time: f64,
    value: f32,
    kind: RampKind,
}

/// An automatable scalar value, sampled over time.
#[derive(Debug, Clone)]
pub struct Param {
    base_value: f32,
    events: Vec<ParamEvent>,
}

impl Param {
    /// Creates a param with a constant initial value and no scheduled events.
    pub fn new(initial_value: f32) -> Self {
        Self {
            base_value: initial_value,
            events: Vec::new(),
        }
    }

    /// The value before any scheduled automation.
    pub fn base_value(&self) -> f32 {
        self.base_value
    }

    /// Immediately sets the value at `time`, holding until the next event.
    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(ParamEvent { time, value, kind: RampKind::Set });
    }

    /// Schedules a linear ramp ending at `value` at `time`.
    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(ParamEvent { time, value, kind: RampKind::Linear });
    }

    /// Schedules an exponential ramp ending at `value` at `time`.
    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(ParamEvent { time, value, kind: RampKind::Exponential });
    }

    fn insert(&mut self, event: ParamEvent) {
        let idx = self
            .events
            .partition_point(|e| e.time <= event.time);
        self.events.insert(idx, event);
    }

    /// Cancels every scheduled event at or after `time` and pins the value
    /// at `time` to whatever it would have been, so continuity is preserved.
    ///
    /// Used by handlers that replace rather than stack existing automation
    /// (`spec.md` §9 Open Question (i): the `volSlide` handler "cancels
    /// existing gain automation").
    pub fn cancel_and_hold_at_time(&mut self, time: f64) {
        let held = self.value_at(time);
        self.events.retain(|e| e.time < time);
        self.events.push(ParamEvent {
            time,
            value: held,
            kind: RampKind::Set,
        });
    }

    /// Samples the automation timeline at `time`.
    pub fn value_at(&self, time: f64) -> f32 {
        if self.events.is_empty() {
            return self.base_value;
        }

        let mut prev_time = f64::NEG_INFINITY;
        let mut prev_value = self.base_value;
        let mut idx = 0;
        while idx < self.events.len() && self.events[idx].time <= time {
            prev_time = self.events[idx].time;
            prev_value = self.events[idx].value;
            idx += 1;
        }

        let Some(next) = self.events.get(idx) else {
            return prev_value;
        };

        let span = next.time - prev_time;
        let ratio = if span > 0.0 {
            ((time - prev_time) / span).clamp(0.0, 1.0) as f32
        } else {
            1.0
        };

        match next.kind {
            RampKind::Set => prev_value,
            RampKind::Linear => prev_value + (next.value - prev_value) * ratio,
            RampKind::Exponential => {
                if prev_value <= 0.0 || next.value <= 0.0 {
                    prev_value + (next.value - prev_value) * ratio
                } else {
                    prev_value * (next.value / prev_value).powf(ratio)
                }
            }
        }
    }
}
