use super::pattern::MatchResult;
use crate::config::types::{CountingMode, Radius};
use crate::source::reader::LineRecord;
use chrono::{DateTime, Utc};

/// What the counter decided for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Detection {
    /// Ordinal of the event this line fired, if any
    pub fired: Option<u64>,
    /// Line belongs to a silence period (NoPulse mode only)
    pub pulse_gap: bool,
}

#[derive(Debug, Clone)]
enum CounterState {
    Single,
    Delta { last_pattern: Option<usize> },
    EventRun { in_run: bool },
    NoPulse(Silence),
}

/// Tracks how long the stream has gone without a match.
#[derive(Debug, Clone)]
struct Silence {
    radius: Radius,
    lines: usize,
    since: Option<DateTime<Utc>>,
}

impl Silence {
    fn reset(&mut self, at: DateTime<Utc>) {
        self.lines = 0;
        self.since = Some(at);
    }

    /// Count one silent line; true when the silence has outlasted the radius.
    fn extend(&mut self, at: DateTime<Utc>) -> bool {
        let since = *self.since.get_or_insert(at);
        self.lines += 1;

        match self.radius {
            Radius::Lines(radius) => self.lines > radius,
            Radius::Duration(radius) => (at - since)
                .to_std()
                .map(|elapsed| elapsed > radius)
                .unwrap_or(false),
        }
    }

    /// When the current silence becomes an event. Only time radii have one.
    fn deadline(&self) -> Option<DateTime<Utc>> {
        match self.radius {
            Radius::Duration(radius) => {
                let since = self.since?;
                chrono::Duration::from_std(radius).ok().map(|r| since + r)
            }
            Radius::Lines(_) => None,
        }
    }
}

/// Converts per-line match results into discrete events.
///
/// Owns the event ordinal: ordinals start at 1 and are never reused.
#[derive(Debug, Clone)]
pub struct EventCounter {
    state: CounterState,
    events: u64,
}

impl EventCounter {
    pub fn new(mode: CountingMode, radius: Radius) -> Self {
        let state = match mode {
            CountingMode::Single => CounterState::Single,
            CountingMode::Delta => CounterState::Delta { last_pattern: None },
            CountingMode::EventRun => CounterState::EventRun { in_run: false },
            CountingMode::NoPulse => CounterState::NoPulse(Silence {
                radius,
                lines: 0,
                since: None,
            }),
        };

        Self {
            state,
            events: 0,
        }
    }

    /// Total events fired so far
    pub fn events(&self) -> u64 {
        self.events
    }

    /// Start the silence clock before any line has arrived (NoPulse only).
    pub fn begin(&mut self, at: DateTime<Utc>) {
        if let CounterState::NoPulse(silence) = &mut self.state {
            silence.since.get_or_insert(at);
        }
    }

    /// The instant the current silence turns into an event, when silence is
    /// measured in time. `None` for every other mode and for line radii.
    pub fn silence_deadline(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            CounterState::NoPulse(silence) => silence.deadline(),
            _ => None,
        }
    }

    /// Fire for silence that has run out with no line arriving to carry the
    /// event, as with a stalled or disconnected port.
    pub fn observe_silence(&mut self, now: DateTime<Utc>) -> Option<u64> {
        let CounterState::NoPulse(silence) = &mut self.state else {
            return None;
        };
        let deadline = silence.deadline()?;
        if now < deadline {
            return None;
        }
        silence.reset(now);

        self.events += 1;
        Some(self.events)
    }

    /// Evaluate one line. Must be called in arrival order.
    pub fn observe(&mut self, record: &LineRecord, result: MatchResult) -> Detection {
        let mut pulse_gap = false;

        let fires = match &mut self.state {
            CounterState::Single => result.matched,
            CounterState::Delta { last_pattern } => {
                if result.matched {
                    let changed = *last_pattern != result.pattern;
                    *last_pattern = result.pattern;
                    changed
                } else {
                    false
                }
            }
            CounterState::EventRun { in_run } => {
                let starts_run = result.matched && !*in_run;
                *in_run = result.matched;
                starts_run
            }
            CounterState::NoPulse(silence) => {
                if result.matched {
                    silence.reset(record.timestamp);
                    false
                } else {
                    pulse_gap = true;
                    let fires = silence.extend(record.timestamp);
                    if fires {
                        silence.reset(record.timestamp);
                    }
                    fires
                }
            }
        };

        let fired = fires.then(|| {
            self.events += 1;
            self.events
        });

        Detection { fired, pulse_gap }
    }
}
