use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BAUD: u32 = 9600;
pub const DEFAULT_LOG_FILE: &str = "retrover.log";
pub const DEFAULT_WINDOW_LINES: usize = 10;
pub const DEFAULT_BUFFER_LIMIT: usize = 1000;

/// Fully resolved and validated run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub ports: Vec<String>,
    pub baud: u32,
    pub log: PathBuf,
    pub radius: Radius,
    pub mode: CountingMode,
    pub patterns: PatternConfig,
    pub utc: bool,
    pub buffer_limit: usize,
}

/// How a line becomes an event. Exactly one is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountingMode {
    /// Every matching line is an event
    Single,
    /// A match is an event when its pattern differs from the previous match's
    Delta,
    /// A run of consecutive matching lines is one event
    EventRun,
    /// Silence (no match) for longer than the radius is an event
    NoPulse,
}

impl fmt::Display for CountingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CountingMode::Single => "single",
            CountingMode::Delta => "delta",
            CountingMode::EventRun => "eventrun",
            CountingMode::NoPulse => "nopulse",
        };
        f.write_str(name)
    }
}

/// Amount of context kept around an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radius {
    Lines(usize),
    Duration(Duration),
}

impl Default for Radius {
    fn default() -> Self {
        Radius::Lines(DEFAULT_WINDOW_LINES)
    }
}

impl fmt::Display for Radius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Radius::Lines(n) => write!(f, "{} line(s)", n),
            Radius::Duration(d) => write!(f, "{:.3}s", d.as_secs_f64()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternConfig {
    pub patterns: Vec<String>,
    /// Treat patterns as literal substrings instead of regular expressions
    pub literal: bool,
    pub ignore_case: bool,
}

/// On-disk YAML configuration. Every field is optional; command-line flags
/// override whatever is set here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub ports: Vec<String>,
    pub baud: Option<u32>,
    pub log: Option<PathBuf>,
    pub window_lines: Option<usize>,
    #[serde(default, with = "humantime_serde")]
    pub window_duration: Option<Duration>,
    pub mode: Option<CountingMode>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub literal: bool,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default)]
    pub utc: bool,
    pub buffer_limit: Option<usize>,
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub ports: Vec<String>,
    pub baud: Option<u32>,
    pub log: Option<PathBuf>,
    pub window: Option<usize>,
    pub window_secs: Option<f64>,
    pub mode: Option<CountingMode>,
    pub patterns: Vec<String>,
    pub literal: bool,
    pub ignore_case: bool,
    pub utc: bool,
}
