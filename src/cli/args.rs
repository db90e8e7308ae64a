use crate::config::types::{ConfigOverrides, CountingMode};
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "retrover", version)]
#[command(
    about = "Watch serial ports for rare events and log the traffic around them",
    long_about = "Watch serial ports for rare events and log the traffic around them.\n\n\
                  Press Ctrl+C once to see a summary of what's been seen so far, and again to quit."
)]
pub struct Cli {
    /// Serial ports to watch
    #[arg(value_name = "PORT")]
    pub ports: Vec<String>,

    /// Baud rate for all serial ports [default: 9600]
    #[arg(long)]
    pub baud: Option<u32>,

    /// File to log events to [default: retrover.log]
    #[arg(long, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Log this many lines before and after each event [default: 10]
    #[arg(long, value_name = "N")]
    pub window: Option<usize>,

    /// Log this many seconds before and after each event
    #[arg(long = "windowSecs", value_name = "S")]
    pub window_secs: Option<f64>,

    /// Count one event for each run of consecutive matching lines
    #[arg(long, overrides_with_all = ["delta", "single", "nopulse"])]
    pub eventrun: bool,

    /// Count an event when a match hits a different pattern than the previous match
    #[arg(long, overrides_with_all = ["eventrun", "single", "nopulse"])]
    pub delta: bool,

    /// Count every matching line as an event
    #[arg(long, overrides_with_all = ["eventrun", "delta", "nopulse"])]
    pub single: bool,

    /// Count an event when no line matches for longer than the window
    #[arg(long, overrides_with_all = ["eventrun", "delta", "single"])]
    pub nopulse: bool,

    /// Patterns; a line matching any of them, anywhere, is a match
    #[arg(long, value_name = "PATTERN", num_args = 1.., action = ArgAction::Append)]
    pub regex: Vec<String>,

    /// Treat patterns as literal text rather than regular expressions
    #[arg(long)]
    pub literal: bool,

    /// Ignore upper/lower case when matching
    #[arg(long)]
    pub ignorecase: bool,

    /// Log times in UTC instead of local time
    #[arg(long)]
    pub utc: bool,

    /// YAML config file [default: ~/.config/retrover/config.yml if present]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// List the serial ports on this system and exit
    #[arg(long = "list-ports")]
    pub list_ports: bool,
}

impl Cli {
    /// The selected counting mode; the flags override each other so at most
    /// one is set.
    pub fn mode(&self) -> Option<CountingMode> {
        if self.eventrun {
            Some(CountingMode::EventRun)
        } else if self.delta {
            Some(CountingMode::Delta)
        } else if self.single {
            Some(CountingMode::Single)
        } else if self.nopulse {
            Some(CountingMode::NoPulse)
        } else {
            None
        }
    }

    pub fn into_overrides(self) -> ConfigOverrides {
        let mode = self.mode();
        ConfigOverrides {
            ports: self.ports,
            baud: self.baud,
            log: self.log,
            window: self.window,
            window_secs: self.window_secs,
            mode,
            patterns: self.regex,
            literal: self.literal,
            ignore_case: self.ignorecase,
            utc: self.utc,
        }
    }
}
