use crate::config::types::Config;
use crate::detect::{EventCounter, PatternError, PatternMatcher};
use crate::pipeline::stats::RunStats;
use crate::sequencer::SourceEvent;
use crate::sink::{Formatter, LineSink};
use crate::source::reader::LineRecord;
use crate::window::{TaggedLine, WindowBuffer};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Requests from the signal handler to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Print the running summary and keep going
    Summary,
    /// Print the final summary and stop
    Shutdown,
}

/// Maps the tokio clock onto line timestamps, anchored at the latest line,
/// so silence can be measured while nothing arrives.
#[derive(Debug, Clone, Copy)]
struct StreamClock {
    stamp: DateTime<Utc>,
    instant: Instant,
}

impl StreamClock {
    fn new(stamp: DateTime<Utc>) -> Self {
        Self {
            stamp,
            instant: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.instant.elapsed())
            .map(|elapsed| self.stamp + elapsed)
            .unwrap_or(self.stamp)
    }

    /// The tokio instant at which this clock reads `at`
    fn instant_at(&self, at: DateTime<Utc>) -> Instant {
        match (at - self.stamp).to_std() {
            Ok(offset) => self.instant + offset,
            Err(_) => self.instant,
        }
    }
}

/// The single consumer of the merged stream.
///
/// Owns every piece of mutable detection state: the counter, the window and
/// the run statistics. Nothing else touches them, so no locking is needed.
pub struct Processor {
    matcher: PatternMatcher,
    counter: EventCounter,
    window: WindowBuffer,
    formatter: Formatter,
    stats: RunStats,
    clock: StreamClock,
    description: String,
    log: Box<dyn LineSink>,
    console: Box<dyn LineSink>,
}

impl Processor {
    pub fn new(
        config: &Config,
        log: Box<dyn LineSink>,
        console: Box<dyn LineSink>,
    ) -> Result<Self, PatternError> {
        let matcher = PatternMatcher::new(&config.patterns)?;

        Ok(Self {
            matcher,
            counter: EventCounter::new(config.mode, config.radius),
            window: WindowBuffer::new(config.radius),
            formatter: Formatter::new(config.ports.len(), config.utc),
            stats: RunStats::new(&config.ports, Utc::now()),
            clock: StreamClock::new(Utc::now()),
            description: format!(
                "Searching for patterns: {:?}, counting by {}, window {}",
                config.patterns.patterns, config.mode, config.radius
            ),
            log,
            console,
        })
    }

    /// Highlight event banners on the console
    pub fn with_styled_console(mut self, styled: bool) -> Self {
        self.formatter = self.formatter.styled(styled);
        self
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Write the run preamble to both sinks and start the silence clock.
    pub async fn start(&mut self) {
        let now = Utc::now();
        self.clock = StreamClock::new(now);
        self.counter.begin(now);
        let preamble = vec![
            String::new(),
            self.formatter.note(now, "Start run."),
            self.formatter.note(now, &self.description),
        ];
        self.write_log(&preamble).await;

        let banner = vec![
            self.description.clone(),
            "Press Ctrl+C to see stats.".to_string(),
            "----".to_string(),
        ];
        self.write_console(&banner).await;
    }

    pub async fn handle(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::Line(record) => self.process_line(record).await,
            SourceEvent::Disconnected { source, reason } => {
                self.stats.record_disconnect(source);
                let notice = format!(
                    "Source {} disconnected: {}",
                    self.stats.source_name(source),
                    reason
                );
                self.write_console(&[notice]).await;
            }
        }
    }

    /// Run one line through matcher, counter and window, in that order.
    pub async fn process_line(&mut self, record: LineRecord) {
        self.clock = StreamClock::new(record.timestamp);
        self.stats.record_line(record.source);

        let result = self.matcher.matches(&record.text);
        let detection = self.counter.observe(&record, result);
        let line = TaggedLine::new(record, detection.pulse_gap);

        let mut console_lines = vec![self.formatter.console_line(self.counter.events(), &line)];
        if let Some(ordinal) = detection.fired {
            self.stats.record_event();
            info!(
                ordinal,
                source = line.record.source,
                pattern = ?result.pattern,
                "Event found"
            );
            console_lines.extend(self.formatter.console_banner(ordinal));
        }
        self.write_console(&console_lines).await;

        let output = self.window.push(line, detection.fired);
        if !output.is_empty() {
            debug!(items = output.len(), "Releasing window output");
            let rendered = self.formatter.render(&output);
            self.write_log(&rendered).await;
        }
    }

    /// When timed silence next turns into an event; `None` unless the run
    /// counts by NoPulse with a time radius.
    pub fn silence_deadline(&self) -> Option<Instant> {
        self.counter
            .silence_deadline()
            .map(|at| self.clock.instant_at(at))
    }

    /// Fire a stall event if the silence radius ran out with no line arriving.
    pub async fn check_silence(&mut self) {
        let now = self.clock.now();
        let Some(ordinal) = self.counter.observe_silence(now) else {
            return;
        };

        self.stats.record_event();
        warn!(ordinal, "No pulse within the window radius");
        let banner = self.formatter.console_banner(ordinal);
        self.write_console(&banner).await;

        let output = self.window.mark(ordinal, now);
        let rendered = self.formatter.render(&output);
        self.write_log(&rendered).await;
    }

    pub async fn print_summary(&mut self) {
        let mut lines = vec![String::new()];
        lines.extend(self.stats.summary(Utc::now()));
        lines.push("Press Ctrl+C again to quit.".to_string());
        self.write_console(&lines).await;
    }

    /// Final summary, closing note and flush. Consumes the processor so it
    /// can only happen once.
    pub async fn finish(mut self) -> RunStats {
        let now = Utc::now();

        let mut lines = vec![String::new()];
        lines.extend(self.stats.summary(now));
        self.write_console(&lines).await;

        let closing = [self.formatter.note(now, "Closing.")];
        self.write_log(&closing).await;

        if let Err(e) = self.log.flush().await {
            error!(error = %e, "Failed to flush log");
        }
        if let Err(e) = self.console.flush().await {
            error!(error = %e, "Failed to flush console");
        }

        self.stats
    }

    // Sink failures are reported and swallowed: losing the log must never
    // stop detection.
    async fn write_log(&mut self, lines: &[String]) {
        if let Err(e) = self.log.write_lines(lines).await {
            error!(error = %e, lines = lines.len(), "Failed to write to log");
        }
    }

    async fn write_console(&mut self, lines: &[String]) {
        if let Err(e) = self.console.write_lines(lines).await {
            error!(error = %e, "Failed to write to console");
        }
    }
}

/// Drive the processor until shutdown is requested or every source is gone.
///
/// With timed NoPulse counting the loop outlives its sources: silence after
/// the last disconnect keeps firing events until shutdown is requested.
pub async fn run_processor(
    mut input: mpsc::Receiver<SourceEvent>,
    mut control: mpsc::Receiver<Control>,
    mut processor: Processor,
) -> RunStats {
    processor.start().await;
    info!("Processor started");

    let mut input_open = true;
    loop {
        let deadline = processor.silence_deadline();
        let wake = deadline.unwrap_or_else(Instant::now);

        tokio::select! {
            biased;

            Some(request) = control.recv() => match request {
                Control::Summary => processor.print_summary().await,
                Control::Shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            },

            event = input.recv(), if input_open => match event {
                Some(event) => processor.handle(event).await,
                None if deadline.is_some() => {
                    info!("All sources disconnected, watching for silence until shutdown");
                    input_open = false;
                }
                None => {
                    info!("All sources disconnected");
                    break;
                }
            },

            _ = tokio::time::sleep_until(wake), if deadline.is_some() => {
                processor.check_silence().await;
            }

            else => break,
        }
    }

    let stats = processor.finish().await;
    info!(
        events = stats.events(),
        lines = stats.total_lines(),
        "Processor shutdown complete"
    );
    stats
}
