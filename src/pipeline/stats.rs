use chrono::{DateTime, Utc};
use std::time::Duration;

/// Counters reported in run summaries.
#[derive(Debug, Clone)]
pub struct RunStats {
    started: DateTime<Utc>,
    events: u64,
    sources: Vec<SourceStats>,
}

#[derive(Debug, Clone)]
struct SourceStats {
    name: String,
    lines: u64,
    connected: bool,
}

impl RunStats {
    pub fn new(source_names: &[String], started: DateTime<Utc>) -> Self {
        Self {
            started,
            events: 0,
            sources: source_names
                .iter()
                .map(|name| SourceStats {
                    name: name.clone(),
                    lines: 0,
                    connected: true,
                })
                .collect(),
        }
    }

    pub fn record_line(&mut self, source: usize) {
        if let Some(stats) = self.sources.get_mut(source) {
            stats.lines += 1;
        }
    }

    pub fn record_event(&mut self) {
        self.events += 1;
    }

    pub fn record_disconnect(&mut self, source: usize) {
        if let Some(stats) = self.sources.get_mut(source) {
            stats.connected = false;
        }
    }

    pub fn events(&self) -> u64 {
        self.events
    }

    pub fn lines(&self, source: usize) -> u64 {
        self.sources.get(source).map(|s| s.lines).unwrap_or(0)
    }

    pub fn total_lines(&self) -> u64 {
        self.sources.iter().map(|s| s.lines).sum()
    }

    pub fn source_name(&self, source: usize) -> &str {
        self.sources
            .get(source)
            .map(|s| s.name.as_str())
            .unwrap_or("?")
    }

    /// Human-readable summary as of `now`.
    pub fn summary(&self, now: DateTime<Utc>) -> Vec<String> {
        let elapsed = (now - self.started).to_std().unwrap_or_default();

        let mut lines = Vec::with_capacity(self.sources.len() + 1);
        if self.events > 0 {
            // n events split the run into n + 1 stretches
            let stretches = u32::try_from(self.events.saturating_add(1)).unwrap_or(u32::MAX);
            let between = elapsed / stretches;
            lines.push(format!(
                "There have been {} event(s) in {}, for an average time between of {}.",
                self.events,
                format_elapsed(elapsed),
                format_elapsed(between)
            ));
        } else {
            lines.push(format!(
                "There have been no events in {}.",
                format_elapsed(elapsed)
            ));
        }

        for source in &self.sources {
            let state = if source.connected { "" } else { " (disconnected)" };
            lines.push(format!("  {}: {} line(s){}", source.name, source.lines, state));
        }
        lines
    }
}

/// `H:MM:SS.mmm`
pub fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    format!(
        "{}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        d.subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(3_723_045)), "1:02:03.045");
        assert_eq!(format_elapsed(Duration::ZERO), "0:00:00.000");
    }

    #[test]
    fn test_summary_without_events() {
        let stats = RunStats::new(&["COM1".to_string()], start());
        let summary = stats.summary(start() + chrono::Duration::seconds(90));
        assert_eq!(
            summary,
            vec![
                "There have been no events in 0:01:30.000.",
                "  COM1: 0 line(s)",
            ]
        );
    }

    #[test]
    fn test_summary_with_events() {
        let mut stats = RunStats::new(&["a".to_string(), "b".to_string()], start());
        stats.record_line(0);
        stats.record_line(0);
        stats.record_line(1);
        stats.record_event();
        stats.record_disconnect(1);

        let summary = stats.summary(start() + chrono::Duration::seconds(10));
        assert_eq!(
            summary,
            vec![
                "There have been 1 event(s) in 0:00:10.000, for an average time between of 0:00:05.000.",
                "  a: 2 line(s)",
                "  b: 1 line(s) (disconnected)",
            ]
        );
        assert_eq!(stats.total_lines(), 3);
    }
}
