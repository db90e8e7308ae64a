use crate::config::types::Radius;
use crate::source::reader::LineRecord;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// A line together with the counter's verdict on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedLine {
    pub record: LineRecord,
    pub pulse_gap: bool,
}

impl TaggedLine {
    pub fn new(record: LineRecord, pulse_gap: bool) -> Self {
        Self { record, pulse_gap }
    }
}

/// Items the window releases to the log, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowOutput {
    /// Gap between two unrelated captured blocks
    Separator,
    Line(TaggedLine),
    Marker(u64),
}

/// Keeps a bounded history of recent lines and releases it, plus a trailing
/// window, whenever an event fires. Everything else is dropped.
#[derive(Debug)]
pub struct WindowBuffer {
    radius: Radius,
    pre_buffer: VecDeque<TaggedLine>,
    capturing: bool,
    post_count: usize,
    event_at: Option<DateTime<Utc>>,
}

impl WindowBuffer {
    pub fn new(radius: Radius) -> Self {
        let capacity = match radius {
            Radius::Lines(n) => n,
            Radius::Duration(_) => 64,
        };

        Self {
            radius,
            pre_buffer: VecDeque::with_capacity(capacity),
            capturing: false,
            post_count: 0,
            event_at: None,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Lines currently held back waiting for a possible event
    pub fn buffered(&self) -> usize {
        self.pre_buffer.len()
    }

    /// Feed one line; `fired` carries the ordinal when this line is an event.
    pub fn push(&mut self, line: TaggedLine, fired: Option<u64>) -> Vec<WindowOutput> {
        if let Some(ordinal) = fired {
            return self.open_window(line, ordinal);
        }

        if self.capturing {
            match self.radius {
                Radius::Lines(radius) => {
                    self.post_count += 1;
                    if self.post_count >= radius {
                        self.close_window();
                    }
                    return vec![WindowOutput::Line(line)];
                }
                Radius::Duration(radius) => {
                    if self.within_event_radius(line.record.timestamp, radius) {
                        self.post_count += 1;
                        return vec![WindowOutput::Line(line)];
                    }
                    // Past the window: this line is ordinary history again
                    self.close_window();
                }
            }
        }

        self.remember(line);
        Vec::new()
    }

    /// Record an event no line carried, such as a stalled port. `at` is when
    /// it fired; the marker stands where the trigger line would be.
    pub fn mark(&mut self, ordinal: u64, at: DateTime<Utc>) -> Vec<WindowOutput> {
        if let Radius::Duration(radius) = self.radius {
            if self.capturing && !self.within_event_radius(at, radius) {
                self.close_window();
            }
            self.expire(at, radius);
        }

        let mut output = self.begin_block();
        output.push(WindowOutput::Marker(ordinal));
        self.restart_capture(at);
        output
    }

    fn open_window(&mut self, line: TaggedLine, ordinal: u64) -> Vec<WindowOutput> {
        let at = line.record.timestamp;
        let mut output = self.begin_block();
        output.push(WindowOutput::Line(line));
        output.push(WindowOutput::Marker(ordinal));
        self.restart_capture(at);
        output
    }

    fn begin_block(&mut self) -> Vec<WindowOutput> {
        let mut output = Vec::with_capacity(self.pre_buffer.len() + 3);

        // A second event inside an open window continues the same block
        if !self.capturing {
            output.push(WindowOutput::Separator);
            output.extend(self.pre_buffer.drain(..).map(WindowOutput::Line));
        }
        output
    }

    fn restart_capture(&mut self, at: DateTime<Utc>) {
        self.event_at = Some(at);
        self.capturing = self.radius != Radius::Lines(0);
        self.post_count = 0;
    }

    fn close_window(&mut self) {
        self.capturing = false;
        self.post_count = 0;
        self.pre_buffer.clear();
    }

    fn within_event_radius(&self, at: DateTime<Utc>, radius: std::time::Duration) -> bool {
        let Some(event_at) = self.event_at else {
            return false;
        };
        // A clock stepped backwards closes the window
        (at - event_at)
            .to_std()
            .map(|elapsed| elapsed <= radius)
            .unwrap_or(false)
    }

    fn remember(&mut self, line: TaggedLine) {
        match self.radius {
            Radius::Lines(0) => {}
            Radius::Lines(capacity) => {
                if self.pre_buffer.len() >= capacity {
                    self.pre_buffer.pop_front();
                }
                self.pre_buffer.push_back(line);
            }
            Radius::Duration(radius) => {
                let newest = line.record.timestamp;
                self.pre_buffer.push_back(line);
                self.expire(newest, radius);
            }
        }
    }

    /// Drop history older than `radius` as seen from `now`.
    fn expire(&mut self, now: DateTime<Utc>, radius: std::time::Duration) {
        while let Some(oldest) = self.pre_buffer.front() {
            let expired = (now - oldest.record.timestamp)
                .to_std()
                .map(|age| age > radius)
                .unwrap_or(false);
            if !expired {
                break;
            }
            self.pre_buffer.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn line(secs: i64, text: &str) -> TaggedLine {
        let ts = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        TaggedLine::new(LineRecord::new(0, ts, text), false)
    }

    fn texts(output: &[WindowOutput]) -> Vec<String> {
        output
            .iter()
            .map(|o| match o {
                WindowOutput::Separator => "--".to_string(),
                WindowOutput::Line(l) => l.record.text.clone(),
                WindowOutput::Marker(n) => format!("#{n}"),
            })
            .collect()
    }

    #[test]
    fn test_quiet_stream_emits_nothing() {
        let mut window = WindowBuffer::new(Radius::Lines(3));
        for i in 0..10 {
            assert!(window.push(line(i, "ok"), None).is_empty());
            assert!(window.buffered() <= 3);
        }
        assert_eq!(window.buffered(), 3);
    }

    #[test]
    fn test_event_releases_pre_buffer_then_post_window() {
        let mut window = WindowBuffer::new(Radius::Lines(2));
        let mut log = Vec::new();

        for (i, text) in ["a", "b", "c"].iter().enumerate() {
            log.extend(window.push(line(i as i64, text), None));
        }
        log.extend(window.push(line(3, "ERR"), Some(1)));
        for (i, text) in ["d", "e", "f"].iter().enumerate() {
            log.extend(window.push(line(4 + i as i64, text), None));
        }

        assert_eq!(texts(&log), vec!["--", "b", "c", "ERR", "#1", "d", "e"]);
        assert!(!window.is_capturing());
        // "f" went back into history
        assert_eq!(window.buffered(), 1);
    }

    #[test]
    fn test_overlapping_events_merge() {
        let mut window = WindowBuffer::new(Radius::Lines(2));
        let mut log = Vec::new();

        log.extend(window.push(line(0, "a"), None));
        log.extend(window.push(line(1, "ERR"), Some(1)));
        log.extend(window.push(line(2, "b"), None));
        log.extend(window.push(line(3, "ERR"), Some(2)));
        log.extend(window.push(line(4, "c"), None));
        log.extend(window.push(line(5, "d"), None));
        log.extend(window.push(line(6, "e"), None));

        assert_eq!(
            texts(&log),
            vec!["--", "a", "ERR", "#1", "b", "ERR", "#2", "c", "d"]
        );
    }

    #[test]
    fn test_separate_events_get_separators() {
        let mut window = WindowBuffer::new(Radius::Lines(1));
        let mut log = Vec::new();

        log.extend(window.push(line(0, "ERR"), Some(1)));
        log.extend(window.push(line(1, "a"), None));
        log.extend(window.push(line(2, "b"), None));
        log.extend(window.push(line(3, "ERR"), Some(2)));

        assert_eq!(texts(&log), vec!["--", "ERR", "#1", "a", "--", "b", "ERR", "#2"]);
    }

    #[test]
    fn test_zero_radius_keeps_only_trigger() {
        let mut window = WindowBuffer::new(Radius::Lines(0));
        let mut log = Vec::new();

        log.extend(window.push(line(0, "a"), None));
        log.extend(window.push(line(1, "ERR"), Some(1)));
        log.extend(window.push(line(2, "b"), None));

        assert_eq!(texts(&log), vec!["--", "ERR", "#1"]);
        assert!(!window.is_capturing());
    }

    #[test]
    fn test_time_radius() {
        let mut window = WindowBuffer::new(Radius::Duration(Duration::from_secs(2)));
        let mut log = Vec::new();

        log.extend(window.push(line(0, "old"), None));
        log.extend(window.push(line(5, "recent"), None));
        log.extend(window.push(line(6, "ERR"), Some(1)));
        log.extend(window.push(line(7, "after1"), None));
        log.extend(window.push(line(8, "after2"), None));
        log.extend(window.push(line(9, "late"), None));

        assert_eq!(
            texts(&log),
            vec!["--", "recent", "ERR", "#1", "after1", "after2"]
        );
        assert!(!window.is_capturing());
        assert_eq!(window.buffered(), 1);
    }

    #[test]
    fn test_clock_step_back_closes_window() {
        let mut window = WindowBuffer::new(Radius::Duration(Duration::from_secs(60)));
        let mut log = Vec::new();

        log.extend(window.push(line(3600, "ERR"), Some(1)));
        log.extend(window.push(line(3601, "after"), None));
        log.extend(window.push(line(0, "stepped"), None));

        assert_eq!(texts(&log), vec!["--", "ERR", "#1", "after"]);
        assert!(!window.is_capturing());
        assert_eq!(window.buffered(), 1);
    }

    #[test]
    fn test_mark_without_trigger_line() {
        let mut window = WindowBuffer::new(Radius::Duration(Duration::from_secs(2)));
        let mut log = Vec::new();

        log.extend(window.push(line(0, "stale"), None));
        log.extend(window.push(line(3, "last"), None));
        log.extend(window.mark(1, line(4, "").record.timestamp));
        assert!(window.is_capturing());

        log.extend(window.push(line(5, "back"), None));
        // Stalled again long after the window ran out: a new block
        log.extend(window.mark(2, line(20, "").record.timestamp));

        assert_eq!(
            texts(&log),
            vec!["--", "last", "#1", "back", "--", "#2"]
        );
    }

    #[test]
    fn test_mark_inside_open_window_continues_block() {
        let mut window = WindowBuffer::new(Radius::Lines(2));
        let mut log = Vec::new();

        log.extend(window.push(line(0, "ERR"), Some(1)));
        log.extend(window.mark(2, line(1, "").record.timestamp));
        log.extend(window.push(line(2, "a"), None));

        assert_eq!(texts(&log), vec!["--", "ERR", "#1", "#2", "a"]);
    }
}
