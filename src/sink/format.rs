use crate::window::{TaggedLine, WindowOutput};
use chrono::{DateTime, Local, Utc};
use console::style;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const PULSE_GAP: &str = "*";

/// Markers identifying which port a line came from. A single port needs no
/// marker; two ports use arrows; more are numbered from 1.
pub fn source_markers(count: usize) -> Vec<String> {
    match count {
        0 | 1 => vec![String::new(); count],
        2 => vec!["< ".to_string(), " >".to_string()],
        _ => (1..=count).map(|i| format!("[{}]", i)).collect(),
    }
}

/// Renders lines and window output as text for the console and the log.
#[derive(Debug, Clone)]
pub struct Formatter {
    markers: Vec<String>,
    utc: bool,
    styled: bool,
}

impl Formatter {
    pub fn new(source_count: usize, utc: bool) -> Self {
        Self {
            markers: source_markers(source_count),
            utc,
            styled: false,
        }
    }

    /// Highlight event banners on the console (terminal colours permitting)
    pub fn styled(mut self, styled: bool) -> Self {
        self.styled = styled;
        self
    }

    pub fn timestamp(&self, at: DateTime<Utc>) -> String {
        if self.utc {
            at.format(TIMESTAMP_FORMAT).to_string()
        } else {
            at.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()
        }
    }

    fn body(&self, line: &TaggedLine) -> String {
        let gap = if line.pulse_gap { PULSE_GAP } else { "" };
        let marker = self
            .markers
            .get(line.record.source)
            .map(String::as_str)
            .unwrap_or("");

        if marker.is_empty() {
            format!("{}{}", gap, line.record.text)
        } else {
            format!("{}{} {}", gap, marker, line.record.text)
        }
    }

    /// `<timestamp> [*][marker] <text>`
    pub fn log_line(&self, line: &TaggedLine) -> String {
        format!("{} {}", self.timestamp(line.record.timestamp), self.body(line))
    }

    /// `<event count> [*][marker] <text>`
    pub fn console_line(&self, events: u64, line: &TaggedLine) -> String {
        format!("{} {}", events, self.body(line))
    }

    pub fn banner(&self, ordinal: u64) -> Vec<String> {
        let title = format!("== EVENT FOUND (#{}) ==", ordinal);
        vec!["==".to_string(), title, "==".to_string()]
    }

    /// Banner for the console, highlighted when styling is on
    pub fn console_banner(&self, ordinal: u64) -> Vec<String> {
        let mut lines = self.banner(ordinal);
        if self.styled {
            for line in &mut lines {
                *line = style(line.as_str()).red().bold().to_string();
            }
        }
        lines
    }

    /// Timestamped bookkeeping line such as `Start run.`
    pub fn note(&self, at: DateTime<Utc>, text: &str) -> String {
        format!("{} {}", self.timestamp(at), text)
    }

    /// Render window output for the log file.
    pub fn render(&self, output: &[WindowOutput]) -> Vec<String> {
        let mut lines = Vec::with_capacity(output.len() + 2);
        for item in output {
            match item {
                WindowOutput::Separator => lines.push(String::new()),
                WindowOutput::Line(line) => lines.push(self.log_line(line)),
                WindowOutput::Marker(ordinal) => lines.extend(self.banner(*ordinal)),
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::reader::LineRecord;
    use chrono::TimeZone;

    fn tagged(source: usize, text: &str, pulse_gap: bool) -> TaggedLine {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap()
            + chrono::Duration::microseconds(250);
        TaggedLine::new(LineRecord::new(source, ts, text), pulse_gap)
    }

    #[test]
    fn test_markers() {
        assert_eq!(source_markers(1), vec![""]);
        assert_eq!(source_markers(2), vec!["< ", " >"]);
        assert_eq!(source_markers(3), vec!["[1]", "[2]", "[3]"]);
    }

    #[test]
    fn test_single_port_log_line() {
        let formatter = Formatter::new(1, true);
        assert_eq!(
            formatter.log_line(&tagged(0, "ERR 5", false)),
            "2024-03-01 12:30:05.000250 ERR 5"
        );
    }

    #[test]
    fn test_two_port_log_lines() {
        let formatter = Formatter::new(2, true);
        assert_eq!(
            formatter.log_line(&tagged(0, "ok", false)),
            "2024-03-01 12:30:05.000250 <  ok"
        );
        assert_eq!(
            formatter.log_line(&tagged(1, "ok", false)),
            "2024-03-01 12:30:05.000250  > ok"
        );
    }

    #[test]
    fn test_pulse_gap_prefix() {
        let formatter = Formatter::new(2, true);
        assert_eq!(
            formatter.log_line(&tagged(1, "idle", true)),
            "2024-03-01 12:30:05.000250 * > idle"
        );
        assert_eq!(formatter.console_line(3, &tagged(0, "idle", true)), "3 *<  idle");
    }

    #[test]
    fn test_render_block() {
        let formatter = Formatter::new(1, true);
        let output = vec![
            WindowOutput::Separator,
            WindowOutput::Line(tagged(0, "ERR", false)),
            WindowOutput::Marker(7),
        ];
        assert_eq!(
            formatter.render(&output),
            vec![
                "",
                "2024-03-01 12:30:05.000250 ERR",
                "==",
                "== EVENT FOUND (#7) ==",
                "==",
            ]
        );
    }
}
