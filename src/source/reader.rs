use chrono::{DateTime, Utc};
use std::io::{BufRead, ErrorKind};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("io error on '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open serial port '{port}': {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(#[source] serialport::Error),
}

/// One line as received from a source. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    /// Index of the source in the order the ports were listed
    pub source: usize,
    /// Arrival instant
    pub timestamp: DateTime<Utc>,
    /// Line content without the line terminator
    pub text: String,
}

impl LineRecord {
    pub fn new(source: usize, timestamp: DateTime<Utc>, text: impl Into<String>) -> Self {
        Self {
            source,
            timestamp,
            text: text.into(),
        }
    }
}

/// A blocking producer of text lines.
///
/// Implementations may block inside `read_line`, but should return to check
/// `stop` periodically so shutdown is not held up by a silent port.
pub trait LineSource: Send + 'static {
    fn name(&self) -> &str;

    /// Read the next line. `Ok(None)` means the stream ended (or `stop` was
    /// raised) and no further lines will come.
    fn read_line(&mut self, stop: &AtomicBool) -> Result<Option<String>, SourceError>;
}

/// Splits any buffered byte stream into lines.
///
/// Read timeouts are not errors: the partial line read so far is kept and
/// reading resumes on the next call into the underlying reader.
pub struct LineReader<R> {
    name: String,
    inner: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(name: impl Into<String>, inner: R) -> Self {
        Self {
            name: name.into(),
            inner,
            buf: Vec::with_capacity(256),
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.buf).trim().to_string();
        self.buf.clear();
        line
    }
}

impl<R: BufRead + Send + 'static> LineSource for LineReader<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_line(&mut self, stop: &AtomicBool) -> Result<Option<String>, SourceError> {
        loop {
            if stop.load(Ordering::SeqCst) {
                return Ok(None);
            }

            match self.inner.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    if self.buf.is_empty() {
                        return Ok(None);
                    }
                    // Final line without a terminator
                    return Ok(Some(self.take_line()));
                }
                Ok(_) => {
                    if self.buf.ends_with(b"\n") {
                        return Ok(Some(self.take_line()));
                    }
                    // Hit EOF mid-line; the next call returns Ok(0)
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    // Nothing yet, keep whatever partial line we have
                }
                Err(e) => {
                    return Err(SourceError::Io {
                        name: self.name.clone(),
                        source: e,
                    })
                }
            }
        }
    }
}
