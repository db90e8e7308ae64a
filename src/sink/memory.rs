use super::traits::{LineSink, SinkError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Collects lines in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LineSink for MemorySink {
    async fn write_lines(&mut self, lines: &[String]) -> Result<(), SinkError> {
        if let Ok(mut guard) = self.lines.lock() {
            guard.extend_from_slice(lines);
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
