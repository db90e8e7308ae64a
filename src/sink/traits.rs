use async_trait::async_trait;
use std::path::PathBuf;

/// Append-only destination for rendered text lines.
#[async_trait]
pub trait LineSink: Send {
    /// Append lines in order. Lines carry no trailing newline.
    async fn write_lines(&mut self, lines: &[String]) -> Result<(), SinkError>;

    async fn flush(&mut self) -> Result<(), SinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to open log file '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write error: {0}")]
    Write(#[from] std::io::Error),
}
