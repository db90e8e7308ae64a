use super::traits::{LineSink, SinkError};
use async_trait::async_trait;
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Appends the windowed log to a file.
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    /// Open (or create) `path` for appending.
    pub async fn open(path: &Path) -> Result<Self, SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| SinkError::Open {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

#[async_trait]
impl LineSink for FileSink {
    async fn write_lines(&mut self, lines: &[String]) -> Result<(), SinkError> {
        for line in lines {
            self.writer.write_all(line.as_bytes()).await?;
            self.writer.write_all(b"\n").await?;
        }
        // Keep the file current so a crash loses at most the line in flight
        self.writer.flush().await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush().await?;
        Ok(())
    }
}
