use super::traits::{LineSink, SinkError};
use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Stdout};

/// Pass-through sink writing to standard output.
pub struct ConsoleSink {
    stdout: Stdout,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            stdout: tokio::io::stdout(),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LineSink for ConsoleSink {
    async fn write_lines(&mut self, lines: &[String]) -> Result<(), SinkError> {
        let mut text = String::new();
        for line in lines {
            text.push_str(line);
            text.push('\n');
        }
        self.stdout.write_all(text.as_bytes()).await?;
        self.stdout.flush().await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.stdout.flush().await?;
        Ok(())
    }
}
