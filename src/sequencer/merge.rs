use crate::source::reader::{LineRecord, LineSource};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("no sources provided")]
    NoSources,

    #[error("join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What the merged stream carries to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Line(LineRecord),
    /// The source will produce no more lines
    Disconnected { source: usize, reason: String },
}

/// Start one reader task per source, all feeding the single `output` channel.
///
/// Lines reach the consumer in the order they arrived, across all sources; no
/// timestamp sorting is attempted. Each source keeps its own relative order.
/// The channel closes once every source has disconnected.
pub fn run_sequencer(
    sources: Vec<Box<dyn LineSource>>,
    output: mpsc::Sender<SourceEvent>,
) -> Result<SequencerHandle, SequencerError> {
    if sources.is_empty() {
        return Err(SequencerError::NoSources);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let mut source_tasks = Vec::with_capacity(sources.len());

    for (index, mut source) in sources.into_iter().enumerate() {
        let tx = output.clone();
        let stop = stop.clone();

        // Reads block, so each source gets its own blocking thread
        let handle = tokio::task::spawn_blocking(move || {
            info!(source = index, name = %source.name(), "Source reader started");
            let reason = loop {
                match source.read_line(&stop) {
                    Ok(Some(text)) => {
                        let record = LineRecord::new(index, Utc::now(), text);
                        if tx.blocking_send(SourceEvent::Line(record)).is_err() {
                            debug!(source = index, "Consumer gone, stopping reader");
                            return;
                        }
                    }
                    Ok(None) if stop.load(Ordering::SeqCst) => break "stopped".to_string(),
                    Ok(None) => break "end of stream".to_string(),
                    Err(e) => break e.to_string(),
                }
            };

            warn!(source = index, name = %source.name(), reason = %reason, "Source disconnected");
            let _ = tx.blocking_send(SourceEvent::Disconnected {
                source: index,
                reason,
            });
        });
        source_tasks.push(handle);
    }

    Ok(SequencerHandle { stop, source_tasks })
}

/// Handle to the running source readers
pub struct SequencerHandle {
    stop: Arc<AtomicBool>,
    source_tasks: Vec<JoinHandle<()>>,
}

impl SequencerHandle {
    /// Ask every source to stop at its next read timeout
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Wait for all source readers to finish
    pub async fn wait(self) -> Result<(), SequencerError> {
        for task in self.source_tasks {
            task.await?;
        }
        Ok(())
    }
}
