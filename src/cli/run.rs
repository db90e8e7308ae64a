use crate::cli::args::Cli;
use crate::config::{load_file_config, resolve, resolve_config_path, Config, ConfigError};
use crate::detect::PatternError;
use crate::pipeline::{run_processor, Control, Processor};
use crate::sequencer::{run_sequencer, SequencerError, SourceEvent};
use crate::sink::{ConsoleSink, FileSink, SinkError};
use crate::source::{available_ports, open_serial, LineSource, SourceError};
use std::time::Duration;
use thiserror::Error;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// How long shutdown waits for source readers to notice the stop flag.
const SOURCE_STOP_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),

    #[error("log error: {0}")]
    Sink(#[from] SinkError),

    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("sequencer error: {0}")]
    Sequencer(#[from] SequencerError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("failed to listen for Ctrl+C: {0}")]
    Signal(#[source] std::io::Error),
}

/// What the n-th interrupt (1-based) asks of the pipeline.
pub fn control_for_interrupt(count: u32) -> Control {
    if count <= 1 {
        Control::Summary
    } else {
        Control::Shutdown
    }
}

pub async fn run(cli: Cli) -> Result<(), RunError> {
    if cli.list_ports {
        for port in available_ports()? {
            println!("{}", port);
        }
        return Ok(());
    }

    let file = match resolve_config_path(cli.config.as_deref()) {
        Some(path) => {
            info!(config_path = %path.display(), "Loading configuration");
            Some(load_file_config(&path)?)
        }
        None => None,
    };

    // Everything is validated before any port or file is opened
    let config = resolve(file, cli.into_overrides())?;
    run_monitor(config).await
}

async fn run_monitor(config: Config) -> Result<(), RunError> {
    info!(path = %config.log.display(), "Opening log");
    let log = FileSink::open(&config.log).await?;

    let processor = Processor::new(&config, Box::new(log), Box::new(ConsoleSink::new()))?
        .with_styled_console(console::colors_enabled());

    let mut sources: Vec<Box<dyn LineSource>> = Vec::with_capacity(config.ports.len());
    for port in &config.ports {
        println!("Connecting to serial port '{}'.", port);
        sources.push(Box::new(open_serial(port, config.baud)?));
    }

    let (line_tx, line_rx) = mpsc::channel::<SourceEvent>(config.buffer_limit);
    let (control_tx, control_rx) = mpsc::channel::<Control>(4);

    info!(sources = sources.len(), mode = %config.mode, "Starting pipeline");
    let sequencer = run_sequencer(sources, line_tx)?;
    let mut processor_handle = tokio::spawn(run_processor(line_rx, control_rx, processor));

    let mut interrupts = 0u32;
    let stats = loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                result.map_err(RunError::Signal)?;
                interrupts += 1;
                let request = control_for_interrupt(interrupts);
                info!(interrupts, ?request, "Interrupt received");
                if control_tx.send(request).await.is_err() {
                    warn!("Processor already stopped");
                }
            }
            result = &mut processor_handle => break result?,
        }
    };

    sequencer.stop();
    match tokio::time::timeout(SOURCE_STOP_GRACE, sequencer.wait()).await {
        Ok(result) => result?,
        Err(_) => warn!("Source readers did not stop in time"),
    }

    info!(
        events = stats.events(),
        lines = stats.total_lines(),
        "Run complete"
    );
    Ok(())
}
