use super::reader::{LineReader, SourceError};
use serialport::SerialPort;
use std::io::BufReader;
use std::time::Duration;
use tracing::{info, warn};

/// Read timeout on serial ports; bounds how long a silent port delays shutdown.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

pub type SerialLineReader = LineReader<BufReader<Box<dyn SerialPort>>>;

/// Open a serial port and wrap it in a line reader.
pub fn open_serial(port: &str, baud_rate: u32) -> Result<SerialLineReader, SourceError> {
    info!(port = %port, baud = baud_rate, "Connecting to serial port");

    let serial_port = serialport::new(port, baud_rate)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|e| SourceError::Open {
            port: port.to_string(),
            source: e,
        })?;

    // Drop whatever was queued before we attached
    if let Err(e) = serial_port.clear(serialport::ClearBuffer::Input) {
        warn!(port = %port, error = %e, "Failed to clear input buffer");
    }

    Ok(LineReader::new(port, BufReader::new(serial_port)))
}

/// Names of the serial ports the system reports.
pub fn available_ports() -> Result<Vec<String>, SourceError> {
    let ports = serialport::available_ports().map_err(SourceError::Enumerate)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
