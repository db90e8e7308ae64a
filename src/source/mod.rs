pub mod reader;
pub mod serial;

pub use reader::{LineReader, LineRecord, LineSource, SourceError};
pub use serial::{available_ports, open_serial};
