pub mod console;
pub mod file;
pub mod format;
pub mod memory;
pub mod traits;

pub use console::ConsoleSink;
pub use file::FileSink;
pub use format::{source_markers, Formatter};
pub use memory::MemorySink;
pub use traits::{LineSink, SinkError};
