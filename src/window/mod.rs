pub mod buffer;

pub use buffer::{TaggedLine, WindowBuffer, WindowOutput};
