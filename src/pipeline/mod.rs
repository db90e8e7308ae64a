pub mod runner;
pub mod stats;

pub use runner::{run_processor, Control, Processor};
pub use stats::RunStats;
