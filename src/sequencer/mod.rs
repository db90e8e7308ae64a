pub mod merge;

pub use merge::{run_sequencer, SequencerError, SequencerHandle, SourceEvent};
