pub mod cli;
pub mod config;
pub mod detect;
pub mod pipeline;
pub mod sequencer;
pub mod sink;
pub mod source;
pub mod window;
