pub mod counter;
pub mod pattern;

pub use counter::{Detection, EventCounter};
pub use pattern::{MatchResult, PatternError, PatternMatcher};
