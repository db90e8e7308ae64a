use crate::config::types::PatternConfig;
use regex::{RegexBuilder, RegexSet, RegexSetBuilder};
use thiserror::Error;

/// Error type for pattern compilation
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("regex compilation error for pattern #{index} '{pattern}': {source}")]
    RegexCompilation {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("at least one pattern is required")]
    Empty,
}

/// Outcome of matching one line against the pattern set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchResult {
    pub matched: bool,
    /// Index of the lowest-numbered pattern that matched
    pub pattern: Option<usize>,
}

impl MatchResult {
    pub fn hit(pattern: usize) -> Self {
        Self {
            matched: true,
            pattern: Some(pattern),
        }
    }

    pub fn miss() -> Self {
        Self::default()
    }
}

/// Compiled set of patterns evaluated against every incoming line.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    set: RegexSet,
}

impl PatternMatcher {
    pub fn new(config: &PatternConfig) -> Result<Self, PatternError> {
        if config.patterns.is_empty() {
            return Err(PatternError::Empty);
        }

        let sources: Vec<String> = config
            .patterns
            .iter()
            .map(|p| if config.literal { regex::escape(p) } else { p.clone() })
            .collect();

        // Compile individually first so a failure can name the offending pattern
        for (index, source) in sources.iter().enumerate() {
            RegexBuilder::new(source)
                .case_insensitive(config.ignore_case)
                .build()
                .map_err(|e| PatternError::RegexCompilation {
                    index,
                    pattern: config.patterns[index].clone(),
                    source: e,
                })?;
        }

        let set = RegexSetBuilder::new(&sources)
            .case_insensitive(config.ignore_case)
            .build()
            .map_err(|e| PatternError::RegexCompilation {
                index: 0,
                pattern: config.patterns.join(", "),
                source: e,
            })?;

        Ok(Self { set })
    }

    /// Match a line of text. Pure; the lowest matching index wins.
    pub fn matches(&self, text: &str) -> MatchResult {
        match self.set.matches(text).iter().next() {
            Some(index) => MatchResult::hit(index),
            None => MatchResult::miss(),
        }
    }
}
