use super::types::*;
use crate::config::{env_var_regex, expand_env_vars, expand_tilde};
use crate::detect::pattern::{PatternError, PatternMatcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML in '{path}': {source}")]
    YamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("--window and --windowSecs are mutually exclusive")]
    ConflictingRadius,

    #[error("no counting mode given; use one of --eventrun, --delta, --single, --nopulse")]
    NoCountingMode,

    #[error("at least one serial port is required")]
    NoPorts,

    #[error("at least one --regex pattern is required")]
    NoPatterns,

    #[error("validation failed: {0}")]
    Validation(String),
}

/// Load the YAML config file at `path`.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let yaml_string = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    // Expand environment variables in the YAML string before parsing
    let yaml_string = expand_env_vars(&yaml_string);
    check_unexpanded_vars(&yaml_string)?;

    let config: FileConfig =
        serde_yaml::from_str(&yaml_string).map_err(|e| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })?;

    if config.window_lines.is_some() && config.window_duration.is_some() {
        return Err(ConfigError::Validation(format!(
            "'{}' sets both window_lines and window_duration",
            path.display()
        )));
    }

    Ok(config)
}

fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let mut unexpanded: Vec<&str> = env_var_regex()
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .collect();

    if unexpanded.is_empty() {
        return Ok(());
    }

    unexpanded.sort();
    unexpanded.dedup();

    Err(ConfigError::Validation(format!(
        "environment variable(s) not set: {}",
        unexpanded.join(", ")
    )))
}

/// Merge the optional file layer with command-line overrides and validate the
/// result. Nothing is opened here; every error surfaces before any port is
/// touched.
pub fn resolve(
    file: Option<FileConfig>,
    cli: ConfigOverrides,
) -> Result<Config, ConfigError> {
    let file = file.unwrap_or_default();
    let radius = resolve_radius(&file, &cli)?;

    let ports = if cli.ports.is_empty() { file.ports } else { cli.ports };
    if ports.is_empty() {
        return Err(ConfigError::NoPorts);
    }

    let mode = cli
        .mode
        .or(file.mode)
        .ok_or(ConfigError::NoCountingMode)?;

    let patterns = PatternConfig {
        patterns: if cli.patterns.is_empty() {
            file.patterns
        } else {
            cli.patterns
        },
        literal: cli.literal || file.literal,
        ignore_case: cli.ignore_case || file.ignore_case,
    };
    if patterns.patterns.is_empty() {
        return Err(ConfigError::NoPatterns);
    }

    // Fail fast on malformed patterns
    PatternMatcher::new(&patterns)?;

    let baud = cli.baud.or(file.baud).unwrap_or(DEFAULT_BAUD);
    if baud == 0 {
        return Err(ConfigError::Validation("baud rate must be positive".to_string()));
    }

    let buffer_limit = file.buffer_limit.unwrap_or(DEFAULT_BUFFER_LIMIT);
    if buffer_limit == 0 {
        return Err(ConfigError::Validation(
            "buffer_limit must be positive".to_string(),
        ));
    }

    let log = cli
        .log
        .or(file.log)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

    Ok(Config {
        ports,
        baud,
        log: expand_tilde(&log),
        radius,
        mode,
        patterns,
        utc: cli.utc || file.utc,
        buffer_limit,
    })
}

fn resolve_radius(file: &FileConfig, cli: &ConfigOverrides) -> Result<Radius, ConfigError> {
    match (cli.window, cli.window_secs) {
        (Some(_), Some(_)) => Err(ConfigError::ConflictingRadius),
        (Some(lines), None) => Ok(Radius::Lines(lines)),
        (None, Some(secs)) => seconds_radius(secs),
        // The command line replaces the file's radius as a whole
        (None, None) => match (file.window_lines, file.window_duration) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingRadius),
            (Some(lines), None) => Ok(Radius::Lines(lines)),
            (None, Some(d)) if d.is_zero() => Err(ConfigError::Validation(
                "window_duration must be positive".to_string(),
            )),
            (None, Some(d)) => Ok(Radius::Duration(d)),
            (None, None) => Ok(Radius::default()),
        },
    }
}

fn seconds_radius(secs: f64) -> Result<Radius, ConfigError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "--windowSecs must be a positive number of seconds, got {}",
            secs
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map(Radius::Duration)
        .map_err(|e| ConfigError::Validation(format!("--windowSecs {}: {}", secs, e)))
}
