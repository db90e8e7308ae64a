use retrover::config::types::{ConfigOverrides, CountingMode, Radius};
use retrover::config::{load_file_config, resolve, ConfigError};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_yaml_config_loads() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    let config_yaml = r#"
ports:
  - /dev/ttyUSB0
  - /dev/ttyUSB1
baud: 115200
log: /tmp/bench.log
window_duration: 1500ms
mode: nopulse
patterns:
  - 'heartbeat \d+'
ignore_case: true
utc: true
buffer_limit: 64
"#;
    fs::write(&config_path, config_yaml).unwrap();

    let file = load_file_config(&config_path).unwrap();
    let config = resolve(Some(file), ConfigOverrides::default()).unwrap();

    assert_eq!(config.ports, vec!["/dev/ttyUSB0", "/dev/ttyUSB1"]);
    assert_eq!(config.baud, 115200);
    assert_eq!(config.log, PathBuf::from("/tmp/bench.log"));
    assert_eq!(config.radius, Radius::Duration(Duration::from_millis(1500)));
    assert_eq!(config.mode, CountingMode::NoPulse);
    assert_eq!(config.patterns.patterns, vec![r"heartbeat \d+"]);
    assert!(config.patterns.ignore_case);
    assert!(config.utc);
    assert_eq!(config.buffer_limit, 64);
}

#[test]
fn test_yaml_env_var_expansion() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");

    std::env::set_var("RETROVER_CONFIG_TEST_PORT", "/dev/ttyACM3");
    fs::write(
        &config_path,
        "ports: [$env{RETROVER_CONFIG_TEST_PORT}]\nmode: single\npatterns: [ERR]\n",
    )
    .unwrap();

    let file = load_file_config(&config_path).unwrap();
    assert_eq!(file.ports, vec!["/dev/ttyACM3"]);
    std::env::remove_var("RETROVER_CONFIG_TEST_PORT");
}

#[test]
fn test_yaml_unset_env_var_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");
    fs::write(&config_path, "log: $env{RETROVER_CONFIG_TEST_UNSET}/a.log\n").unwrap();

    let err = load_file_config(&config_path).unwrap_err();
    assert!(err.to_string().contains("RETROVER_CONFIG_TEST_UNSET"));
}

#[test]
fn test_yaml_both_radii_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");
    fs::write(&config_path, "window_lines: 5\nwindow_duration: 2s\n").unwrap();

    assert!(matches!(
        load_file_config(&config_path),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_yaml_unknown_key_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");
    fs::write(&config_path, "ports: [COM1]\nwindowSecs: 2\n").unwrap();

    assert!(matches!(
        load_file_config(&config_path),
        Err(ConfigError::YamlParse { .. })
    ));
}

#[test]
fn test_missing_file_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("absent.yml");
    assert!(matches!(
        load_file_config(&config_path),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn test_command_line_mode_overrides_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yml");
    fs::write(
        &config_path,
        "ports: [COM1]\nmode: eventrun\npatterns: [ERR]\nwindow_lines: 4\n",
    )
    .unwrap();

    let file = load_file_config(&config_path).unwrap();
    let cli = ConfigOverrides {
        mode: Some(CountingMode::Delta),
        window_secs: Some(0.5),
        ..Default::default()
    };
    let config = resolve(Some(file), cli).unwrap();

    assert_eq!(config.mode, CountingMode::Delta);
    assert_eq!(config.radius, Radius::Duration(Duration::from_millis(500)));
}
