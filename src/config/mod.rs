pub mod parse;
pub mod types;

use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use parse::{load_file_config, resolve, ConfigError};
pub use types::{Config, ConfigOverrides, CountingMode, FileConfig, PatternConfig, Radius};

const USER_CONFIG: &str = ".config/retrover/config.yml";

pub(crate) fn env_var_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
    })
}

/// Expands `$env{VAR_NAME}` references. Unset variables are left as written.
pub fn expand_env_vars(text: &str) -> String {
    env_var_regex()
        .replace_all(text, |caps: &Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    } else if path_str == "~" {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir;
        }
    }

    path.to_path_buf()
}

/// Resolves the config file path: the explicit argument if given, otherwise
/// `~/.config/retrover/config.yml` when it exists. No file is fine; the
/// command line alone can describe a run.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(expand_tilde(path));
    }

    let user_config = dirs::home_dir()?.join(USER_CONFIG);
    user_config.exists().then_some(user_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("RETROVER_TEST_DIR", "/var/log");
        let result = expand_env_vars("log: $env{RETROVER_TEST_DIR}/serial.log");
        assert_eq!(result, "log: /var/log/serial.log");
        std::env::remove_var("RETROVER_TEST_DIR");
    }

    #[test]
    fn test_expand_env_vars_unset_left_unchanged() {
        let result = expand_env_vars("$env{RETROVER_TEST_UNSET}/file");
        assert_eq!(result, "$env{RETROVER_TEST_UNSET}/file");
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/logs/a.log")), home.join("logs/a.log"));
            assert_eq!(expand_tilde(Path::new("~")), home);
        }
        assert_eq!(
            expand_tilde(Path::new("relative/retrover.log")),
            Path::new("relative/retrover.log")
        );
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let path = resolve_config_path(Some(Path::new("/etc/retrover.yml")));
        assert_eq!(path, Some(PathBuf::from("/etc/retrover.yml")));
    }
}
