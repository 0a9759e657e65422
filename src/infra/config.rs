use crate::domain::{InvalidTimerDuration, TimerDuration};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::UtcOffset;
use time::macros::format_description;

pub const CONFIG_ENV: &str = "PRODIGYHABIT_CONFIG";
pub const API_URL_ENV: &str = "PRODIGYHABIT_API_URL";
pub const SESSION_ENV: &str = "PRODIGYHABIT_SESSION";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid utc_offset {0:?} (expected +HH:MM)")]
    InvalidUtcOffset(String),
    #[error("invalid {field}: {source}")]
    InvalidMinutes {
        field: &'static str,
        #[source]
        source: InvalidTimerDuration,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub session_cookie: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
    #[serde(default)]
    pub utc_offset: Option<String>,
}

fn default_api_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_focus_minutes() -> u32 {
    25
}

fn default_break_minutes() -> u32 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            session_cookie: None,
            request_timeout_secs: default_request_timeout_secs(),
            focus_minutes: default_focus_minutes(),
            break_minutes: default_break_minutes(),
            utc_offset: None,
        }
    }
}

/// Pomodoro lengths validated from config.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TimerDefaults {
    pub focus: TimerDuration,
    pub rest: TimerDuration,
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `explicit`, then `$PRODIGYHABIT_CONFIG`, then the platform config dir.
    /// Only an explicitly named file is required to exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::load_from(&path)?,
                _ => Self::default(),
            },
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_URL_ENV).filter(|value| !value.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(session) = lookup(SESSION_ENV).filter(|value| !value.trim().is_empty()) {
            self.session_cookie = Some(session.trim().to_string());
        }
        self
    }

    pub fn timer_defaults(&self) -> Result<TimerDefaults, ConfigError> {
        let focus = TimerDuration::from_minutes(self.focus_minutes).map_err(|source| {
            ConfigError::InvalidMinutes {
                field: "focus_minutes",
                source,
            }
        })?;
        let rest = TimerDuration::from_minutes(self.break_minutes).map_err(|source| {
            ConfigError::InvalidMinutes {
                field: "break_minutes",
                source,
            }
        })?;
        Ok(TimerDefaults { focus, rest })
    }

    /// The configured offset, or `None` to use the system's.
    pub fn utc_offset(&self) -> Result<Option<UtcOffset>, ConfigError> {
        let Some(raw) = self.utc_offset.as_deref() else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
            return Ok(Some(UtcOffset::UTC));
        }
        UtcOffset::parse(
            raw,
            format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
        )
        .map(Some)
        .map_err(|_| ConfigError::InvalidUtcOffset(raw.to_string()))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("prodigyhabit").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_backend() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "http://localhost:5000/api");
        assert_eq!(config.focus_minutes, 25);
        assert_eq!(config.break_minutes, 5);
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.session_cookie, None);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "focus_minutes = 50\nsession_cookie = \"abc\"\n").expect("write");

        let config = Config::load_from(&path).expect("load");
        assert_eq!(config.focus_minutes, 50);
        assert_eq!(config.break_minutes, 5);
        assert_eq!(config.session_cookie.as_deref(), Some("abc"));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "focus_minutes = \"lots\"").expect("write");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.toml");
        assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            (API_URL_ENV, "https://habits.example/api"),
            (SESSION_ENV, " token "),
        ]);
        let config = Config::default().with_env_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.api_base_url, "https://habits.example/api");
        assert_eq!(config.session_cookie.as_deref(), Some("token"));
    }

    #[test]
    fn timer_defaults_are_validated() {
        let config = Config {
            focus_minutes: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.timer_defaults(),
            Err(ConfigError::InvalidMinutes {
                field: "focus_minutes",
                ..
            })
        ));
        let defaults = Config::default().timer_defaults().expect("valid");
        assert_eq!(defaults.focus.minutes(), 25);
        assert_eq!(defaults.rest.minutes(), 5);
    }

    #[test]
    fn utc_offset_parses() {
        let config = Config {
            utc_offset: Some("+09:00".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.utc_offset().expect("valid"),
            Some(UtcOffset::from_hms(9, 0, 0).expect("offset"))
        );

        let bad = Config {
            utc_offset: Some("nine".to_string()),
            ..Config::default()
        };
        assert!(matches!(bad.utc_offset(), Err(ConfigError::InvalidUtcOffset(_))));
        assert_eq!(Config::default().utc_offset().expect("valid"), None);
    }
}
