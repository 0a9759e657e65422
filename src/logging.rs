//! Logging setup.
//!
//! The TUI owns the terminal, so interactive runs log to a file in the state
//! directory while CLI subcommands log to stderr. `RUST_LOG` overrides the
//! preset chosen on the command line.

use std::fs::File;
use std::sync::Mutex;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("invalid log format '{s}' (use text or json)")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPreset {
    /// Startup and API outcomes only.
    #[default]
    Production,
    Verbose,
    Debug,
    /// Warnings and errors.
    Quiet,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub preset: LogPreset,
    pub format: LogFormat,
}

pub enum LogSink {
    Stderr,
    File(File),
}

impl LogConfig {
    pub fn from_flags(verbose: bool, debug: bool, quiet: bool, format: LogFormat) -> Self {
        let preset = if quiet {
            LogPreset::Quiet
        } else if debug {
            LogPreset::Debug
        } else if verbose {
            LogPreset::Verbose
        } else {
            LogPreset::Production
        };
        Self { preset, format }
    }

    pub fn directives(&self) -> &'static str {
        match self.preset {
            LogPreset::Production => {
                "warn,prodigyhabit::startup=info,prodigyhabit::api=info,prodigyhabit::cli=info"
            }
            LogPreset::Verbose => "warn,prodigyhabit=info",
            LogPreset::Debug => "info,prodigyhabit=debug",
            LogPreset::Quiet => "warn",
        }
    }

    pub fn build_filter(&self) -> EnvFilter {
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }
        EnvFilter::try_new(self.directives()).unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init(config: &LogConfig, sink: LogSink) {
    let filter = config.build_filter();
    let (writer, ansi) = match sink {
        LogSink::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
        LogSink::File(file) => (BoxMakeWriter::new(Mutex::new(file)), false),
    };

    let result = match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(ansi)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(writer).with_target(true))
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!(target: "prodigyhabit::startup", "tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn preset_priority() {
        assert_eq!(LogConfig::from_flags(true, true, true, LogFormat::Text).preset, LogPreset::Quiet);
        assert_eq!(LogConfig::from_flags(true, true, false, LogFormat::Text).preset, LogPreset::Debug);
        assert_eq!(LogConfig::from_flags(true, false, false, LogFormat::Text).preset, LogPreset::Verbose);
        assert_eq!(
            LogConfig::from_flags(false, false, false, LogFormat::Json),
            LogConfig {
                preset: LogPreset::Production,
                format: LogFormat::Json
            }
        );
    }

    #[test]
    fn every_preset_yields_a_valid_filter() {
        for preset in [LogPreset::Production, LogPreset::Verbose, LogPreset::Debug, LogPreset::Quiet] {
            let config = LogConfig {
                preset,
                format: LogFormat::Text,
            };
            assert!(EnvFilter::try_new(config.directives()).is_ok(), "{preset:?}");
        }
    }
}
