//! Structured diagnostics via `tracing`.
//!
//! Everything goes to stderr so that stdout stays reserved for reports and
//! `--json` output. `RUST_LOG` wins over the configured level when set.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One line per event.
    #[default]
    Compact,
    /// Multi-line, human-readable.
    Pretty,
    /// Machine-readable JSON lines.
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Explicit filter directives (e.g. `refl_fisher::fit=debug`); overrides `level`.
    pub filter: Option<String>,
}

impl LogConfig {
    /// Directive string handed to `EnvFilter` when `RUST_LOG` is unset.
    pub fn directives(&self) -> String {
        self.filter
            .clone()
            .unwrap_or_else(|| self.level.to_string())
    }
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed (tests, repeated
/// calls); the existing one stays in place.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.directives()))
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_quiet() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.directives(), "warn");
    }

    #[test]
    fn explicit_filter_overrides_level() {
        let config = LogConfig {
            level: LogLevel::Error,
            filter: Some("refl_fisher::fit=debug".to_string()),
            ..LogConfig::default()
        };
        assert_eq!(config.directives(), "refl_fisher::fit=debug");
    }

    #[test]
    fn second_init_is_ignored() {
        let config = LogConfig::default();
        let _ = init_logging(&config);
        assert!(!init_logging(&config));
    }

    #[test]
    fn level_serializes_lowercase() {
        let json = serde_json::to_string(&LogLevel::Debug).unwrap();
        assert_eq!(json, "\"debug\"");
    }
}
