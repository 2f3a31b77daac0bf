//! Logging configuration utilities.
//!
//! Sets up the tracing-based logging used across the workspace.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Trace level - very verbose.
    Trace,
    /// Debug level - debug information.
    Debug,
    /// Info level - general information.
    #[default]
    Info,
    /// Warn level - warnings.
    Warn,
    /// Error level - errors only.
    Error,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("invalid log level: {s}")),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// The minimum log level.
    pub level: LogLevel,
    /// Whether to include the target (module path).
    pub target: bool,
    /// Whether to output in JSON format.
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            target: true,
            json: false,
        }
    }
}

impl LogConfig {
    /// Creates a new log configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level.
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Enables or disables target (module path) output.
    #[must_use]
    pub const fn with_target(mut self, enabled: bool) -> Self {
        self.target = enabled;
        self
    }

    /// Enables or disables JSON output format.
    #[must_use]
    pub const fn with_json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }
}

/// Initializes the logging system with the given configuration.
///
/// # Panics
///
/// Panics if a global subscriber has already been installed.
pub fn init(config: &LogConfig) {
    let filter = EnvFilter::new(config.level.to_string());

    if config.json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(config.target));
        tracing::subscriber::set_global_default(subscriber)
            .expect("failed to set global subscriber");
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(config.target));
        tracing::subscriber::set_global_default(subscriber)
            .expect("failed to set global subscriber");
    }
}

/// Tries to initialize logging, ignoring the error if a subscriber is
/// already installed. Useful in tests.
pub fn try_init(config: &LogConfig) {
    let filter = EnvFilter::new(config.level.to_string());

    if config.json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(config.target));
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(config.target));
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}
