//! Logging Infrastructure
//!
//! Structured logging for the command line tool and the checks, based on the
//! `tracing` and `tracing-subscriber` crates:
//! - Operator friendly level names (`warning`, `critical`) mapped onto tracing levels
//! - Multiple output formats (pretty, compact, JSON)
//! - Environment-based filtering (`RUST_LOG` takes precedence)
//!
//! # Example
//! ```no_run
//! use icotest::{config::Settings, logging};
//! use tracing::info;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load()?;
//! logging::init_from_settings(&settings)?;
//! info!("Checks started");
//! # Ok(())
//! # }
//! ```

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::Settings;
use crate::error::{IcotestError, IcotestResult};

/// Output format for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed format with colors (for development)
    Pretty,
    /// Compact single line format
    Compact,
    /// JSON format for structured logging (for log aggregation)
    Json,
}

/// Logging configuration options
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level
    pub level: Level,
    /// Output format
    pub format: OutputFormat,
    /// Whether to include file and line numbers
    pub with_file_and_line: bool,
    /// Whether to enable ANSI colors (only for Pretty format)
    pub with_ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: OutputFormat::Compact,
            with_file_and_line: false,
            with_ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Create logging config with custom level
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Create logging config from the loaded settings
    pub fn from_settings(settings: &Settings) -> IcotestResult<Self> {
        Ok(Self {
            level: parse_log_level(&settings.logging.level)?,
            format: parse_format(&settings.logging.format)?,
            ..Default::default()
        })
    }

    /// Set output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable ANSI colors
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }
}

/// Initialize logging from the loaded settings
pub fn init_from_settings(settings: &Settings) -> IcotestResult<()> {
    init(LoggingConfig::from_settings(settings)?)
}

/// Initialize logging with custom configuration
///
/// This function is idempotent - if a global subscriber is already set, it
/// returns Ok(()) without error. This makes it safe to call in tests.
pub fn init(config: LoggingConfig) -> IcotestResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_string(config.level)));

    let layer = match config.format {
        OutputFormat::Pretty => fmt::layer()
            .pretty()
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_ansi(config.with_ansi)
            .with_filter(env_filter)
            .boxed(),
        OutputFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_ansi(false)
            .with_filter(env_filter)
            .boxed(),
        OutputFormat::Json => fmt::layer()
            .json()
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .or_else(|e| {
            // Tests and embedding applications may have installed a subscriber already
            if e
                .to_string()
                .contains("a global default trace dispatcher has already been set")
            {
                Ok(())
            } else {
                Err(IcotestError::Configuration(format!(
                    "Failed to initialize logging: {e}"
                )))
            }
        })
}

/// Parse an operator level name into a tracing level
///
/// Accepts the tracing names as well as `warning` and `critical`.
pub fn parse_log_level(level: &str) -> IcotestResult<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" | "critical" => Ok(Level::ERROR),
        _ => Err(IcotestError::Configuration(format!(
            "Invalid log level '{level}'. Must be one of: debug, info, warning, error, critical"
        ))),
    }
}

fn parse_format(format: &str) -> IcotestResult<OutputFormat> {
    match format {
        "pretty" => Ok(OutputFormat::Pretty),
        "compact" => Ok(OutputFormat::Compact),
        "json" => Ok(OutputFormat::Json),
        _ => Err(IcotestError::Configuration(format!(
            "Invalid log format '{format}'. Must be one of: pretty, compact, json"
        ))),
    }
}

/// Convert Level to env filter string
fn level_to_filter_string(level: Level) -> String {
    match level {
        Level::TRACE => "trace".to_string(),
        Level::DEBUG => "debug".to_string(),
        Level::INFO => "info".to_string(),
        Level::WARN => "warn".to_string(),
        Level::ERROR => "error".to_string(),
    }
}
