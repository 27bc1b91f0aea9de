//! Log setup for the keyward CLI
//!
//! Everything is written to stderr: stdout carries secret payloads and must
//! stay byte-exact.

use std::io;
use std::sync::OnceLock;
pub use tracing::Level;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};
use uuid::Uuid;

/// Shape of log lines on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TracingFormat {
    /// Multi-line, human-oriented
    Pretty,
    /// One line per event (default)
    Compact,
    /// One JSON object per event, for CI log collectors
    Json,
    /// Source file and line on every event
    Dev,
}

/// `-L/--level` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Trace
    Trace,
    /// Debug, shows which tier answered each lookup
    Debug,
    /// Info
    Info,
    /// Warn (default)
    Warn,
    /// Error
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Subscriber settings chosen on the command line
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Line format
    pub format: TracingFormat,
    /// Level applied to the keyward crates when `RUST_LOG` is unset
    pub level: Level,
    /// Explicit directive, taking precedence over `RUST_LOG` and `level`
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: TracingFormat::Compact,
            level: Level::WARN,
            filter: None,
        }
    }
}

static CORRELATION_ID: OnceLock<Uuid> = OnceLock::new();

/// Identifier shared by every event of this process
pub fn correlation_id() -> Uuid {
    *CORRELATION_ID.get_or_init(Uuid::new_v4)
}

/// Directive enabling `level` for the CLI and the resolver library only
#[must_use]
pub fn default_directive(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("keyward={level},keyward_secrets={level}")
}

fn build_filter(config: &TracingConfig) -> Result<EnvFilter, String> {
    if let Some(directive) = &config.filter {
        return EnvFilter::try_new(directive).map_err(|e| e.to_string());
    }
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_directive(config.level)).map_err(|e| e.to_string()),
    }
}

fn fmt_layer(format: TracingFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);
    match format {
        TracingFormat::Pretty => layer.pretty().with_thread_names(true).boxed(),
        TracingFormat::Compact => layer.compact().with_target(false).boxed(),
        TracingFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        TracingFormat::Dev => layer
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .boxed(),
    }
}

/// Install the global subscriber.
///
/// # Errors
/// Returns error if the filter directive does not parse or a subscriber is
/// already installed.
pub fn init_tracing(config: TracingConfig) -> miette::Result<()> {
    let filter = build_filter(&config).map_err(|e| miette::miette!("Invalid log filter: {e}"))?;

    tracing_subscriber::registry()
        .with(fmt_layer(config.format).with_filter(filter))
        .try_init()
        .map_err(|e| miette::miette!("Failed to install log subscriber: {e}"))?;

    tracing::debug!(
        correlation_id = %correlation_id(),
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        "Logging ready"
    );
    Ok(())
}

/// Span wrapping one command execution
#[must_use]
pub fn command_span(command: &str) -> tracing::Span {
    tracing::info_span!(
        "command",
        command = %command,
        correlation_id = %correlation_id(),
    )
}
