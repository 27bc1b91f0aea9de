use clap::{ArgGroup, Args, Parser, Subcommand};
use keyward_secrets::{ConfigError, SecretError, SecretErrorKind, StoreError};
use miette::{Diagnostic, Report};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Secret resolution failure exit code
pub const EXIT_RESOLVE: i32 = 3;
/// Secret not found exit code
pub const EXIT_NOT_FOUND: i32 = 4;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("CLI/configuration error: {message}")]
    #[diagnostic(code(keyward::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// No tier produced the secret (exit code 4)
    #[error("{message}")]
    #[diagnostic(code(keyward::secret::not_found))]
    NotFound {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Resolution failed for another reason (exit code 3)
    #[error("Resolution error: {message}")]
    #[diagnostic(code(keyward::secret::resolve))]
    Resolve {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Other unexpected error (exit code 3)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(keyward::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }

    /// Add help text to an existing error, returning a new error with the help text set.
    #[must_use]
    pub fn with_help(self, help_text: impl Into<String>) -> Self {
        let help = Some(help_text.into());
        match self {
            Self::Config { message, .. } => Self::Config { message, help },
            Self::NotFound { message, .. } => Self::NotFound { message, help },
            Self::Resolve { message, .. } => Self::Resolve { message, help },
            Self::Other { message, .. } => Self::Other { message, help },
        }
    }

    /// Short machine-readable code used in JSON error envelopes
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::NotFound { .. } => "not_found",
            Self::Resolve { .. } => "resolve",
            Self::Other { .. } => "other",
        }
    }
}

/// Convert a resolution failure to the matching `CliError` variant.
///
/// - `NotFound` -> NotFound (exit code 4)
/// - transport, store, size and request construction failures -> Resolve (exit code 3)
impl From<SecretError> for CliError {
    fn from(err: SecretError) -> Self {
        let message = err.to_string();
        let help = match err.kind() {
            SecretErrorKind::NotFound => {
                return Self::NotFound {
                    message,
                    help: Some(
                        "Check the identifier, or set --server/SECRET_SERVER to enable the secret server fallback"
                            .to_string(),
                    ),
                };
            }
            SecretErrorKind::Transport => "Check that the secret server is reachable",
            SecretErrorKind::Store => "Check the local secret store configuration and permissions",
            SecretErrorKind::InvalidSize => "Secrets are limited to 500 KiB",
            SecretErrorKind::RequestConstruction => {
                "Check the server address, token and secret identifier"
            }
        };
        Self::Resolve {
            message,
            help: Some(help.to_string()),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::config(err.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::config_with_help(
            format!("Failed to load local secret store: {err}"),
            "--secrets-file expects a JSON object mapping identifiers to strings",
        )
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::NotFound { .. } => EXIT_NOT_FOUND,
        CliError::Resolve { .. } | CliError::Other { .. } => EXIT_RESOLVE,
    }
}

/// Render error appropriately based on JSON flag
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": err.code(),
            "message": err.to_string()
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Resolve build secrets from a local store with a secret server fallback.
#[derive(Parser, Debug)]
#[command(name = "keyward")]
#[command(about = "Resolve build secrets from a local store with a secret server fallback")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: crate::tracing::LogLevel,

    /// Log output format.
    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: crate::tracing::TracingFormat,

    /// Emit JSON envelope instead of plain text.
    #[arg(long, global = true, help = "Emit JSON envelope instead of plain text")]
    pub json: bool,

    /// Where secrets are looked up.
    #[command(flatten)]
    pub source: SourceArgs,
}

/// Local store and secret server options.
#[derive(Args, Debug, Clone, Default)]
#[command(group(
    ArgGroup::new("local_store")
        .args(["secrets_file", "secrets_dir", "env_prefix"])
        .multiple(false)
))]
pub struct SourceArgs {
    /// Secret server base address.
    #[arg(
        long,
        env = "SECRET_SERVER",
        value_name = "URL",
        help = "Secret server base address (empty disables the fallback)"
    )]
    pub server: Option<String>,

    /// Secret server auth token.
    #[arg(
        long,
        env = "SECRET_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true,
        help = "Token sent in the 'auth' header"
    )]
    pub token: Option<String>,

    /// Secret server request timeout in seconds.
    #[arg(
        long,
        env = "KEYWARD_TIMEOUT",
        value_name = "SECS",
        help = "Secret server request timeout in seconds"
    )]
    pub timeout: Option<u64>,

    /// JSON file used as the local store.
    #[arg(
        long,
        value_name = "PATH",
        help = "JSON object of identifier -> secret used as the local store"
    )]
    pub secrets_file: Option<PathBuf>,

    /// Directory used as the local store.
    #[arg(
        long,
        value_name = "PATH",
        help = "Directory holding one file per secret, used as the local store"
    )]
    pub secrets_dir: Option<PathBuf>,

    /// Environment variable prefix used as the local store.
    #[arg(
        long,
        value_name = "PREFIX",
        help = "Read secrets from environment variables named <PREFIX><ID>"
    )]
    pub env_prefix: Option<String>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a secret and write its payload.
    #[command(about = "Resolve a secret and write its raw payload to stdout or a file")]
    Get {
        /// Identifier of the secret.
        #[arg(value_name = "ID")]
        id: String,
        /// File to write the payload to instead of stdout.
        #[arg(
            long,
            short = 'o',
            value_name = "PATH",
            help = "Write the payload to this file (mode 0600) instead of stdout"
        )]
        output: Option<PathBuf>,
    },
    /// Resolve secrets and report their sizes.
    #[command(about = "Resolve secrets and report their sizes without printing them")]
    Check {
        /// Identifiers of the secrets.
        #[arg(value_name = "ID", required = true)]
        ids: Vec<String>,
    },
    /// Show version information.
    #[command(about = "Show version information")]
    Version,
}

impl Commands {
    /// Command name used for log spans
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Get { .. } => "get",
            Self::Check { .. } => "check",
            Self::Version => "version",
        }
    }
}

/// Parse command-line arguments, exiting on usage errors
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
