//! Command implementations

use crate::cli::{CliError, Commands, OkEnvelope, SourceArgs};
use keyward_secrets::{
    EnvStore, FileStore, MemoryStore, ResolverConfig, SecretPayload, SecretResolver, SecretStore,
};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{Instrument, debug, info};

/// Size report for one secret, printed by `check`
#[derive(Debug, Clone, Serialize)]
pub struct SecretReport {
    /// Secret identifier
    pub id: String,
    /// Payload length in bytes
    pub bytes: usize,
}

/// Version information printed by `version`
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    /// Crate name
    pub name: &'static str,
    /// Crate version
    pub version: &'static str,
}

impl VersionInfo {
    /// Version of this build
    #[must_use]
    pub const fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Build the local store selected by the command-line flags.
///
/// With no store flag an empty [`MemoryStore`] is used, so every lookup goes
/// to the secret server.
///
/// # Errors
/// Returns error if `--secrets-file` cannot be read or parsed.
pub fn build_store(args: &SourceArgs) -> Result<Arc<dyn SecretStore>, CliError> {
    if let Some(path) = &args.secrets_file {
        let store = MemoryStore::from_json_file(path)?;
        debug!(path = %path.display(), count = store.len(), "Loaded secrets file");
        return Ok(Arc::new(store));
    }
    if let Some(root) = &args.secrets_dir {
        return Ok(Arc::new(FileStore::new(root)));
    }
    if let Some(prefix) = &args.env_prefix {
        return Ok(Arc::new(EnvStore::with_prefix(prefix)));
    }
    Ok(Arc::new(MemoryStore::new()))
}

/// Build the resolver configuration from the command-line flags
#[must_use]
pub fn build_config(args: &SourceArgs) -> ResolverConfig {
    let config = ResolverConfig::new(
        args.server.clone().unwrap_or_default(),
        args.token.clone().unwrap_or_default(),
    );
    match args.timeout {
        Some(secs) => config.with_timeout(Duration::from_secs(secs)),
        None => config,
    }
}

/// Build a resolver from the command-line flags.
///
/// # Errors
/// Returns error if the local store or the HTTP client cannot be created.
pub fn build_resolver(args: &SourceArgs) -> Result<SecretResolver, CliError> {
    let store = build_store(args)?;
    let config = build_config(args);
    let resolver = SecretResolver::new(store, &config)?;
    debug!(resolver = ?resolver, "Resolver ready");
    Ok(resolver)
}

/// Run one parsed command.
///
/// # Errors
/// Returns the first error met while building the resolver or running the command.
pub async fn execute(command: Commands, source: &SourceArgs, json: bool) -> Result<(), CliError> {
    let span = crate::tracing::command_span(command.name());
    async move {
        match command {
            Commands::Get { id, output } => {
                let resolver = build_resolver(source)?;
                execute_get(&resolver, &id, output.as_deref()).await
            }
            Commands::Check { ids } => {
                let resolver = build_resolver(source)?;
                execute_check(&resolver, &ids, json).await
            }
            Commands::Version => execute_version(json),
        }
    }
    .instrument(span)
    .await
}

/// Resolve `id` and write its raw payload to `output`, or stdout when absent.
///
/// # Errors
/// Returns error if resolution fails or the payload cannot be written.
pub async fn execute_get(
    resolver: &SecretResolver,
    id: &str,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let payload = resolver.resolve(id).await?;

    match output {
        Some(path) => {
            write_secret_file(path, &payload).await?;
            info!(secret = %id, path = %path.display(), size = payload.len(), "Wrote secret");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(payload.expose())
                .and_then(|()| stdout.flush())
                .map_err(|e| CliError::other(format!("Failed to write secret to stdout: {e}")))?;
        }
    }
    Ok(())
}

async fn write_secret_file(path: &Path, payload: &SecretPayload) -> Result<(), CliError> {
    let write_err =
        |e: std::io::Error| CliError::other(format!("Failed to write {}: {e}", path.display()));

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await.map_err(write_err)?;
    file.write_all(payload.expose()).await.map_err(write_err)?;
    file.flush().await.map_err(write_err)?;
    Ok(())
}

/// Resolve every identifier and print one `<id>\t<bytes>` line per secret.
///
/// Payloads are never printed. Fails on the first identifier that cannot be
/// resolved.
///
/// # Errors
/// Returns the first resolution error.
pub async fn execute_check(
    resolver: &SecretResolver,
    ids: &[String],
    json: bool,
) -> Result<(), CliError> {
    let batch = resolver.resolve_batch(ids).await?;

    let reports: Vec<SecretReport> = batch
        .ids()
        .filter_map(|id| {
            batch.get(id).map(|payload| SecretReport {
                id: id.to_string(),
                bytes: payload.len(),
            })
        })
        .collect();

    if json {
        print_json(&OkEnvelope::new(reports))?;
    } else {
        for report in &reports {
            println!("{}\t{}", report.id, report.bytes);
        }
    }
    Ok(())
}

/// Print version information.
///
/// # Errors
/// Returns error if the JSON envelope cannot be serialized.
pub fn execute_version(json: bool) -> Result<(), CliError> {
    let info = VersionInfo::current();
    if json {
        print_json(&OkEnvelope::new(info))?;
    } else {
        println!("{} {}", info.name, info.version);
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string(value)
        .map_err(|e| CliError::other(format!("Failed to serialize output: {e}")))?;
    println!("{json}");
    Ok(())
}
