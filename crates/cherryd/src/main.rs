// # cherryd - Cherry Servers provider driver
//
// Thin process entry point around cherry-core. It owns no reconciliation
// logic; it only:
// 1. Reads configuration from the environment (and an optional JSON file)
// 2. Initializes logging and the runtime
// 3. Registers the HTTP-backed controllers
// 4. Serves newline-delimited JSON requests from stdin, one response per
//    line on stdout
//
// ## Configuration
//
// - `CHERRY_AUTH_TOKEN`: API token (overrides the config file)
// - `CHERRY_CONFIG_FILE`: JSON provider configuration (optional)
// - `CHERRY_API_URL`: API root (default `https://api.cherryservers.com/v1`)
// - `CHERRY_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Protocol
//
// ```text
// → {"id": 1, "resource": "cherry-servers:index:Project", "operation": "create",
//    "payload": {"name": "web", "inputs": {"team": 148226}}}
// ← {"id": 1, "ok": {"id": "217727", "state": {...}}}
// ```
//
// Besides the lifecycle operations, `schema` returns the resource schema
// and `info` returns the driver name and version. Logs go to stderr.

use anyhow::Result;
use cherry_core::registry::{ErasedResource, Operation, ResourceRegistry};
use cherry_core::{CancelHandle, Context, ProviderConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::env;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum CherryExitCode {
    /// Input exhausted or interrupted
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<CherryExitCode> for ExitCode {
    fn from(code: CherryExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Name and version reported by `info`
#[derive(Debug, Clone, Serialize)]
struct BuildInfo {
    name: &'static str,
    version: &'static str,
}

impl BuildInfo {
    fn current() -> Self {
        Self {
            name: "pulumi-cherry-servers",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Process configuration
struct Config {
    config_file: Option<String>,
    token: Option<String>,
    api_url: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Self {
        Self {
            config_file: env::var("CHERRY_CONFIG_FILE").ok().filter(|s| !s.is_empty()),
            token: env::var(cherry_core::config::TOKEN_ENV_VAR).ok(),
            api_url: env::var("CHERRY_API_URL")
                .unwrap_or_else(|_| cherry_api::CHERRY_API_BASE.to_string()),
            log_level: env::var("CHERRY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("https://") && !self.api_url.starts_with("http://") {
            anyhow::bail!(
                "CHERRY_API_URL must use HTTP or HTTPS scheme. Got: {}",
                self.api_url
            );
        }

        if let Some(path) = &self.config_file
            && !std::path::Path::new(path).is_file()
        {
            anyhow::bail!("CHERRY_CONFIG_FILE does not exist: {}", path);
        }

        parse_log_level(&self.log_level)?;

        Ok(())
    }

    /// Build the provider configuration handed to client factories
    fn provider_config(&self) -> Result<ProviderConfig> {
        let base = match &self.config_file {
            Some(path) => ProviderConfig::from_file(path)?,
            None => ProviderConfig::default(),
        };
        let config = base.with_token_override(self.token.clone());
        config.validate()?;
        Ok(config)
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "CHERRY_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

/// One line of input
#[derive(Debug, Deserialize)]
struct DriverRequest {
    /// Echoed back verbatim
    #[serde(default)]
    id: Value,
    /// Resource type token
    resource: String,
    /// Lifecycle operation, `schema` or `info`
    operation: String,
    #[serde(default)]
    payload: Value,
    /// Per-request deadline
    #[serde(default)]
    timeout_secs: Option<u64>,
}

fn main() -> ExitCode {
    let config = Config::from_env();

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return CherryExitCode::ConfigError.into();
    }

    let provider_config = match config.provider_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return CherryExitCode::ConfigError.into();
        }
    };

    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return CherryExitCode::ConfigError.into();
    }

    let build = BuildInfo::current();
    info!("Starting {} v{}", build.name, build.version);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return CherryExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run(build, provider_config, config.api_url).await {
            error!("Driver error: {}", e);
            CherryExitCode::RuntimeError
        } else {
            CherryExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Serve requests until stdin closes or the process is interrupted
async fn run(build: BuildInfo, config: ProviderConfig, api_url: String) -> Result<()> {
    let registry = ResourceRegistry::new();
    cherry_api::register(&registry, &config, api_url)?;
    info!("Registered resources: {}", registry.tokens().join(", "));

    let (ctx, handle) = Context::with_cancel();
    tokio::spawn(cancel_on_interrupt(handle));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = tokio::select! {
            biased;
            cause = ctx.done() => {
                info!("Stopping: {}", cause);
                return Ok(());
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            info!("Input closed, shutting down");
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_line(&registry, &build, &ctx, &line).await;
        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        stdout.write_all(&encoded).await?;
        stdout.flush().await?;
    }
}

async fn handle_line(
    registry: &ResourceRegistry,
    build: &BuildInfo,
    ctx: &Context,
    line: &str,
) -> Value {
    let request: DriverRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!("Malformed request: {}", e);
            return json!({"id": null, "error": {"kind": "json", "message": e.to_string()}});
        }
    };

    let id = request.id.clone();
    match handle_request(registry, build, ctx, request).await {
        Ok(value) => json!({"id": id, "ok": value}),
        Err(e) => json!({"id": id, "error": {"kind": error_kind(&e), "message": e.to_string()}}),
    }
}

async fn handle_request(
    registry: &ResourceRegistry,
    build: &BuildInfo,
    ctx: &Context,
    request: DriverRequest,
) -> cherry_core::Result<Value> {
    match request.operation.as_str() {
        "info" => return Ok(serde_json::to_value(build)?),
        "schema" => return Ok(serde_json::to_value(registry.get(&request.resource)?.schema())?),
        _ => {}
    }

    let operation: Operation = serde_json::from_value(Value::String(request.operation.clone()))
        .map_err(|_| {
            cherry_core::Error::validation(format!("unknown operation '{}'", request.operation))
        })?;

    let ctx = match request.timeout_secs {
        Some(secs) => ctx.clone().with_timeout(Duration::from_secs(secs)),
        None => ctx.clone(),
    };

    debug!("{} {}", operation, request.resource);
    registry
        .dispatch(&ctx, &request.resource, operation, request.payload)
        .await
}

fn error_kind(err: &cherry_core::Error) -> &'static str {
    use cherry_core::Error;

    match err {
        Error::Validation(_) | Error::InvalidInterval { .. } => "validation",
        Error::Remote(_) => "remote",
        Error::Cancelled(_) => "cancelled",
        Error::Generation(_) => "generation",
        Error::Config(_) => "config",
        Error::UnknownResource(_) => "unknown-resource",
        Error::Json(_) => "json",
        Error::Io(_) | Error::Other(_) => "internal",
    }
}

/// Cancel in-flight work on SIGINT/SIGTERM
async fn cancel_on_interrupt(handle: CancelHandle) {
    match wait_for_signal().await {
        Ok(signal) => {
            info!("Received {}", signal);
            handle.cancel(signal);
        }
        Err(e) => error!("Signal handling unavailable: {}", e),
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_url: &str, log_level: &str) -> Config {
        Config {
            config_file: None,
            token: Some("token".into()),
            api_url: api_url.into(),
            log_level: log_level.into(),
        }
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        assert!(config("ftp://api", "info").validate().is_err());
        assert!(config("https://api.cherryservers.com/v1", "INFO").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_level() {
        assert!(config("https://api", "loud").validate().is_err());
    }

    #[test]
    fn test_missing_token_is_config_error() {
        let mut cfg = config("https://api", "info");
        cfg.token = None;
        assert!(cfg.provider_config().is_err());
    }

    #[tokio::test]
    async fn test_info_and_unknown_operation() {
        let registry = ResourceRegistry::new();
        let build = BuildInfo::current();
        let ctx = Context::background();

        let info = handle_line(
            &registry,
            &build,
            &ctx,
            r#"{"id": 7, "resource": "", "operation": "info"}"#,
        )
        .await;
        assert_eq!(info["id"], 7);
        assert_eq!(info["ok"]["name"], "pulumi-cherry-servers");

        let bad = handle_line(
            &registry,
            &build,
            &ctx,
            r#"{"id": 8, "resource": "x", "operation": "explode"}"#,
        )
        .await;
        assert_eq!(bad["error"]["kind"], "validation");

        let malformed = handle_line(&registry, &build, &ctx, "not json").await;
        assert_eq!(malformed["error"]["kind"], "json");
    }
}
