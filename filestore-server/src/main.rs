use anyhow::bail;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use filestore_core::FilestoreConfig;
use filestore_core::endpoint::{LoggingEndpoint, RenderMode};
use filestore_observability::event::STOP_EVENT;
use filestore_observability::{Clock, EventLog, EventRecord};
use filestore_server::{AppState, HttpServer, build_router};

#[derive(Parser, Debug)]
#[command(name = "filestore", version, about = "HTTP file drop with structured event logging")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/filestore/filestore.yaml")]
    config: PathBuf,

    /// Listen address (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Storage directory (overrides config)
    #[arg(long)]
    storage: Option<String>,

    /// Logging endpoint descriptor, e.g. file:///dev/stdout or
    /// fluent://127.0.0.1:24224/filestore (overrides config and the
    /// FILESTORE_LOGGING_ENDPOINT environment variable)
    #[arg(long)]
    logging_endpoint: Option<String>,

    /// Event log render mode for local endpoints: kv or json
    #[arg(long)]
    log_format: Option<String>,

    /// Log level for the service's own diagnostics
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ── Tracing ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    // ── Config: file + FILESTORE_ env, CLI flags win ──
    let mut config = FilestoreConfig::load(&cli.config)?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(storage) = cli.storage {
        config.storage.root = storage;
    }
    if let Some(endpoint) = cli.logging_endpoint {
        config.logging.endpoint = endpoint;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = match format.as_str() {
            "kv" => RenderMode::KeyValue,
            "json" => RenderMode::Json,
            other => bail!("unknown log format '{other}' (expected 'kv' or 'json')"),
        };
    }

    // ── Event log: a bad descriptor or unopenable file is fatal before
    //    the socket ever binds ──
    let endpoint = LoggingEndpoint::parse(&config.logging.endpoint)?;
    let event_log = Arc::new(EventLog::resolve(
        &endpoint,
        config.logging.format,
        config.logging.utc,
        Clock::System,
    )?);

    // ── Application ──
    let state = AppState {
        event_log: Arc::clone(&event_log),
        storage: PathBuf::from(&config.storage.root),
    };
    let app = build_router(state);

    // ── Lifecycle ──
    let server = HttpServer::bind(
        &config.server.host,
        config.server.port,
        Duration::from_millis(config.server.grace_ms),
    )
    .await?;
    info!(
        addr = %server.local_addr()?,
        storage = %config.storage.root,
        endpoint = %config.logging.endpoint,
        "Filestore ready"
    );

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received, stopping...");
                shutdown.cancel();
            }
        });
    }

    server.run(app, shutdown).await?;

    // The socket is closed by now, so the stop event can never appear ahead
    // of a still-draining access entry.
    event_log.emit(EventRecord::new(STOP_EVENT)).await;
    event_log.close().await;
    Ok(())
}
