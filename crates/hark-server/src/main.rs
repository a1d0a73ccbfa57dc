//! hark-server - HTTP host adapter binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use hark_core::HarkConfig;
use hark_server::{create_server, AppState};
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(Level::INFO.into())
        .add_directive("hark_server=debug".parse()?)
        .add_directive("hark_core=debug".parse()?);

    if std::env::var("HARK_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
    Ok(())
}

/// `HARK_CONFIG` wins, then `~/.hark/config.toml` if present, then env overlays on defaults.
fn load_config() -> anyhow::Result<HarkConfig> {
    if let Ok(path) = std::env::var("HARK_CONFIG") {
        let path = PathBuf::from(path);
        info!(path = %path.display(), "Loading config");
        return HarkConfig::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }

    let default = HarkConfig::default_path();
    if default.exists() {
        info!(path = %default.display(), "Loading config");
        return HarkConfig::from_file(&default)
            .with_context(|| format!("failed to load config from {}", default.display()));
    }

    info!("No config file, using defaults");
    let config = HarkConfig::from_env();
    config.validate()?;
    Ok(config)
}

fn admins_from_env() -> Vec<String> {
    std::env::var("HARK_ADMINS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing()?;

    let host = std::env::var("HARK_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("HARK_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .context("HARK_PORT must be a valid port number")?;

    let config = load_config()?;
    let admins = admins_from_env();
    info!(admins = admins.len(), "Building pipeline");

    let state = AppState::new(config, admins)?;
    info!(steps = ?state.pipeline().step_names(), "Pipeline ready");

    let app = create_server(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting hark-server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received");
        })
        .await?;

    info!("Server stopped cleanly");
    Ok(())
}
