//! homeauto-api - self-registration loop and probe temperature API.
//!
//! Run with: `cargo run -p homeauto-api -- --config config.yaml`

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use homeauto_api::{AppState, Config, Registration, api, default_config_path};

/// homeauto-api - self-registration loop and probe temperature API.
#[derive(Parser, Debug)]
#[command(name = "homeauto-api")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service-account credentials file (overrides config).
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Serving port (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Disable the registration loop (API only mode).
    #[arg(long)]
    no_registration: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("homeauto_api=info".parse()?)
                .add_directive("homeauto_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Load configuration
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    info!("Loading configuration from {}", config_path.display());
    let mut config = Config::load(&config_path)?;

    // Override config with CLI args
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(credentials) = args.credentials {
        config.registration.credentials_path = credentials;
    }
    if args.no_registration {
        config.registration.enabled = false;
    }
    config.validate()?;

    let state = AppState::from_config(&config)?;
    let cancel = CancellationToken::new();

    // Start the registration loop
    let registration = if config.registration.enabled {
        Some(Registration::from_config(&config)?.start(cancel.clone()))
    } else {
        info!("Registration loop disabled");
        None
    };

    // Build the router
    let app = Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown = cancel.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    });

    tokio::select! {
        result = &mut server => {
            // The server only returns on its own after an I/O failure
            cancel.cancel();
            result??;
            return Ok(());
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, draining connections");
            cancel.cancel();
        }
    }

    let grace = config.server.shutdown_grace();
    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => result??,
        Err(_) => {
            warn!(
                "Connections still open after {}s, shutting down anyway",
                grace.as_secs()
            );
            server.abort();
        }
    }

    if let Some(handle) = registration
        && let Err(e) = handle.await
    {
        error!("Registration task failed: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
