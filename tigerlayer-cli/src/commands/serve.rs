//! Serve command - answer viewport queries over HTTP.

use std::net::SocketAddr;

use tigerlayer::server::{http, TileService};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the serve command.
pub struct ServeArgs {
    pub bind: Option<SocketAddr>,
    pub layer: Option<String>,
}

/// Run the serve command until Ctrl+C or SIGTERM.
pub async fn run(runner: &CliRunner, args: ServeArgs) -> Result<(), CliError> {
    runner.log_startup("serve");

    let mut config = runner.config().clone();
    if let Some(bind) = args.bind {
        config.tile_server.bind = bind;
    }
    if let Some(layer) = args.layer {
        config.tile_server.layer = layer;
    }
    let bind = config.tile_server.bind;

    let service = TileService::from_config(&config);
    // Load boundaries now so a missing file fails at startup
    let boundaries = service.index().load().await?;
    println!(
        "Serving {} ({} tile boundaries) on http://{}",
        service.layer_dir().display(),
        boundaries.len(),
        bind
    );

    let serve_error = |error| CliError::Serve {
        bind: bind.to_string(),
        error,
    };
    let listener = TcpListener::bind(bind).await.map_err(serve_error)?;
    http::serve(listener, service, shutdown_signal())
        .await
        .map_err(serve_error)?;

    info!("Tile server shut down gracefully");
    Ok(())
}

/// Resolves when Ctrl+C or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
    info!("Shutdown signal received");
}
