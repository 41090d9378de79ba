use proxy_server::{build_state, config, create_router};
use std::net::SocketAddr;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv = dotenvy::dotenv();
    let config = config::Config::from_env();
    common::tracing::init_with_format(&config.log_format);

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }
    config.log_key_status();

    let cancellation_token = CancellationToken::new();
    let state = build_state(&config)?;

    if config.warm_cache {
        let countries = state.countries.clone();
        let cancel = cancellation_token.clone();
        info!("Prefilling country cache on startup...");
        tokio::spawn(async move {
            tokio::select! {
                _ = countries.warm() => {},
                _ = cancel.cancelled() => warn!("Country cache warm-up cancelled"),
            }
        });
    }

    let app = create_router(state, &config.allowed_origins);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Proxy server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancellation_token))
        .await?;

    info!("Proxy server stopped");
    Ok(())
}

async fn shutdown_signal(cancellation_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => {
            info!("Received SIGINT, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }

    // Stop background cache work
    cancellation_token.cancel();
    warn!("Cancelled background tasks, shutting down gracefully...");
}
