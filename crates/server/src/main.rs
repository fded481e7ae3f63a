mod config;
mod error;
mod http;
mod service;
mod state;

use anyhow::Context;
use dotenvy::dotenv;
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Settings;
use http::router::build_router;
use service::{InteractionOptions, Interactions};
use state::AppState;

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=debug,storage=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    install_tracing();

    let settings = Settings::new().context("Failed to load configuration")?;

    let interactions = match settings.database.connection_string() {
        Some(url) => {
            let store = storage::connect(url, &settings.database.name)
                .await
                .context("Failed to initialise store")?;
            let interactions = Interactions::new(store, InteractionOptions::from(&settings));
            info!("Store backend: {}", interactions.backend());

            // 驱动是懒连接的，建索引放后台，不阻塞启动
            let warmup = interactions.clone();
            tokio::spawn(async move { warmup.ensure_indexes().await });

            Some(interactions)
        }
        None => {
            warn!("MONGODB_URI not configured; store-backed endpoints will answer 500");
            None
        }
    };

    let state = AppState {
        interactions: interactions.clone(),
    };
    let app = build_router(state, &settings.server.cors_origins);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(interactions) = interactions {
        interactions.shutdown().await;
    }
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
