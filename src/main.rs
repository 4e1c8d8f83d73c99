use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn};

use event_desk_api::background::scheduler::BackgroundScheduler;
use event_desk_api::notifier::{DiscordNotifier, LogNotifier, Notifier};
use event_desk_api::services::EventStore;
use event_desk_api::{handlers, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "event_desk_api=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting event desk...");

    let config = Arc::new(Config::from_env()?);
    info!("Configuration loaded");

    let store = Arc::new(EventStore::load(&config.data_file).await);

    let notifier: Arc<dyn Notifier> = if config.discord.is_enabled() {
        Arc::new(DiscordNotifier::new(
            config.discord.clone(),
            config.public_base_url.clone(),
        )?)
    } else {
        warn!("DISCORD_TOKEN not set; platform messages will only be logged");
        Arc::new(LogNotifier)
    };
    if config.discord.application_public_key.is_empty() {
        warn!("APPLICATION_PUBLIC_KEY not set; every interaction will be refused");
    }

    let app_state = AppState::new(config.clone(), store, notifier);
    app_state.uploads.ensure().await?;

    let mut scheduler = BackgroundScheduler::new(app_state.start_notifier.clone()).await?;

    let app = handlers::router(app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    // Graceful shutdown
    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutting down gracefully...");
        }
    }
    scheduler.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
