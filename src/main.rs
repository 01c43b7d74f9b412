//! boxoffice server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints, plus the
//! expiry sweeper and reminder job.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use boxoffice::api;
use boxoffice::app_state::AppState;
use boxoffice::auth::JwtAuthenticator;
use boxoffice::config::{BoxOfficeConfig, LogFormat};
use boxoffice::domain::{Clock, EventBus, SystemClock};
use boxoffice::persistence::Stores;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BoxOfficeConfig::from_env().context("loading configuration")?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting boxoffice");

    let stores = if config.persistence_enabled {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("connecting to PostgreSQL")?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("running migrations")?;
        tracing::info!("postgres persistence ready");
        Stores::postgres(pool)
    } else {
        tracing::warn!("persistence disabled, state lives in memory only");
        Stores::in_memory()
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let authenticator = Arc::new(JwtAuthenticator::new(config.jwt_secret.as_bytes()));
    let app_state = AppState::new(
        stores,
        EventBus::new(config.event_bus_capacity),
        authenticator,
        clock,
        config.reservation_window(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(
        app_state
            .expiry_sweeper(config.sweep_interval())
            .run(shutdown_rx.clone()),
    );
    let reminders = tokio::spawn(
        app_state
            .reminder_job(config.reminder_interval(), config.reminder_hour_utc)
            .run(shutdown_rx),
    );

    let app = api::build_app(app_state);
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    for (name, task) in [("sweeper", sweeper), ("reminder", reminders)] {
        if let Err(e) = task.await {
            tracing::error!(task = name, error = %e, "background task panicked");
        }
    }
    tracing::info!("shutdown complete");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Plain => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
