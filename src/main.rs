//! Lectoria sweeper daemon.
//!
//! Long-running scheduled job: cancels reservations that were never
//! confirmed within the grace window and deactivates holder accounts past
//! their renewal threshold. All other engine operations are invoked by the
//! REST layer, which links the library crate directly.

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lectoria_core::{config::AppConfig, repository::Repository, services::Services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("lectoria_core={}", config.logging.level).into());

    // The guard must outlive the subscriber; dropping it stops the writer.
    let (file_layer, _guard) = match &config.logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "lectoria-sweeper.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    tracing::info!("Starting Lectoria sweeper v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    let repository = Arc::new(Repository::new(pool));
    let services = Services::new(repository, &config);

    tracing::info!(
        "Sweeping every {}s (grace window {} days, holder renewal threshold {} days)",
        config.sweeper.interval_secs,
        config.sweeper.grace_days,
        config.sweeper.holder_renewal_days
    );

    tokio::select! {
        _ = services.sweeper.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
