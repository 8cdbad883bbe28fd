use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use aerobook_api::{app, AppState, Collaborators};
use aerobook_booking::RetryPolicy;
use aerobook_search::{PipelineConfig, PollPolicy};
use aerobook_store::app_config::Config;
use aerobook_store::{DbClient, LogNotifier, PostgresBookingStore, PostgresFlightCatalog, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aerobook_api=debug,aerobook_search=debug,aerobook_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Aerobook API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    if config.database.run_migrations {
        db.migrate().await.context("Failed to run migrations")?;
    }

    let redis = RedisClient::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;

    let collaborators = Collaborators {
        flights: Arc::new(PostgresFlightCatalog::new(db.pool.clone())),
        bookings: Arc::new(PostgresBookingStore::new(db.pool.clone())),
        notifier: Arc::new(LogNotifier::new()),
        cache: Arc::new(redis),
    };

    let search = &config.search;
    let pipeline = PipelineConfig {
        queue_capacity: search.queue_capacity,
        cache_ttl: search.cache_ttl(),
        result_capacity: search.result_capacity,
        result_ttl: search.result_ttl(),
        poll: PollPolicy {
            attempts: search.poll_attempts,
            interval: search.poll_interval(),
        },
    };
    let retry = RetryPolicy::new(
        config.booking.retry_attempts,
        std::time::Duration::from_millis(config.booking.retry_backoff_ms),
    );

    let root = tracing::info_span!("aerobook");
    let (state, worker) = AppState::assemble(collaborators, &pipeline, retry, &root);
    let _worker = worker.spawn();

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}
