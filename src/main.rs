use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod domain;
mod http;
mod metrics;
mod service;
mod store;

use config::AppConfig;
use service::EnrollmentService;
use store::{EnrollmentStore, MemoryEnrollmentStore, PgEnrollmentStore};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,enrollment_api=debug")),
        )
        .init();

    tracing::info!("🚀 Starting enrollment API");

    // === 1. Load configuration from the environment ===
    let config = AppConfig::from_env()?;
    tracing::info!(
        addr = %config.http_addr,
        port = config.http_port,
        durable = config.database_url.is_some(),
        "Configuration loaded"
    );

    // === 2. Select the enrollment store ===
    // DATABASE_URL present: Postgres, with the unique index and conditional
    // UPDATE as the concurrency arbiters. Absent: the in-memory reference
    // store, arbitrated by its single lock.
    let store: Arc<dyn EnrollmentStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to Postgres...");
            Arc::new(PgEnrollmentStore::connect(url).await?)
        }
        None => {
            tracing::info!("No DATABASE_URL set, using in-memory store");
            Arc::new(MemoryEnrollmentStore::new())
        }
    };

    // === 3. Initialize Prometheus metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);
    let registry = Arc::new(metrics.registry().clone());

    // === 4. Wire the service and serve HTTP ===
    let service = Arc::new(EnrollmentService::new(store, metrics));

    http::start_http_server(service, registry, &config.http_addr, config.http_port).await?;

    Ok(())
}
