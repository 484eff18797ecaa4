use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use littlelemon_rs::{
    create_app, init_observability, models::StorageBackend, observability::ObservabilityOptions,
    shutdown_observability, Config, Metrics, Services, Storage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration first (basic logging only)
    let config = Config::from_environment()
        .await
        .context("failed to load configuration")?;

    init_observability(ObservabilityOptions {
        service_name: &config.observability.service_name,
        service_version: &config.observability.service_version,
        otlp_endpoint: config.observability.otlp_endpoint.as_deref(),
        log_level: &config.observability.log_level,
        enable_json_logging: config.observability.enable_json_logging,
    })?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );

    let metrics = Arc::new(Metrics::new()?);

    let storage = match (&config.database.storage_backend, &config.aws) {
        (StorageBackend::DynamoDb, Some(aws)) => {
            info!(
                region = %aws.region,
                bookings = %config.database.bookings_table_name,
                menu = %config.database.menu_table_name,
                users = %config.database.users_table_name,
                "Using DynamoDB storage"
            );
            Storage::dynamodb(
                Arc::new(aws.dynamodb_client.clone()),
                &config.database.table_names(),
                &aws.region,
            )
        }
        (StorageBackend::DynamoDb, None) => {
            anyhow::bail!("DynamoDB storage selected but no AWS client was configured")
        }
        (StorageBackend::Memory, _) => {
            info!("Using in-memory storage");
            Storage::in_memory()
        }
    };

    let services = Services::new(&config, &storage).context("failed to initialize services")?;

    if config.database.seed_menu_on_start {
        // Failures are logged only; POST /api/admin/seed can retry
        if let Err(e) = services.menu.seed_sample_menu().await {
            warn!(error = %e, "Failed to seed sample menu");
        }
    }

    let app = create_app(&config, &storage, &services, metrics);

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .with_context(|| format!("invalid host address {}", config.server.host))?,
        config.server.port,
    );
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    shutdown_observability().await;
}
