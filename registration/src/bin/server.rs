//! INFEST 2K25 registration server.
//!
//! This binary:
//! - Loads configuration from the environment (and `.env` if present)
//! - Connects to `PostgreSQL` and runs migrations
//! - Wires the SMTP notifier and QR code generator into the service
//! - Serves the HTTP API until Ctrl+C
//!
//! # Usage
//!
//! ```bash
//! # Start PostgreSQL
//! docker run -d -p 5432:5432 -e POSTGRES_PASSWORD=postgres \
//!     -e POSTGRES_DB=infest_db postgres:16
//!
//! # Run server
//! cargo run --bin server
//! ```

use anyhow::Context;
use infest_registration::notify::SmtpNotifier;
use infest_registration::server::{build_router, AppState};
use infest_registration::{
    metrics, Config, PaymentWebhookHandler, PostgresRegistrationStore, QrCodeGenerator,
    RegistrationService,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,infest_registration=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting INFEST 2K25 registration server...");

    let config = Config::from_env();
    tracing::info!(
        postgres = %config.database.url.split('@').next_back().unwrap_or("unknown"),
        smtp = %config.smtp.host,
        qr_code_dir = %config.storage.qr_code_dir.display(),
        "Configuration loaded"
    );

    // Metrics
    metrics::register_metrics();
    if let Some(port) = config.server.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install Prometheus exporter")?;
        tracing::info!(%addr, "Prometheus exporter listening");
    }

    // Database
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout))
        .connect(&config.database.url)
        .await
        .context("failed to connect to PostgreSQL")?;
    let store = PostgresRegistrationStore::new(pool);
    store.migrate().await?;
    tracing::info!("✓ Database ready");

    // Email
    if !config.smtp.has_credentials() {
        tracing::warn!("EMAIL_USER or EMAIL_PASS not set, confirmation emails will fail");
    }
    let notifier = SmtpNotifier::new(&config.smtp)?;

    let store = Arc::new(store);
    let service = RegistrationService::new(
        store.clone(),
        QrCodeGenerator::new(config.storage.qr_code_dir.clone()),
        Arc::new(notifier),
    );
    let webhooks = PaymentWebhookHandler::new(store);
    let app = build_router(AppState::new(service, webhooks));

    let bind = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(address = %bind, "Server is running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}
