//! CDR Settlement Relay Binary
//!
//! Replays dead-lettered CDR batches to the revenue sharing system.
//!
//! # Usage
//!
//! ```bash
//! # Replay on an interval until Ctrl+C / SIGTERM
//! cargo run --bin cdr-relay
//!
//! # Single pass, e.g. from a cron job
//! RELAY_REPLAY__RUN_ONCE=true cargo run --bin cdr-relay
//! ```
//!
//! # Environment Variables
//!
//! * `RELAY_DATABASE__URL` - PostgreSQL connection string (falls back to `DATABASE_URL`)
//! * `RELAY_SETTLEMENT__BASE_URL` - Revenue sharing base URL
//! * `RELAY_SETTLEMENT__CDR_SOURCE` - Source tag put on every record
//! * `RELAY_SETTLEMENT__STORE_NAME` / `RELAY_SETTLEMENT__ADMIN_ROLE` - Request identity headers
//! * `RELAY_REPLAY__INTERVAL_SECS` - Pause between passes (default: 60)
//! * `RELAY_REPLAY__BATCH_LIMIT` - Dead letters per pass (default: 100)
//! * `RELAY_REPLAY__RUN_ONCE` - Exit after one pass (default: false)
//! * `RELAY_LOG__LEVEL` - Log filter (default: info, overridden by `RUST_LOG`)
//! * `RELAY_LOG__FORMAT` - `pretty` or `json` (default: pretty)

use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::HealthCheckable;
use domain_charging::RevenueSharingAdapter;
use infra_db::{create_pool, run_migrations, PgDeadLetterStore};
use interface_relay::{LogFormat, LogSettings, Relay, RelayConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = load_config()?;
    init_tracing(&config.log);
    config.validate().context("invalid relay configuration")?;

    tracing::info!(
        settlement = %config.settlement.base_url,
        interval_secs = config.replay.interval_secs,
        batch_limit = config.replay.batch_limit,
        run_once = config.replay.run_once,
        "Starting CDR settlement relay"
    );

    let pool = create_pool(&config.database)
        .await
        .context("failed to connect to the dead-letter database")?;
    run_migrations(&pool).await?;

    let settlement = RevenueSharingAdapter::new(config.settlement.clone())
        .context("failed to build the settlement adapter")?;

    let health = settlement.health_check().await;
    tracing::info!(
        status = ?health.status,
        latency_ms = health.latency_ms,
        message = ?health.message,
        "Settlement system health"
    );

    let relay = Relay::new(
        Arc::new(settlement),
        Arc::new(PgDeadLetterStore::new(pool)),
        config.replay.clone(),
    );
    relay.run(shutdown_signal()).await?;

    tracing::info!("Relay shutdown complete");
    Ok(())
}

/// Loads relay configuration from `RELAY_*` variables.
///
/// `DATABASE_URL` applies when `RELAY_DATABASE__URL` is not set.
fn load_config() -> anyhow::Result<RelayConfig> {
    let mut config = RelayConfig::from_env().context("failed to read RELAY_* configuration")?;

    if std::env::var_os("RELAY_DATABASE__URL").is_none() {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
    }

    Ok(config)
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(settings: &LogSettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match settings.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, stopping relay");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, stopping relay");
        }
    }
}
