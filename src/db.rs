//! Database connection management for the WiseFood API.
//!
//! Provides the readiness probe used by bootstrap (bounded-backoff retry
//! loop, no fixed sleeps) and the SeaORM connection pool used by serve
//! mode.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tokio::time::sleep;

use crate::config::AppConfig;
use crate::error::BootstrapError;

/// Opens a single eagerly-established connection. Bootstrap stages hold at
/// most one of these at a time and close it when the stage ends.
pub async fn connect(url: &str) -> Result<DatabaseConnection, sea_orm::DbErr> {
    let mut opt = ConnectOptions::new(url);
    opt.max_connections(1)
        .connect_timeout(Duration::from_secs(5))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    Database::connect(opt).await
}

/// Blocks until the server accepts a trivial connection as the service
/// identity, or the wait budget is exhausted.
///
/// Retries with exponential backoff starting at `db_wait_base_delay_ms`,
/// capped at `db_wait_max_delay_ms`, for at most `db_wait_max_attempts`
/// attempts. Budget exhaustion yields a connectivity-class error distinct
/// from every other failure class.
pub async fn wait_for_database(cfg: &AppConfig) -> Result<(), BootstrapError> {
    let url = cfg.service_url()?;
    let started = Instant::now();
    let max_delay = Duration::from_millis(cfg.db_wait_max_delay_ms);
    let mut delay = Duration::from_millis(cfg.db_wait_base_delay_ms);

    for attempt in 1..=cfg.db_wait_max_attempts {
        match probe(&url).await {
            Ok(()) => {
                tracing::info!(attempt, "database is reachable");
                return Ok(());
            }
            Err(source) => {
                if attempt == cfg.db_wait_max_attempts {
                    return Err(BootstrapError::DatabaseUnavailable {
                        attempts: attempt,
                        elapsed_ms: started.elapsed().as_millis(),
                        source,
                    });
                }
                tracing::warn!(
                    attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %source,
                    "database not ready yet"
                );
                sleep(delay).await;
                delay = (delay * 2).min(max_delay);
            }
        }
    }

    // Unreachable: the loop either returns Ok or errors on the last attempt.
    Err(BootstrapError::DatabaseUnavailable {
        attempts: cfg.db_wait_max_attempts,
        elapsed_ms: started.elapsed().as_millis(),
        source: sea_orm::DbErr::Custom("wait budget exhausted".to_string()),
    })
}

async fn probe(url: &str) -> Result<(), sea_orm::DbErr> {
    let conn = connect(url).await?;
    conn.ping().await?;
    conn.close().await
}

/// Initializes the serve-mode connection pool with the service identity.
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection> {
    let url = cfg.service_url().context("building database URL")?;

    let mut opt = ConnectOptions::new(url);
    opt.max_connections(cfg.db_max_connections)
        .acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt)
        .await
        .context("connecting to database")?;
    Ok(db)
}

/// Health check for the database connection.
pub async fn health_check(db: &DatabaseConnection) -> Result<()> {
    db.ping().await.context("database health check failed")?;
    Ok(())
}
