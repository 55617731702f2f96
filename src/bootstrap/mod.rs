//! Database bootstrap orchestration for the WiseFood API.
//!
//! A bootstrap run is a single deterministic attempt: wait for the server,
//! delegate foreign-schema privileges, apply migrations. Stages run
//! strictly in sequence and the first failure halts the run; re-invocation
//! is left to an external supervisor and every stage is safe to repeat.

pub mod grants;
pub mod migrate;

use crate::config::AppConfig;
use crate::db;
use crate::error::BootstrapError;

/// Runs the full bootstrap sequence: probe → delegate → apply.
pub async fn run(cfg: &AppConfig) -> Result<(), BootstrapError> {
    tracing::info!(
        host = %cfg.postgres_host,
        db = %cfg.postgres_db,
        "starting database bootstrap"
    );

    db::wait_for_database(cfg).await?;
    grants::delegate_foreign_schema(cfg).await?;
    let applied = migrate::apply_all(cfg).await?;

    tracing::info!(applied, "bootstrap complete");
    Ok(())
}
