//! Ordered application of SQL migration files.
//!
//! There is no applied-files ledger: every bootstrap run reapplies every
//! file, so each statement must be idempotent (guarded `IF NOT EXISTS`,
//! catalog-checked `DO` blocks for enum types). Files apply in filename
//! order and the run halts at the first failing file.

use std::fs;
use std::path::{Path, PathBuf};

use sea_orm::ConnectionTrait;

use crate::config::AppConfig;
use crate::db;
use crate::error::BootstrapError;

/// A discovered migration file. The filename establishes application
/// order; the schema-defining file is expected to sort first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    pub name: String,
    pub path: PathBuf,
}

/// Enumerates `*.sql` files directly under `dir`, sorted by filename.
pub fn discover(dir: &Path) -> Result<Vec<MigrationFile>, BootstrapError> {
    if !dir.is_dir() {
        return Err(BootstrapError::MigrationsDirMissing {
            path: dir.to_path_buf(),
        });
    }

    let entries = fs::read_dir(dir).map_err(|source| BootstrapError::MigrationsIo {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| BootstrapError::MigrationsIo {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("sql") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        files.push(MigrationFile {
            name: name.to_string(),
            path,
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Applies every migration file in order as the service identity,
/// stopping at the first failure. Returns the number of files applied.
///
/// An empty migration set is a warning, not an error; a non-empty set
/// missing the schema-defining file is fatal before anything runs.
pub async fn apply_all(cfg: &AppConfig) -> Result<usize, BootstrapError> {
    let files = discover(&cfg.migrations_dir)?;

    if files.is_empty() {
        tracing::warn!(
            dir = %cfg.migrations_dir.display(),
            "no migration files found, nothing to apply"
        );
        return Ok(0);
    }

    if !files.iter().any(|file| file.name == cfg.schema_file) {
        return Err(BootstrapError::SchemaFileMissing {
            path: cfg.migrations_dir.clone(),
            expected: cfg.schema_file.clone(),
        });
    }

    let url = cfg.service_url()?;
    for file in &files {
        let sql = fs::read_to_string(&file.path).map_err(|source| BootstrapError::MigrationsIo {
            path: file.path.clone(),
            source,
        })?;
        apply_one(&url, file, &sql).await?;
        tracing::info!(file = %file.name, "migration applied");
    }

    Ok(files.len())
}

/// Applies a single file's statement batch over a fresh service-identity
/// connection. The batch runs through the simple-query protocol, so a file
/// may hold any number of statements; the engine stops at the first error.
async fn apply_one(url: &str, file: &MigrationFile, sql: &str) -> Result<(), BootstrapError> {
    let conn = db::connect(url)
        .await
        .map_err(|source| BootstrapError::ConnectionLost {
            file: file.name.clone(),
            source,
        })?;

    let outcome = conn.execute_unprepared(sql).await;
    if let Err(err) = conn.close().await {
        tracing::warn!(file = %file.name, error = %err, "failed to close migration connection");
    }

    outcome.map_err(|source| BootstrapError::Migration {
        file: file.name.clone(),
        source,
    })?;
    Ok(())
}
