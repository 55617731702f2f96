//! # Error Handling
//!
//! Bootstrap failure taxonomy for the WiseFood API. Each class maps to a
//! distinct process exit code so an external supervisor can tell
//! misconfiguration apart from transient connectivity apart from bad
//! migration content.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Exit code for a run that completed (including an empty migration set).
pub const EXIT_OK: i32 = 0;
/// Exit code for an invalid environment or configuration.
pub const EXIT_CONFIG: i32 = 1;
/// Exit code for a missing migration source (directory or schema file).
pub const EXIT_MIGRATION_SOURCE: i32 = 2;
/// Exit code for a database that never became reachable.
pub const EXIT_UNREACHABLE: i32 = 3;
/// Exit code for a failed privilege grant.
pub const EXIT_GRANT: i32 = 4;
/// Exit code for a failed migration statement.
pub const EXIT_MIGRATION: i32 = 5;

/// Errors halting a bootstrap run. One variant per failure class; stages
/// after the failing one never run.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database unreachable after {attempts} attempts over {elapsed_ms}ms: {source}")]
    DatabaseUnavailable {
        attempts: u32,
        elapsed_ms: u128,
        source: sea_orm::DbErr,
    },

    #[error("lost database connection while applying '{file}': {source}")]
    ConnectionLost { file: String, source: sea_orm::DbErr },

    #[error("privilege grant failed ({statement}): {source}")]
    Grant {
        statement: String,
        source: sea_orm::DbErr,
    },

    #[error("migrations directory {path} does not exist")]
    MigrationsDirMissing { path: PathBuf },

    #[error("failed to read migration source {path}: {source}")]
    MigrationsIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("schema-defining file '{expected}' not found in {path}")]
    SchemaFileMissing { path: PathBuf, expected: String },

    #[error("migration '{file}' failed: {source}")]
    Migration { file: String, source: sea_orm::DbErr },
}

impl BootstrapError {
    /// Process exit code for this failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            BootstrapError::Config(_) => EXIT_CONFIG,
            BootstrapError::DatabaseUnavailable { .. } | BootstrapError::ConnectionLost { .. } => {
                EXIT_UNREACHABLE
            }
            BootstrapError::Grant { .. } => EXIT_GRANT,
            BootstrapError::MigrationsDirMissing { .. }
            | BootstrapError::MigrationsIo { .. }
            | BootstrapError::SchemaFileMissing { .. } => EXIT_MIGRATION_SOURCE,
            BootstrapError::Migration { .. } => EXIT_MIGRATION,
        }
    }
}
