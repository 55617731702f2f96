//! Privilege delegation on the identity provider's schema.
//!
//! The only code path that connects with the superuser identity. It grants
//! the service identity just enough on the foreign schema to read rows and
//! declare foreign keys into it; write access is never granted.

use sea_orm::{ConnectionTrait, DatabaseConnection};

use crate::config::AppConfig;
use crate::db;
use crate::error::BootstrapError;

/// Grants the service identity read/reference access to the foreign
/// schema, connecting once as the superuser and executing exactly two
/// grants with stop-on-first-error semantics.
///
/// GRANT is idempotent in Postgres, so re-running never needs an
/// existence check.
pub async fn delegate_foreign_schema(cfg: &AppConfig) -> Result<(), BootstrapError> {
    let schema = quote_ident(&cfg.foreign_schema);
    let grantee = quote_ident(&cfg.postgres_user);
    let statements = [
        format!("GRANT ALL PRIVILEGES ON SCHEMA {schema} TO {grantee}"),
        format!("GRANT SELECT, REFERENCES ON ALL TABLES IN SCHEMA {schema} TO {grantee}"),
    ];

    tracing::info!(
        schema = %cfg.foreign_schema,
        grantee = %cfg.postgres_user,
        "delegating foreign-schema privileges"
    );

    let url = cfg.root_url()?;
    let root = db::connect(&url)
        .await
        .map_err(|source| BootstrapError::Grant {
            statement: format!("connect as '{}'", cfg.postgres_root_user),
            source,
        })?;

    let outcome = run_grants(&root, &statements).await;
    if let Err(err) = root.close().await {
        tracing::warn!(error = %err, "failed to close superuser connection");
    }
    outcome
}

async fn run_grants(
    root: &DatabaseConnection,
    statements: &[String],
) -> Result<(), BootstrapError> {
    for statement in statements {
        root.execute_unprepared(statement)
            .await
            .map_err(|source| BootstrapError::Grant {
                statement: statement.clone(),
                source,
            })?;
        tracing::debug!(statement = %statement, "grant applied");
    }
    Ok(())
}

/// Quotes an identifier for interpolation into DDL.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
