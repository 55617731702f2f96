//! Integration tests for the bootstrap orchestrator.
//!
//! These tests use testcontainers to spin up a real Postgres instance,
//! provision what the deployment environment normally provides (the
//! service role and the identity provider's schema), and then drive the
//! probe → delegate → apply sequence end to end.

use std::path::PathBuf;

use sea_orm::{ConnectionTrait, Statement};
use testcontainers::{ContainerAsync, core::IntoContainerPort, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;

use wisefood::{bootstrap, config::AppConfig, db, error::BootstrapError};

async fn start_database() -> anyhow::Result<(ContainerAsync<Postgres>, AppConfig)> {
    let container = Postgres::default().start().await?;
    let port = container.get_host_port_ipv4(5432.tcp()).await?;

    let mut config = AppConfig::default();
    config.postgres_host = "127.0.0.1".to_string();
    config.postgres_port = port;
    config.postgres_db = "postgres".to_string();
    config.db_wait_max_attempts = 30;
    config.db_wait_base_delay_ms = 100;
    config.db_wait_max_delay_ms = 1000;
    config.migrations_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations");

    Ok((container, config))
}

/// Waits for the container using the superuser identity; the service role
/// does not exist until [`provision`] creates it.
async fn wait_as_root(config: &AppConfig) -> anyhow::Result<()> {
    let mut probe = config.clone();
    probe.postgres_user = config.postgres_root_user.clone();
    probe.postgres_password = config.postgres_root_password.clone();
    db::wait_for_database(&probe).await?;
    Ok(())
}

/// Creates the service role and, optionally, the identity provider's
/// schema with its user table.
async fn provision(config: &AppConfig, with_foreign_schema: bool) -> anyhow::Result<()> {
    wait_as_root(config).await?;

    let root = db::connect(&config.root_url()?).await?;
    root.execute_unprepared("CREATE ROLE wisefood LOGIN PASSWORD 'wisefood'")
        .await?;
    root.execute_unprepared(&format!(
        "GRANT CREATE ON DATABASE \"{}\" TO wisefood",
        config.postgres_db
    ))
    .await?;
    if with_foreign_schema {
        root.execute_unprepared("CREATE SCHEMA keycloak").await?;
        root.execute_unprepared(
            "CREATE TABLE keycloak.user_entity (\
             id VARCHAR(36) PRIMARY KEY, \
             username VARCHAR(255), \
             email VARCHAR(255))",
        )
        .await?;
    }
    root.close().await?;
    Ok(())
}

async fn count(conn: &sea_orm::DatabaseConnection, sql: &str) -> anyhow::Result<i64> {
    let stmt = Statement::from_string(conn.get_database_backend(), sql.to_string());
    let row = conn.query_one(stmt).await?.expect("count row");
    Ok(row.try_get("", "n")?)
}

#[tokio::test]
async fn bootstrap_twice_yields_the_same_schema() -> anyhow::Result<()> {
    let (_container, config) = start_database().await?;
    provision(&config, true).await?;

    bootstrap::run(&config).await?;
    // The second run reapplies every file; guarded DDL must not trip
    // duplicate-object errors, enum types included.
    bootstrap::run(&config).await?;

    let service = db::connect(&config.service_url()?).await?;
    let tables = count(
        &service,
        "SELECT count(*)::bigint AS n FROM information_schema.tables \
         WHERE table_schema = 'wisefood'",
    )
    .await?;
    assert_eq!(tables, 5);

    let types = count(
        &service,
        "SELECT count(*)::bigint AS n FROM pg_type t \
         JOIN pg_namespace ns ON ns.oid = t.typnamespace \
         WHERE ns.nspname = 'wisefood' \
         AND t.typname IN ('age_groups', 'dietary_groups')",
    )
    .await?;
    assert_eq!(types, 2);

    service.close().await?;
    Ok(())
}

#[tokio::test]
async fn foreign_schema_access_is_read_and_reference_only() -> anyhow::Result<()> {
    let (_container, config) = start_database().await?;
    provision(&config, true).await?;
    bootstrap::run(&config).await?;

    let root = db::connect(&config.root_url()?).await?;
    root.execute_unprepared(
        "INSERT INTO keycloak.user_entity (id, username, email) \
         VALUES ('u-1', 'alice', 'alice@wisefood.gr')",
    )
    .await?;

    let service = db::connect(&config.service_url()?).await?;

    // Reads are allowed.
    let stmt = Statement::from_string(
        service.get_database_backend(),
        "SELECT id FROM keycloak.user_entity".to_string(),
    );
    let rows = service.query_all(stmt).await?;
    assert_eq!(rows.len(), 1);

    // Writes are not.
    let denied = service
        .execute_unprepared("INSERT INTO keycloak.user_entity (id) VALUES ('u-2')")
        .await;
    assert!(
        denied.is_err(),
        "service identity must not write the foreign schema"
    );
    let denied = service
        .execute_unprepared("DELETE FROM keycloak.user_entity WHERE id = 'u-1'")
        .await;
    assert!(denied.is_err());

    // REFERENCES works: the household owner FK accepts the account row...
    service
        .execute_unprepared(
            "INSERT INTO wisefood.household (id, name, owner_id) \
             VALUES ('h-1', 'Home', 'u-1')",
        )
        .await?;

    // ...and deleting the account nulls the owner instead of cascading.
    root.execute_unprepared("DELETE FROM keycloak.user_entity WHERE id = 'u-1'")
        .await?;
    let stmt = Statement::from_string(
        service.get_database_backend(),
        "SELECT owner_id FROM wisefood.household WHERE id = 'h-1'".to_string(),
    );
    let row = service.query_one(stmt).await?.expect("household row");
    let owner: Option<String> = row.try_get("", "owner_id")?;
    assert!(owner.is_none());

    service.close().await?;
    root.close().await?;
    Ok(())
}

#[tokio::test]
async fn a_failing_file_halts_the_run_before_later_files() -> anyhow::Result<()> {
    let (_container, mut config) = start_database().await?;
    provision(&config, true).await?;

    let dir = tempfile::TempDir::new()?;
    std::fs::write(
        dir.path().join("10_wisefood.sql"),
        "CREATE SCHEMA IF NOT EXISTS wisefood;\n\
         CREATE TABLE IF NOT EXISTS wisefood.first_marker (id INT PRIMARY KEY);\n",
    )?;
    std::fs::write(dir.path().join("15_broken.sql"), "CREATE TABLE wisefood.broken (\n")?;
    std::fs::write(
        dir.path().join("20_third.sql"),
        "CREATE TABLE IF NOT EXISTS wisefood.third_marker (id INT PRIMARY KEY);\n",
    )?;
    config.migrations_dir = dir.path().to_path_buf();

    let err = bootstrap::run(&config)
        .await
        .expect_err("second file is invalid");
    match &err {
        BootstrapError::Migration { file, .. } => assert_eq!(file, "15_broken.sql"),
        other => panic!("expected Migration error, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 5);

    let service = db::connect(&config.service_url()?).await?;
    let applied = count(
        &service,
        "SELECT count(*)::bigint AS n FROM information_schema.tables \
         WHERE table_schema = 'wisefood' \
         AND table_name IN ('first_marker', 'third_marker')",
    )
    .await?;
    assert_eq!(applied, 1, "first file applied, third never ran");

    service.close().await?;
    Ok(())
}

#[tokio::test]
async fn empty_migration_set_succeeds() -> anyhow::Result<()> {
    let (_container, mut config) = start_database().await?;
    provision(&config, true).await?;

    let dir = tempfile::TempDir::new()?;
    config.migrations_dir = dir.path().to_path_buf();

    bootstrap::run(&config).await?;
    Ok(())
}

#[tokio::test]
async fn missing_foreign_schema_fails_the_grant_stage() -> anyhow::Result<()> {
    let (_container, config) = start_database().await?;
    provision(&config, false).await?;

    let err = bootstrap::run(&config)
        .await
        .expect_err("grant target absent");
    assert!(matches!(err, BootstrapError::Grant { .. }));
    assert_eq!(err.exit_code(), 4);

    // The applier never ran: the target schema was not created.
    let root = db::connect(&config.root_url()?).await?;
    let schemas = count(
        &root,
        "SELECT count(*)::bigint AS n FROM information_schema.schemata \
         WHERE schema_name = 'wisefood'",
    )
    .await?;
    assert_eq!(schemas, 0);

    root.close().await?;
    Ok(())
}
