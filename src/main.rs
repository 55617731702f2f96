//! # WiseFood API Main Entry Point
//!
//! Dispatches between the two invocation modes: `bootstrap` prepares the
//! database and exits; `serve` (the default) runs the HTTP API.

use clap::{Parser, Subcommand};

use wisefood::{
    bootstrap,
    config::ConfigLoader,
    db,
    error::EXIT_CONFIG,
    server::run_server,
    telemetry,
};

#[derive(Parser)]
#[command(
    name = "wisefood-api",
    version,
    about = "WiseFood API service and database bootstrap"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Prepare the database (wait, grant, migrate), then exit
    Bootstrap,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::new().load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(err) = telemetry::init_tracing(&config) {
        eprintln!("failed to initialize telemetry: {err}");
        std::process::exit(EXIT_CONFIG);
    }

    if let Ok(redacted) = config.redacted_json() {
        tracing::info!(profile = %config.profile, "loaded configuration: {redacted}");
    }

    // An explicit subcommand wins over the WISEFOOD_MODE toggle.
    let bootstrap_mode = match (&cli.command, config.mode.as_deref()) {
        (Some(Command::Bootstrap), _) => true,
        (Some(Command::Serve), _) => false,
        (None, Some("bootstrap")) => true,
        (None, _) => false,
    };

    if bootstrap_mode {
        if let Err(err) = bootstrap::run(&config).await {
            tracing::error!(error = %err, "bootstrap failed");
            std::process::exit(err.exit_code());
        }
        return;
    }

    // Serve mode never opens a superuser connection and never reads the
    // migrations directory.
    let db = match db::init_pool(&config).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!(error = %err, "failed to initialize database pool");
            std::process::exit(1);
        }
    };

    if let Err(err) = run_server(config, db).await {
        tracing::error!(error = %err, "server exited with error");
        std::process::exit(1);
    }
}
