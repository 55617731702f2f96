//! # Server Configuration
//!
//! Serve-mode HTTP surface for the WiseFood API. Bootstrap never goes
//! through this module, and this module never sees the superuser
//! credentials.

use axum::{Router, http::HeaderValue, routing::get};
use sea_orm::DatabaseConnection;
use tower_http::{cors::AllowOrigin, cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::handlers;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState, config: &AppConfig) -> Router {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(AllowOrigin::list(origins)))
        .layer(TraceLayer::new_for_http())
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    // Warm-up check before binding, mirroring the bootstrap probe contract:
    // do not advertise a listener backed by an unreachable database.
    crate::db::health_check(&db).await?;
    tracing::info!("database connection OK");

    let state = AppState { db };
    let app = create_app(state, &config);

    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
        )
    ),
    info(
        title = "WiseFood API",
        description = "Household and nutrition API",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
