//! # Data Models
//!
//! Shared response models for the serve-mode surface. The application's
//! relational entities live in the SQL migration files; the orchestrator
//! does not map them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "wisefood-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
