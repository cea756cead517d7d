//! # Data Models
//!
//! SeaORM entities for registered websites and recorded bot visits, plus the
//! small response types shared by several handlers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod bot_visit;
pub mod website;

pub use bot_visit::Entity as BotVisit;
pub use website::Entity as Website;

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
            service: "botwatch".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
