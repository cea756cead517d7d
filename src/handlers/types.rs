//! # Common API Types
//!
//! Shared query and response types used by several handlers.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::repositories::VisitFilter;

/// Health probe payload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            status: "unavailable".to_string(),
        }
    }
}

/// Optional tenant scope shared by the analytics endpoints
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct WebsiteScopeQuery {
    /// Restrict results to one website; omit (or leave empty) for all websites
    pub website_id: Option<String>,
}

impl WebsiteScopeQuery {
    pub fn filter(&self) -> VisitFilter {
        VisitFilter {
            website_id: self
                .website_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scope_reads_everything() {
        let scope = WebsiteScopeQuery {
            website_id: Some(" ".to_string()),
        };
        assert_eq!(scope.filter(), VisitFilter::default());

        let scope = WebsiteScopeQuery {
            website_id: Some("acme".to_string()),
        };
        assert_eq!(scope.filter(), VisitFilter::for_website("acme"));
    }
}
