//! # Websites API Handlers
//!
//! Registration and listing of monitored websites.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{ApiError, TrackingError};
use crate::repositories::WebsiteSummary;
use crate::server::AppState;
use crate::snippet::tracking_code;

/// Request payload for registering a website
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterWebsiteRequest {
    /// Display name; the website id is derived from it
    #[schema(example = "Acme Corp")]
    pub name: String,
    /// Public http(s) URL of the site
    #[schema(example = "https://acme.example")]
    pub url: String,
}

/// Credentials and embed code for a newly registered website
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterWebsiteResponse {
    pub success: bool,
    #[schema(example = "acme-corp")]
    pub website_id: String,
    /// Shown only once
    pub api_key: String,
    /// HTML to paste into every page of the site
    pub tracking_code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebsiteListResponse {
    pub websites: Vec<WebsiteSummary>,
}

/// Register a website and issue its API key
#[utoipa::path(
    post,
    path = "/api/websites/register",
    request_body = RegisterWebsiteRequest,
    responses(
        (status = 201, description = "Website registered", body = RegisterWebsiteResponse),
        (status = 400, description = "Invalid payload or website already registered", body = ApiError),
        (status = 404, description = "Registry disabled in single-site mode", body = ApiError),
        (status = 500, description = "Storage failure", body = ApiError)
    ),
    tag = "websites"
)]
pub async fn register_website(
    State(state): State<AppState>,
    payload: Result<Json<RegisterWebsiteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterWebsiteResponse>), ApiError> {
    if !state.config.registry_enabled() {
        return Err(TrackingError::RegistryDisabled.into());
    }
    let Json(request) = payload?;

    let registered = state
        .websites
        .register(&request.name, &request.url)
        .await
        .map_err(TrackingError::from)?;

    counter!("botwatch_websites_registered_total").increment(1);
    tracing::info!(
        website_id = %registered.website.id,
        url = %registered.website.url,
        "Website registered"
    );

    let tracking_code = tracking_code(
        &state.config.analytics_url,
        &registered.website.id,
        &registered.api_key,
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterWebsiteResponse {
            success: true,
            website_id: registered.website.id,
            api_key: registered.api_key,
            tracking_code,
        }),
    ))
}

/// List registered websites (API keys are never included)
#[utoipa::path(
    get,
    path = "/api/websites",
    responses(
        (status = 200, description = "Registered websites", body = WebsiteListResponse),
        (status = 500, description = "Storage failure", body = ApiError)
    ),
    tag = "websites"
)]
pub async fn list_websites(
    State(state): State<AppState>,
) -> Result<Json<WebsiteListResponse>, ApiError> {
    let websites = state.websites.list().await?;
    Ok(Json(WebsiteListResponse { websites }))
}
