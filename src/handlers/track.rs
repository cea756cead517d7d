//! # Beacon Handler
//!
//! `POST /api/track`, called by the script embedded in tenant pages.

use axum::{
    extract::{State, rejection::JsonRejection},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::client_ip::ClientIp;
use crate::error::ApiError;
use crate::ingestion::{TrackOutcome, VisitSignal};
use crate::server::AppState;

/// Beacon payload
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct TrackRequest {
    /// Registered website id (ignored in single-site mode)
    #[schema(example = "acme")]
    pub website_id: Option<String>,
    /// API key issued at registration (ignored in single-site mode)
    pub api_key: Option<String>,
    /// Visitor user agent as seen by the page
    #[schema(example = "Mozilla/5.0 (compatible; GPTBot/1.0)")]
    pub user_agent: Option<String>,
    /// Client address; filled from forwarding headers when empty
    pub ip: Option<String>,
    #[schema(example = "/pricing")]
    pub path: Option<String>,
    pub referrer: Option<String>,
}

/// Beacon result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TrackResponse {
    pub tracked: bool,
    /// Display name of the detected crawler
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "OpenAI GPT")]
    pub bot: Option<String>,
}

impl From<TrackOutcome> for TrackResponse {
    fn from(outcome: TrackOutcome) -> Self {
        match outcome {
            TrackOutcome::Tracked { display_name, .. } => Self {
                tracked: true,
                bot: Some(display_name),
            },
            TrackOutcome::NotTracked => Self {
                tracked: false,
                bot: None,
            },
        }
    }
}

/// Record a page view reported by the tracking script
#[utoipa::path(
    post,
    path = "/api/track",
    request_body = TrackRequest,
    responses(
        (status = 200, description = "Signal processed", body = TrackResponse),
        (status = 400, description = "Malformed payload", body = ApiError),
        (status = 401, description = "Invalid website_id or api_key", body = ApiError),
        (status = 500, description = "Storage failure", body = ApiError)
    ),
    tag = "tracking"
)]
pub async fn track(
    State(state): State<AppState>,
    client_ip: ClientIp,
    payload: Result<Json<TrackRequest>, JsonRejection>,
) -> Result<Json<TrackResponse>, ApiError> {
    let Json(request) = payload?;

    let ip = request
        .ip
        .filter(|ip| !ip.trim().is_empty())
        .or_else(|| client_ip.into_inner());

    let signal = VisitSignal {
        website_id: request.website_id,
        api_key: request.api_key,
        user_agent: request.user_agent,
        ip,
        path: request.path,
        referrer: request.referrer,
    };

    let outcome = state.ingestion.track_beacon(signal).await?;
    Ok(Json(outcome.into()))
}
