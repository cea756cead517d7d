//! # Tracking Pixel Handler
//!
//! `GET /api/pixel` always answers with the transparent GIF, whatever
//! happened to the visit.

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::{
        HeaderMap, HeaderName,
        header::{REFERER, USER_AGENT},
    },
    response::Response,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::client_ip::ClientIp;
use crate::ingestion::{PixelSignal, VisitSignal};
use crate::pixel::pixel_response;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PixelQuery {
    pub website_id: Option<String>,
    pub api_key: Option<String>,
    /// Honoured only when `PIXEL_USER_AGENT_SOURCE=query_then_header`
    pub user_agent: Option<String>,
    pub path: Option<String>,
    /// Falls back to the `Referer` header
    pub referrer: Option<String>,
}

/// Tracking pixel for pages and clients that do not run JavaScript
#[utoipa::path(
    get,
    path = "/api/pixel",
    params(PixelQuery),
    responses(
        (status = 200, description = "1x1 transparent GIF", content_type = "image/gif")
    ),
    tag = "tracking"
)]
pub async fn pixel(
    State(state): State<AppState>,
    client_ip: ClientIp,
    headers: HeaderMap,
    query: Result<Query<PixelQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Unparseable pixel query");
            PixelQuery::default()
        }
    };

    let header = |name: HeaderName| {
        headers
            .get(&name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    let pixel = PixelSignal {
        signal: VisitSignal {
            website_id: query.website_id,
            api_key: query.api_key,
            user_agent: None,
            ip: client_ip.into_inner(),
            path: query.path,
            referrer: query.referrer.or_else(|| header(REFERER)),
        },
        query_user_agent: query.user_agent,
        header_user_agent: header(USER_AGENT),
    };

    state.ingestion.track_pixel(pixel).await;
    pixel_response()
}
