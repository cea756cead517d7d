//! # Analytics API Handlers

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::analytics::{Summary, VisitLogPage};
use crate::error::ApiError;
use crate::handlers::types::WebsiteScopeQuery;
use crate::repositories::Pagination;
use crate::server::AppState;

/// Query parameters for the raw visit log
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LogsQuery {
    /// Restrict to one website; omit for all websites
    pub website_id: Option<String>,
    /// 1-based page number (default 1)
    pub page: Option<String>,
    /// Page size (default 50, max 500)
    pub limit: Option<String>,
}

/// Aggregate crawler activity
#[utoipa::path(
    get,
    path = "/api/analytics/summary",
    params(WebsiteScopeQuery),
    responses(
        (status = 200, description = "Totals plus breakdowns by bot, page and day", body = Summary),
        (status = 500, description = "Storage failure", body = ApiError)
    ),
    tag = "analytics"
)]
pub async fn summary(
    State(state): State<AppState>,
    Query(scope): Query<WebsiteScopeQuery>,
) -> Result<Json<Summary>, ApiError> {
    let summary = state.analytics.summary(&scope.filter()).await?;
    Ok(Json(summary))
}

/// Paginated raw visit log, newest first
#[utoipa::path(
    get,
    path = "/api/logs",
    params(LogsQuery),
    responses(
        (status = 200, description = "One page of recorded visits", body = VisitLogPage),
        (status = 500, description = "Storage failure", body = ApiError)
    ),
    tag = "analytics"
)]
pub async fn logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<VisitLogPage>, ApiError> {
    let scope = WebsiteScopeQuery {
        website_id: query.website_id,
    };
    let pagination = Pagination::from_query(query.page.as_deref(), query.limit.as_deref());

    let page = state.analytics.logs(&scope.filter(), pagination).await?;
    Ok(Json(page))
}
