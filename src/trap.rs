//! Bait-site middleware.
//!
//! With `BOTWATCH_TRAP_ENABLED=true` every request outside the API surface
//! is classified by its `User-Agent` header and detected crawlers are
//! recorded before the request continues. Recording never blocks or fails
//! the request.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName,
        header::{REFERER, USER_AGENT},
    },
    middleware::Next,
    response::Response,
};

use anyhow::{Context, bail};

use crate::client_ip::ClientIp;
use crate::ingestion::VisitSignal;
use crate::server::AppState;

const EXEMPT_PREFIXES: &[&str] = &["/api/", "/docs", "/openapi.json", "/healthz"];

pub fn is_exempt(path: &str) -> bool {
    path == "/api" || EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Fails start-up when trap visits would be attributed to a website that is
/// not registered, since every insert would then violate the foreign key.
pub async fn ensure_trap_target(state: &AppState) -> anyhow::Result<()> {
    let (true, Some(website_id)) = (state.config.trap_enabled, &state.config.trap_website_id) else {
        return Ok(());
    };

    let website = state
        .websites
        .find_by_id(website_id)
        .await
        .context("Failed to look up trap website")?;
    if website.is_none() {
        bail!("trap website '{website_id}' is not registered; run `botwatch register` first");
    }

    tracing::info!(website_id = %website_id, "Trap middleware attributing visits");
    Ok(())
}

pub async fn trap_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if is_exempt(&path) {
        return next.run(request).await;
    }

    let signal = {
        let headers = request.headers();
        let header = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        VisitSignal {
            user_agent: header(USER_AGENT),
            referrer: header(REFERER),
            ip: ClientIp::resolve(headers, request.extensions()).into_inner(),
            path: Some(path),
            ..Default::default()
        }
    };

    if let Err(err) = state
        .ingestion
        .track_direct(state.config.trap_website_id.clone(), signal)
        .await
    {
        tracing::warn!(reason = err.reason(), error = %err, "Trap visit not recorded");
    }

    next.run(request).await
}
