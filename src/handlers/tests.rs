//! # Tests for Handlers
//!
//! Unit tests for the service-level handlers and the generated OpenAPI document.

use crate::config::AppConfig;
use crate::handlers::{healthz, root};
use crate::server::{ApiDoc, AppState};
use crate::signatures::SignatureCatalog;
use axum::{extract::State, http::StatusCode, response::Json};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use utoipa::OpenApi;

async fn memory_state() -> AppState {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    AppState::new(AppConfig::default(), db, SignatureCatalog::default())
}

#[tokio::test]
async fn test_root_handler_returns_expected_service_info() {
    let Json(service_info) = root().await;

    assert_eq!(service_info.service, "botwatch");
    assert_eq!(service_info.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_root_handler_returns_valid_json() {
    let Json(service_info) = root().await;
    let json = serde_json::to_value(&service_info).unwrap();

    assert!(json.get("service").is_some());
    assert!(json.get("version").is_some());
}

#[tokio::test]
async fn test_healthz_reports_ok_for_live_database() {
    let state = memory_state().await;

    let (status, Json(body)) = healthz(State(state)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.status, "ok");
}

#[tokio::test]
async fn test_healthz_reports_unavailable_for_closed_database() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.clone().close().await.unwrap();
    let state = AppState::new(AppConfig::default(), db, SignatureCatalog::default());

    let (status, Json(body)) = healthz(State(state)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body.status, "unavailable");
}

#[test]
fn test_openapi_documents_every_route() {
    let doc = ApiDoc::openapi();
    let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

    for expected in [
        "/",
        "/healthz",
        "/api/track",
        "/api/pixel",
        "/api/websites",
        "/api/websites/register",
        "/api/analytics/summary",
        "/api/logs",
    ] {
        assert!(paths.contains(&expected), "missing {expected}");
    }
}
