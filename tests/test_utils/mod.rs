//! Test utilities for HTTP and database testing.
//!
//! Builds the full router over an in-memory SQLite database with all
//! migrations applied, and wraps `oneshot` calls in small helpers.

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::CONTENT_TYPE},
    response::Response,
};
use botwatch::config::{AppConfig, TenancyMode, UserAgentSource};
use botwatch::server::{AppState, create_app};
use botwatch::signatures::SignatureCatalog;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;
use tower::ServiceExt;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Default test configuration: multi-tenant, legacy pixel behaviour.
#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        analytics_url: "https://analytics.test".to_string(),
        tenancy: TenancyMode::Multi,
        pixel_user_agent_source: UserAgentSource::QueryThenHeader,
        ..AppConfig::default()
    }
}

/// Router plus the state behind it.
pub struct TestApp {
    pub router: Router,
    #[allow(dead_code)]
    pub state: AppState,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Result<Self> {
        let db = setup_test_db().await?;
        let state = AppState::new(config, db, SignatureCatalog::default());
        Ok(Self {
            router: create_app(state.clone()),
            state,
        })
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await;
        split_json(response).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await;
        split_json(response).await
    }

    /// Registers a website through the API, returning `(website_id, api_key)`.
    pub async fn register(&self, name: &str, url: &str) -> (String, String) {
        let (status, body) = self
            .post_json(
                "/api/websites/register",
                serde_json::json!({ "name": name, "url": url }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        (
            body["website_id"].as_str().unwrap().to_string(),
            body["api_key"].as_str().unwrap().to_string(),
        )
    }
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable")
        .to_vec()
}

pub async fn split_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body_bytes(response).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is JSON")
    };
    (status, value)
}
