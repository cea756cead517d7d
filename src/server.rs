//! # Server Configuration
//!
//! Router, shared state and start-up for the botwatch HTTP service.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::analytics::AnalyticsEngine;
use crate::classifier::Classifier;
use crate::config::AppConfig;
use crate::handlers;
use crate::ingestion::IngestionService;
use crate::repositories::{VisitRepository, WebsiteRepository};
use crate::signatures::SignatureCatalog;
use crate::telemetry;
use crate::trap;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub websites: WebsiteRepository,
    pub ingestion: Arc<IngestionService>,
    pub analytics: Arc<AnalyticsEngine>,
}

impl AppState {
    /// Wires repositories and services around one connection pool.
    pub fn new(config: AppConfig, db: DatabaseConnection, catalog: SignatureCatalog) -> Self {
        let db = Arc::new(db);
        let catalog = Arc::new(catalog);
        let websites = WebsiteRepository::new(db.clone());
        let visits = VisitRepository::new(db.clone());

        let ingestion = IngestionService::new(
            Classifier::new(catalog.clone()),
            config.registry_enabled().then(|| websites.clone()),
            visits.clone(),
            config.pixel_user_agent_source,
        );
        let analytics = AnalyticsEngine::new(visits, websites.clone(), catalog);

        Self {
            config: Arc::new(config),
            db,
            websites,
            ingestion: Arc::new(ingestion),
            analytics: Arc::new(analytics),
        }
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/api/track", post(handlers::track::track))
        .route("/api/pixel", get(handlers::pixel::pixel))
        .route("/api/websites", get(handlers::websites::list_websites))
        .route(
            "/api/websites/register",
            post(handlers::websites::register_website),
        )
        .route("/api/analytics/summary", get(handlers::analytics::summary))
        .route("/api/logs", get(handlers::analytics::logs))
        .fallback(handlers::not_found)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()));

    let api = if state.config.trap_enabled {
        api.layer(middleware::from_fn_with_state(
            state.clone(),
            trap::trap_middleware,
        ))
    } else {
        api
    };

    api.with_state(state.clone())
        .layer(cors_layer(&state.config))
        .layer(middleware::from_fn(telemetry::trace_id_middleware))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.cors_allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin = %origin, error = %err, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Starts the server with the given configuration
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr = state
        .config
        .bind_addr()
        .context("Invalid server address")?;
    let profile = state.config.profile.clone();
    let tenancy = state.config.tenancy;

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, %profile, ?tenancy, "botwatch listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::track::track,
        crate::handlers::pixel::pixel,
        crate::handlers::websites::register_website,
        crate::handlers::websites::list_websites,
        crate::handlers::analytics::summary,
        crate::handlers::analytics::logs,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::types::HealthResponse,
            crate::handlers::track::TrackRequest,
            crate::handlers::track::TrackResponse,
            crate::handlers::websites::RegisterWebsiteRequest,
            crate::handlers::websites::RegisterWebsiteResponse,
            crate::handlers::websites::WebsiteListResponse,
            crate::repositories::WebsiteSummary,
            crate::analytics::Summary,
            crate::analytics::BotBreakdown,
            crate::analytics::PageBreakdown,
            crate::analytics::DailyActivity,
            crate::analytics::VisitLogPage,
            crate::analytics::VisitLogEntry,
        )
    ),
    tags(
        (name = "root", description = "Service metadata and health"),
        (name = "tracking", description = "Visit ingestion from beacons and pixels"),
        (name = "websites", description = "Tenant registry"),
        (name = "analytics", description = "Aggregates and raw visit logs"),
    ),
    info(
        title = "botwatch API",
        description = "Detects AI crawlers on registered websites and reports on their visits",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
