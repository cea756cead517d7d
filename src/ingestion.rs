//! Ingestion service: authenticates a visit signal, classifies its user agent
//! and records detected crawlers.
//!
//! Beacon calls surface failures to the caller. Pixel calls never do; the
//! reason is logged and counted instead.

use metrics::counter;

use crate::classifier::Classifier;
use crate::config::UserAgentSource;
use crate::error::TrackingError;
use crate::repositories::{NewVisit, VisitRepository, WebsiteRepository};

const DEFAULT_PATH: &str = "/";

/// Raw fields of one inbound visit signal.
#[derive(Debug, Clone, Default)]
pub struct VisitSignal {
    pub website_id: Option<String>,
    pub api_key: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub path: Option<String>,
    pub referrer: Option<String>,
}

/// Pixel requests carry the user agent in two places.
#[derive(Debug, Clone, Default)]
pub struct PixelSignal {
    pub signal: VisitSignal,
    /// `user_agent` query parameter
    pub query_user_agent: Option<String>,
    /// `User-Agent` request header
    pub header_user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Tracked {
        visit_id: i32,
        signature: String,
        display_name: String,
    },
    NotTracked,
}

impl TrackOutcome {
    pub fn is_tracked(&self) -> bool {
        matches!(self, Self::Tracked { .. })
    }

    pub fn bot_name(&self) -> Option<&str> {
        match self {
            Self::Tracked { display_name, .. } => Some(display_name),
            Self::NotTracked => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionService {
    classifier: Classifier,
    /// `None` in single-site mode: no authentication, visits carry no tenant.
    registry: Option<WebsiteRepository>,
    visits: VisitRepository,
    pixel_user_agent_source: UserAgentSource,
}

impl IngestionService {
    pub fn new(
        classifier: Classifier,
        registry: Option<WebsiteRepository>,
        visits: VisitRepository,
        pixel_user_agent_source: UserAgentSource,
    ) -> Self {
        Self {
            classifier,
            registry,
            visits,
            pixel_user_agent_source,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Script beacon entry point.
    pub async fn track_beacon(&self, signal: VisitSignal) -> Result<TrackOutcome, TrackingError> {
        let result = self.track(signal).await;
        if let Err(err) = &result {
            counter!("botwatch_track_rejected_total", "reason" => err.reason()).increment(1);
        }
        result
    }

    /// Tracking-pixel entry point. Never fails; the caller always gets the image.
    pub async fn track_pixel(&self, pixel: PixelSignal) -> TrackOutcome {
        let PixelSignal {
            mut signal,
            query_user_agent,
            header_user_agent,
        } = pixel;

        signal.user_agent = match self.pixel_user_agent_source {
            UserAgentSource::QueryThenHeader => non_empty(query_user_agent).or(header_user_agent),
            UserAgentSource::HeaderOnly => header_user_agent,
        };

        match self.track(signal).await {
            Ok(outcome) => outcome,
            Err(err) => {
                counter!("botwatch_track_rejected_total", "reason" => err.reason()).increment(1);
                tracing::warn!(reason = err.reason(), error = %err, "Pixel tracking rejected");
                TrackOutcome::NotTracked
            }
        }
    }

    /// Records a crawler hitting a page directly, attributed to `website_id`
    /// without credential checks.
    pub async fn track_direct(
        &self,
        website_id: Option<String>,
        signal: VisitSignal,
    ) -> Result<TrackOutcome, TrackingError> {
        self.record(website_id, signal).await
    }

    async fn track(&self, signal: VisitSignal) -> Result<TrackOutcome, TrackingError> {
        let website_id = match &self.registry {
            Some(registry) => {
                let website_id = required(signal.website_id.as_deref(), "website_id")?;
                let api_key = required(signal.api_key.as_deref(), "api_key")?;

                let Some(website) = registry.authenticate(website_id, api_key).await? else {
                    tracing::info!(website_id, "Rejected visit signal with invalid credentials");
                    return Err(TrackingError::InvalidCredentials);
                };
                Some(website.id)
            }
            None => None,
        };

        self.record(website_id, signal).await
    }

    async fn record(
        &self,
        website_id: Option<String>,
        signal: VisitSignal,
    ) -> Result<TrackOutcome, TrackingError> {
        let Some(detection) = self.classifier.detect(signal.user_agent.as_deref()) else {
            return Ok(TrackOutcome::NotTracked);
        };

        let visit = NewVisit {
            website_id,
            bot_signature: detection.signature.clone(),
            user_agent: signal.user_agent.unwrap_or_default(),
            ip_address: non_empty(signal.ip),
            path: non_empty(signal.path).unwrap_or_else(|| DEFAULT_PATH.to_string()),
            referrer: non_empty(signal.referrer),
        };

        let stored = self.visits.append(visit).await.map_err(|err| {
            tracing::error!(error = %err, "Failed to record bot visit");
            TrackingError::from(err)
        })?;

        counter!("botwatch_visits_recorded_total", "signature" => detection.signature.clone())
            .increment(1);
        tracing::warn!(
            signature = %detection.signature,
            bot = %detection.display_name,
            website_id = stored.website_id.as_deref().unwrap_or("-"),
            path = %stored.path,
            "AI crawler visit recorded"
        );

        Ok(TrackOutcome::Tracked {
            visit_id: stored.id,
            signature: detection.signature,
            display_name: detection.display_name,
        })
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, TrackingError> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(TrackingError::malformed(format!("{field} is required"))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::VisitFilter;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;
    use std::sync::Arc;

    struct Fixture {
        service: IngestionService,
        websites: WebsiteRepository,
        visits: VisitRepository,
    }

    async fn fixture(multi_tenant: bool, source: UserAgentSource) -> Fixture {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let db = Arc::new(db);
        let websites = WebsiteRepository::new(db.clone());
        let visits = VisitRepository::new(db);
        let service = IngestionService::new(
            Classifier::default(),
            multi_tenant.then(|| websites.clone()),
            visits.clone(),
            source,
        );
        Fixture {
            service,
            websites,
            visits,
        }
    }

    fn beacon(website_id: &str, api_key: &str, user_agent: &str) -> VisitSignal {
        VisitSignal {
            website_id: Some(website_id.to_string()),
            api_key: Some(api_key.to_string()),
            user_agent: Some(user_agent.to_string()),
            ip: Some("203.0.113.7".to_string()),
            path: Some("/pricing".to_string()),
            referrer: None,
        }
    }

    #[tokio::test]
    async fn beacon_records_detected_crawler() {
        let fx = fixture(true, UserAgentSource::QueryThenHeader).await;
        let acme = fx.websites.register("Acme", "https://acme.example").await.unwrap();

        let outcome = fx
            .service
            .track_beacon(beacon("acme", &acme.api_key, "ClaudeBot/1.0"))
            .await
            .unwrap();

        assert_eq!(outcome.bot_name(), Some("Anthropic Claude"));
        let (total, rows) = fx
            .visits
            .query(&VisitFilter::for_website("acme"), Default::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].bot_signature, "ClaudeBot");
        assert_eq!(rows[0].path, "/pricing");
        assert_eq!(rows[0].ip_address.as_deref(), Some("203.0.113.7"));
    }

    #[tokio::test]
    async fn beacon_with_human_agent_is_not_tracked() {
        let fx = fixture(true, UserAgentSource::QueryThenHeader).await;
        let acme = fx.websites.register("Acme", "https://acme.example").await.unwrap();

        let outcome = fx
            .service
            .track_beacon(beacon("acme", &acme.api_key, "Mozilla/5.0 (Macintosh)"))
            .await
            .unwrap();

        assert_eq!(outcome, TrackOutcome::NotTracked);
        assert_eq!(fx.visits.count(&VisitFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn direct_visit_for_unknown_website_is_a_storage_failure() {
        let fx = fixture(true, UserAgentSource::QueryThenHeader).await;

        let result = fx
            .service
            .track_direct(Some("ghost".to_string()), beacon("ghost", "", "GPTBot"))
            .await;

        assert!(matches!(result, Err(TrackingError::StorageFailure(_))));
        assert_eq!(fx.visits.count(&VisitFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn beacon_rejects_bad_credentials_without_writing() {
        let fx = fixture(true, UserAgentSource::QueryThenHeader).await;
        fx.websites.register("Acme", "https://acme.example").await.unwrap();

        let wrong_key = fx.service.track_beacon(beacon("acme", "nope", "GPTBot")).await;
        assert!(matches!(wrong_key, Err(TrackingError::InvalidCredentials)));

        let missing_key = fx
            .service
            .track_beacon(VisitSignal {
                api_key: None,
                ..beacon("acme", "", "GPTBot")
            })
            .await;
        assert!(matches!(missing_key, Err(TrackingError::MalformedInput(_))));

        assert_eq!(fx.visits.count(&VisitFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn single_site_mode_skips_authentication() {
        let fx = fixture(false, UserAgentSource::QueryThenHeader).await;

        let outcome = fx
            .service
            .track_beacon(VisitSignal {
                user_agent: Some("GPTBot/1.2".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(outcome.is_tracked());
        let (_, rows) = fx
            .visits
            .query(&VisitFilter::default(), Default::default())
            .await
            .unwrap();
        assert_eq!(rows[0].website_id, None);
        assert_eq!(rows[0].path, "/");
    }

    #[tokio::test]
    async fn pixel_never_errors() {
        let fx = fixture(true, UserAgentSource::QueryThenHeader).await;

        let outcome = fx
            .service
            .track_pixel(PixelSignal {
                signal: beacon("ghost", "nope", ""),
                query_user_agent: None,
                header_user_agent: Some("GPTBot".to_string()),
            })
            .await;

        assert_eq!(outcome, TrackOutcome::NotTracked);
        assert_eq!(fx.visits.count(&VisitFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn pixel_user_agent_source_is_configurable() {
        let pixel = |key: &str| PixelSignal {
            signal: beacon("acme", key, ""),
            query_user_agent: Some("PerplexityBot/1.0".to_string()),
            header_user_agent: Some("Mozilla/5.0 (X11)".to_string()),
        };

        let legacy = fixture(true, UserAgentSource::QueryThenHeader).await;
        let acme = legacy.websites.register("Acme", "https://acme.example").await.unwrap();
        let outcome = legacy.service.track_pixel(pixel(&acme.api_key)).await;
        assert_eq!(outcome.bot_name(), Some("Perplexity AI"));

        let strict = fixture(true, UserAgentSource::HeaderOnly).await;
        let acme = strict.websites.register("Acme", "https://acme.example").await.unwrap();
        let outcome = strict.service.track_pixel(pixel(&acme.api_key)).await;
        assert_eq!(outcome, TrackOutcome::NotTracked);
    }

    #[tokio::test]
    async fn concurrent_beacons_get_distinct_ids() {
        let fx = fixture(true, UserAgentSource::QueryThenHeader).await;
        let acme = fx.websites.register("Acme", "https://acme.example").await.unwrap();
        let service = Arc::new(fx.service);

        let mut handles = Vec::new();
        for _ in 0..25 {
            let service = service.clone();
            let key = acme.api_key.clone();
            handles.push(tokio::spawn(async move {
                service.track_beacon(beacon("acme", &key, "CCBot/2.0")).await
            }));
        }

        let mut ids = std::collections::HashSet::new();
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                TrackOutcome::Tracked { visit_id, .. } => assert!(ids.insert(visit_id)),
                TrackOutcome::NotTracked => panic!("visit not tracked"),
            }
        }

        assert_eq!(ids.len(), 25);
        assert_eq!(
            fx.visits.count(&VisitFilter::for_website("acme")).await.unwrap(),
            25
        );
    }
}
