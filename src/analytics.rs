//! Read-side aggregation over recorded visits.
//!
//! Display names are resolved from the active catalog at read time, so
//! relabelling a signature applies to historical visits too.

use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::RepositoryError;
use crate::repositories::{Pagination, VisitFilter, VisitRepository, WebsiteRepository};
use crate::signatures::SignatureCatalog;

pub const TOP_PAGES_LIMIT: u64 = 20;
pub const DAILY_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BotBreakdown {
    pub signature: String,
    pub display_name: String,
    pub visits: i64,
    pub unique_ip_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageBreakdown {
    pub path: String,
    pub visits: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DailyActivity {
    /// UTC day, `YYYY-MM-DD`
    pub date: String,
    pub visits: i64,
}

/// Aggregate view of crawler traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Summary {
    pub total_visits: u64,
    /// Ordered by visits, descending
    pub bot_breakdown: Vec<BotBreakdown>,
    /// Top 20 paths by visits
    pub page_breakdown: Vec<PageBreakdown>,
    /// Trailing 30 days, newest first; days without visits are omitted
    pub daily_activity: Vec<DailyActivity>,
}

/// One visit as listed by `/api/logs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct VisitLogEntry {
    pub id: i32,
    pub website_id: Option<String>,
    pub website_name: Option<String>,
    pub bot_signature: String,
    pub bot_name: String,
    pub user_agent: String,
    pub ip_address: Option<String>,
    pub path: String,
    pub referrer: Option<String>,
    #[schema(value_type = String)]
    pub timestamp: chrono::DateTime<chrono::FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct VisitLogPage {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
    pub logs: Vec<VisitLogEntry>,
}

#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    visits: VisitRepository,
    websites: WebsiteRepository,
    catalog: Arc<SignatureCatalog>,
}

impl AnalyticsEngine {
    pub fn new(
        visits: VisitRepository,
        websites: WebsiteRepository,
        catalog: Arc<SignatureCatalog>,
    ) -> Self {
        Self {
            visits,
            websites,
            catalog,
        }
    }

    pub async fn summary(&self, filter: &VisitFilter) -> Result<Summary, RepositoryError> {
        let total_visits = self.visits.count(filter).await?;

        let bot_breakdown = self
            .visits
            .counts_by_signature(filter)
            .await?
            .into_iter()
            .map(|row| BotBreakdown {
                display_name: self.catalog.display_name(&row.bot_signature).to_string(),
                signature: row.bot_signature,
                visits: row.visits,
                unique_ip_count: row.unique_ips,
            })
            .collect();

        let page_breakdown = self
            .visits
            .counts_by_path(filter, TOP_PAGES_LIMIT)
            .await?
            .into_iter()
            .map(|row| PageBreakdown {
                path: row.path,
                visits: row.visits,
            })
            .collect();

        let since = Utc::now() - Duration::days(DAILY_WINDOW_DAYS);
        let daily_activity = self
            .visits
            .daily_counts(filter, since)
            .await?
            .into_iter()
            .map(|row| DailyActivity {
                date: row.date,
                visits: row.visits,
            })
            .collect();

        Ok(Summary {
            total_visits,
            bot_breakdown,
            page_breakdown,
            daily_activity,
        })
    }

    /// One page of raw visits joined with their website's display name.
    pub async fn logs(
        &self,
        filter: &VisitFilter,
        pagination: Pagination,
    ) -> Result<VisitLogPage, RepositoryError> {
        let (total, rows) = self.visits.query(filter, pagination).await?;

        let mut website_ids: Vec<String> =
            rows.iter().filter_map(|row| row.website_id.clone()).collect();
        website_ids.sort();
        website_ids.dedup();
        let names = self.websites.names_by_id(&website_ids).await?;

        let logs = rows
            .into_iter()
            .map(|row| VisitLogEntry {
                id: row.id,
                website_name: row
                    .website_id
                    .as_ref()
                    .and_then(|id| names.get(id).cloned()),
                website_id: row.website_id,
                bot_name: self.catalog.display_name(&row.bot_signature).to_string(),
                bot_signature: row.bot_signature,
                user_agent: row.user_agent,
                ip_address: row.ip_address,
                path: row.path,
                referrer: row.referrer,
                timestamp: row.timestamp,
            })
            .collect();

        Ok(VisitLogPage {
            total,
            page: pagination.page,
            limit: pagination.limit,
            pages: pagination.pages(total),
            logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::NewVisit;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn engine() -> (AnalyticsEngine, VisitRepository, WebsiteRepository) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let db = Arc::new(db);
        let visits = VisitRepository::new(db.clone());
        let websites = WebsiteRepository::new(db);
        let engine = AnalyticsEngine::new(
            visits.clone(),
            websites.clone(),
            Arc::new(SignatureCatalog::default()),
        );
        (engine, visits, websites)
    }

    async fn seed(visits: &VisitRepository, website: Option<&str>, signature: &str, path: &str) {
        visits
            .append(NewVisit {
                website_id: website.map(str::to_string),
                bot_signature: signature.to_string(),
                user_agent: format!("{signature}/1.0"),
                ip_address: Some("198.51.100.1".to_string()),
                path: path.to_string(),
                referrer: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_store_has_empty_summary() {
        let (engine, _, _) = engine().await;

        let summary = engine.summary(&VisitFilter::default()).await.unwrap();

        assert_eq!(summary.total_visits, 0);
        assert!(summary.bot_breakdown.is_empty());
        assert!(summary.page_breakdown.is_empty());
        assert!(summary.daily_activity.is_empty());
    }

    #[tokio::test]
    async fn summary_breakdowns_add_up() {
        let (engine, visits, websites) = engine().await;
        websites.register("Acme", "https://acme.example").await.unwrap();
        for i in 0..25 {
            seed(&visits, Some("acme"), "GPTBot", &format!("/p{i}")).await;
        }
        seed(&visits, Some("acme"), "GPTBot", "/p0").await;
        seed(&visits, Some("acme"), "ClaudeBot", "/p0").await;
        seed(&visits, None, "CCBot", "/other").await;

        let summary = engine
            .summary(&VisitFilter::for_website("acme"))
            .await
            .unwrap();

        assert_eq!(summary.total_visits, 27);
        let bot_total: i64 = summary.bot_breakdown.iter().map(|b| b.visits).sum();
        assert_eq!(bot_total as u64, summary.total_visits);
        assert_eq!(summary.bot_breakdown[0].display_name, "OpenAI GPT");
        assert_eq!(summary.bot_breakdown[0].unique_ip_count, 1);

        assert_eq!(summary.page_breakdown.len(), TOP_PAGES_LIMIT as usize);
        assert_eq!(summary.page_breakdown[0].path, "/p0");
        assert_eq!(summary.page_breakdown[0].visits, 3);
        let page_total: i64 = summary.page_breakdown.iter().map(|p| p.visits).sum();
        assert!(page_total as u64 <= summary.total_visits);

        assert_eq!(summary.daily_activity.len(), 1);
        assert_eq!(summary.daily_activity[0].visits, 27);

        let everything = engine.summary(&VisitFilter::default()).await.unwrap();
        assert_eq!(everything.total_visits, 28);
    }

    #[tokio::test]
    async fn logs_join_website_names_and_paginate() {
        let (engine, visits, websites) = engine().await;
        websites.register("Acme Corp", "https://acme.example").await.unwrap();
        for i in 0..7 {
            seed(&visits, Some("acme-corp"), "Bytespider", &format!("/{i}")).await;
        }
        seed(&visits, None, "YouBot", "/unowned").await;

        let first = engine
            .logs(&VisitFilter::default(), Pagination::new(1, 3))
            .await
            .unwrap();
        assert_eq!(first.total, 8);
        assert_eq!(first.pages, 3);
        assert_eq!(first.logs[0].path, "/unowned");
        assert_eq!(first.logs[0].website_name, None);
        assert_eq!(first.logs[1].website_name.as_deref(), Some("Acme Corp"));
        assert_eq!(first.logs[1].bot_name, "ByteDance AI");

        let beyond = engine
            .logs(&VisitFilter::default(), Pagination::new(9, 3))
            .await
            .unwrap();
        assert_eq!(beyond.total, 8);
        assert!(beyond.logs.is_empty());
    }
}
