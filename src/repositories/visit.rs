//! # Visit Repository
//!
//! Append-only store of attributed bot visits plus the aggregate queries the
//! analytics engine reads. Every aggregate is computed at query time.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, EntityTrait,
    FromQueryResult, NotSet, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait,
    Select, Set, sea_query::Expr,
};
use std::sync::Arc;

use crate::error::RepositoryError;
use crate::models::bot_visit::{self, Entity as BotVisit};

pub const DEFAULT_PAGE_LIMIT: u64 = 50;
pub const MAX_PAGE_LIMIT: u64 = 500;
/// Highest page whose offset still fits the signed 64-bit bind value.
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PAGE_LIMIT;

/// Fields supplied by ingestion; `id` and `timestamp` are assigned on append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVisit {
    pub website_id: Option<String>,
    pub bot_signature: String,
    pub user_agent: String,
    pub ip_address: Option<String>,
    pub path: String,
    pub referrer: Option<String>,
}

/// Optional tenant scope. `None` reads across every tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitFilter {
    pub website_id: Option<String>,
}

impl VisitFilter {
    pub fn for_website(website_id: impl Into<String>) -> Self {
        Self {
            website_id: Some(website_id.into()),
        }
    }

    fn apply(&self, select: Select<BotVisit>) -> Select<BotVisit> {
        select.apply_if(self.website_id.clone(), |query, id| {
            query.filter(bot_visit::Column::WebsiteId.eq(id))
        })
    }
}

/// A 1-based page window, always within `1..=MAX_PAGE_LIMIT` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    /// Clamps to `1 <= page <= MAX_PAGE` and `1 <= limit <= MAX_PAGE_LIMIT`.
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.clamp(1, MAX_PAGE as i64) as u64,
            limit: limit.clamp(1, MAX_PAGE_LIMIT as i64) as u64,
        }
    }

    /// Lenient parsing of raw query values; junk falls back to the defaults.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |raw: Option<&str>, default: i64| {
            raw.and_then(|value| value.trim().parse::<i64>().ok())
                .unwrap_or(default)
        };
        Self::new(parse(page, 1), parse(limit, DEFAULT_PAGE_LIMIT as i64))
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    /// Number of pages needed for `total` rows.
    pub fn pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_LIMIT as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct SignatureCount {
    pub bot_signature: String,
    pub visits: i64,
    pub unique_ips: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct PathCount {
    pub path: String,
    pub visits: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct DailyCount {
    /// UTC calendar day, `YYYY-MM-DD`
    pub date: String,
    pub visits: i64,
}

/// Repository for bot visit database operations
#[derive(Debug, Clone)]
pub struct VisitRepository {
    pub db: Arc<DatabaseConnection>,
}

impl VisitRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Persists one visit as a single INSERT; the store assigns the id.
    pub async fn append(&self, visit: NewVisit) -> Result<bot_visit::Model, RepositoryError> {
        let active = bot_visit::ActiveModel {
            id: NotSet,
            website_id: Set(visit.website_id),
            bot_signature: Set(visit.bot_signature),
            user_agent: Set(visit.user_agent),
            ip_address: Set(visit.ip_address),
            path: Set(visit.path),
            referrer: Set(visit.referrer),
            timestamp: Set(Utc::now().into()),
        };

        active
            .insert(&*self.db)
            .await
            .map_err(RepositoryError::Database)
    }

    /// Total matching rows and one page of them, newest first.
    pub async fn query(
        &self,
        filter: &VisitFilter,
        pagination: Pagination,
    ) -> Result<(u64, Vec<bot_visit::Model>), RepositoryError> {
        let total = self.count(filter).await?;

        let rows = filter
            .apply(BotVisit::find())
            .order_by_desc(bot_visit::Column::Timestamp)
            .order_by_desc(bot_visit::Column::Id)
            .offset(pagination.offset())
            .limit(pagination.limit)
            .all(&*self.db)
            .await
            .map_err(RepositoryError::Database)?;

        Ok((total, rows))
    }

    pub async fn count(&self, filter: &VisitFilter) -> Result<u64, RepositoryError> {
        filter
            .apply(BotVisit::find())
            .count(&*self.db)
            .await
            .map_err(RepositoryError::Database)
    }

    /// Visits and distinct client addresses per signature, busiest first.
    pub async fn counts_by_signature(
        &self,
        filter: &VisitFilter,
    ) -> Result<Vec<SignatureCount>, RepositoryError> {
        filter
            .apply(BotVisit::find())
            .select_only()
            .column(bot_visit::Column::BotSignature)
            .column_as(Expr::col(bot_visit::Column::Id).count(), "visits")
            .column_as(Expr::cust("COUNT(DISTINCT ip_address)"), "unique_ips")
            .group_by(bot_visit::Column::BotSignature)
            .order_by_desc(Expr::cust("visits"))
            .order_by_asc(bot_visit::Column::BotSignature)
            .into_model::<SignatureCount>()
            .all(&*self.db)
            .await
            .map_err(RepositoryError::Database)
    }

    /// The `limit` most visited paths.
    pub async fn counts_by_path(
        &self,
        filter: &VisitFilter,
        limit: u64,
    ) -> Result<Vec<PathCount>, RepositoryError> {
        filter
            .apply(BotVisit::find())
            .select_only()
            .column(bot_visit::Column::Path)
            .column_as(Expr::col(bot_visit::Column::Id).count(), "visits")
            .group_by(bot_visit::Column::Path)
            .order_by_desc(Expr::cust("visits"))
            .order_by_asc(bot_visit::Column::Path)
            .limit(limit)
            .into_model::<PathCount>()
            .all(&*self.db)
            .await
            .map_err(RepositoryError::Database)
    }

    /// Visits per UTC day at or after `since`, newest day first.
    pub async fn daily_counts(
        &self,
        filter: &VisitFilter,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyCount>, RepositoryError> {
        let day = day_expression(self.db.get_database_backend());
        let since: sea_orm::prelude::DateTimeWithTimeZone = since.into();

        filter
            .apply(BotVisit::find())
            .filter(bot_visit::Column::Timestamp.gte(since))
            .select_only()
            .column_as(Expr::cust(day), "date")
            .column_as(Expr::col(bot_visit::Column::Id).count(), "visits")
            .group_by(Expr::cust(day))
            .order_by_desc(Expr::cust(day))
            .into_model::<DailyCount>()
            .all(&*self.db)
            .await
            .map_err(RepositoryError::Database)
    }
}

fn day_expression(backend: DatabaseBackend) -> &'static str {
    match backend {
        DatabaseBackend::Postgres => {
            r#"TO_CHAR("timestamp" AT TIME ZONE 'UTC', 'YYYY-MM-DD')"#
        }
        DatabaseBackend::MySql => "DATE_FORMAT(`timestamp`, '%Y-%m-%d')",
        DatabaseBackend::Sqlite => r#"strftime('%Y-%m-%d', "timestamp")"#,
    }
}
