//! # Website Repository
//!
//! Storage for the tenant registry: registration, credential checks and
//! listing of registered websites.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use url::Url;
use utoipa::ToSchema;

use crate::error::{RepositoryError, is_unique_violation};
use crate::models::website::{self, Entity as Website};

const API_KEY_BYTES: usize = 24;
const MAX_NAME_LEN: usize = 255;

/// Credentials issued once, at registration.
#[derive(Debug, Clone)]
pub struct RegisteredWebsite {
    pub website: website::Model,
    pub api_key: String,
}

/// Public projection of a website; never carries the API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct WebsiteSummary {
    pub id: String,
    pub name: String,
    pub url: String,
    /// RFC 3339 registration time
    #[schema(value_type = String)]
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

impl From<website::Model> for WebsiteSummary {
    fn from(model: website::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            url: model.url,
            created_at: model.created_at,
        }
    }
}

/// Repository for website (tenant) database operations
#[derive(Debug, Clone)]
pub struct WebsiteRepository {
    pub db: Arc<DatabaseConnection>,
}

impl WebsiteRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Registers a website under the id derived from `name`.
    ///
    /// The insert is the duplicate check: a primary-key collision becomes
    /// [`RepositoryError::Conflict`] carrying the derived id.
    pub async fn register(&self, name: &str, url: &str) -> Result<RegisteredWebsite, RepositoryError> {
        let name = name.trim();
        validate_name(name)?;
        let url = validate_url(url)?;

        let website_id = derive_website_id(name);
        if website_id.is_empty() {
            return Err(RepositoryError::validation_error(
                "Website name must contain at least one non-whitespace character",
            ));
        }

        let api_key = generate_api_key();
        let active = website::ActiveModel {
            id: Set(website_id.clone()),
            name: Set(name.to_string()),
            url: Set(url),
            api_key: Set(api_key.clone()),
            created_at: Set(Utc::now().into()),
        };

        let website = active.insert(&*self.db).await.map_err(|err| {
            if is_unique_violation(&err) {
                RepositoryError::Conflict(website_id.clone())
            } else {
                RepositoryError::Database(err)
            }
        })?;

        Ok(RegisteredWebsite { website, api_key })
    }

    /// Returns the website when both the id and API key match.
    pub async fn authenticate(
        &self,
        website_id: &str,
        api_key: &str,
    ) -> Result<Option<website::Model>, RepositoryError> {
        let Some(website) = self.find_by_id(website_id).await? else {
            return Ok(None);
        };

        let matches: bool = website.api_key.as_bytes().ct_eq(api_key.as_bytes()).into();
        Ok(matches.then_some(website))
    }

    pub async fn find_by_id(&self, website_id: &str) -> Result<Option<website::Model>, RepositoryError> {
        Website::find_by_id(website_id.to_string())
            .one(&*self.db)
            .await
            .map_err(RepositoryError::Database)
    }

    /// Lists websites in registration order, credentials excluded.
    pub async fn list(&self) -> Result<Vec<WebsiteSummary>, RepositoryError> {
        let websites = Website::find()
            .order_by_asc(website::Column::CreatedAt)
            .order_by_asc(website::Column::Id)
            .all(&*self.db)
            .await
            .map_err(RepositoryError::Database)?;

        Ok(websites.into_iter().map(WebsiteSummary::from).collect())
    }

    /// Display names for the given ids; unknown ids are absent from the map.
    pub async fn names_by_id(&self, ids: &[String]) -> Result<HashMap<String, String>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let websites = Website::find()
            .filter(website::Column::Id.is_in(ids.iter().cloned()))
            .all(&*self.db)
            .await
            .map_err(RepositoryError::Database)?;

        Ok(websites.into_iter().map(|w| (w.id, w.name)).collect())
    }
}

/// Lowercases the trimmed name and collapses each whitespace run to `-`.
pub fn derive_website_id(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// 192 bits from the thread-local CSPRNG, hex encoded.
pub fn generate_api_key() -> String {
    use rand::Rng;

    let mut bytes = [0u8; API_KEY_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

fn validate_name(name: &str) -> Result<(), RepositoryError> {
    if name.is_empty() {
        return Err(RepositoryError::validation_error("Website name is required"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(RepositoryError::validation_error(
            "Website name cannot exceed 255 characters",
        ));
    }
    Ok(())
}

fn validate_url(raw: &str) -> Result<String, RepositoryError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RepositoryError::validation_error("Website url is required"));
    }

    let parsed = Url::parse(raw)
        .map_err(|err| RepositoryError::validation_error(format!("Invalid website url: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(RepositoryError::validation_error(
            "Website url must use http or https",
        ));
    }

    Ok(raw.to_string())
}
