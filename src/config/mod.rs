//! Configuration loading for botwatch.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `BOTWATCH_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, fmt, net::SocketAddr, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const ENV_PREFIX: &str = "BOTWATCH_";

/// Whether the deployment keeps a tenant registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenancyMode {
    /// Websites register and authenticate every tracking call
    Multi,
    /// No registry: no credentials are checked and visits carry no website id
    Single,
}

impl FromStr for TenancyMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "multi" => Ok(Self::Multi),
            "single" => Ok(Self::Single),
            other => Err(ConfigError::InvalidTenancy {
                value: other.to_string(),
            }),
        }
    }
}

/// Where the pixel endpoint reads the user agent from.
///
/// `QueryThenHeader` is the legacy behaviour: a `user_agent` query parameter
/// wins over the transport header, which lets any caller claim an arbitrary
/// agent. `HeaderOnly` ignores the query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAgentSource {
    QueryThenHeader,
    HeaderOnly,
}

impl FromStr for UserAgentSource {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "query_then_header" => Ok(Self::QueryThenHeader),
            "header_only" => Ok(Self::HeaderOnly),
            other => Err(ConfigError::InvalidUserAgentSource {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for UserAgentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueryThenHeader => f.write_str("query_then_header"),
            Self::HeaderOnly => f.write_str("header_only"),
        }
    }
}

/// Application configuration derived from `BOTWATCH_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// Base URL stamped into generated tracking snippets
    #[serde(default = "default_analytics_url")]
    pub analytics_url: String,
    #[serde(default = "default_tenancy")]
    pub tenancy: TenancyMode,
    #[serde(default = "default_pixel_user_agent_source")]
    pub pixel_user_agent_source: UserAgentSource,
    /// Optional JSON file replacing the built-in signature catalog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signatures_path: Option<PathBuf>,
    #[serde(default)]
    pub trap_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trap_website_id: Option<String>,
    /// Origins allowed to post beacons; empty allows any origin
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            analytics_url: default_analytics_url(),
            tenancy: default_tenancy(),
            pixel_user_agent_source: default_pixel_user_agent_source(),
            signatures_path: None,
            trap_enabled: false,
            trap_website_id: None,
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Whether tracking calls are authenticated against the website registry.
    pub fn registry_enabled(&self) -> bool {
        self.tenancy == TenancyMode::Multi
    }

    /// Returns a JSON representation with credentials in the database URL redacted.
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        config.database_url = redact_url_password(&config.database_url);
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr().is_err() {
            return Err(ConfigError::InvalidBindAddr {
                value: self.api_bind_addr.clone(),
            });
        }

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        if self.database_url.trim().is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections);
        }

        match Url::parse(&self.analytics_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::InvalidAnalyticsUrl {
                    value: self.analytics_url.clone(),
                });
            }
        }

        if let Some(website_id) = &self.trap_website_id
            && website_id.trim().is_empty()
        {
            return Err(ConfigError::InvalidTrapWebsiteId);
        }

        match (self.tenancy, self.trap_enabled, &self.trap_website_id) {
            (TenancyMode::Multi, true, None) => return Err(ConfigError::MissingTrapWebsiteId),
            (TenancyMode::Single, _, Some(_)) => return Err(ConfigError::TrapWebsiteIdWithoutRegistry),
            _ => {}
        }

        Ok(())
    }
}

fn redact_url_password(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            // set_password only fails for cannot-be-a-base URLs, which carry no password
            let _ = url.set_password(Some("[REDACTED]"));
            url.to_string()
        }
        _ => raw.to_string(),
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://botwatch.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_analytics_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_tenancy() -> TenancyMode {
    TenancyMode::Multi
}

fn default_pixel_user_agent_source() -> UserAgentSource {
    UserAgentSource::QueryThenHeader
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}'")]
    InvalidBindAddr { value: String },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("database URL is empty; set BOTWATCH_DATABASE_URL")]
    MissingDatabaseUrl,
    #[error("database max connections must be at least 1")]
    InvalidMaxConnections,
    #[error("analytics URL must be an absolute http(s) URL, got '{value}'")]
    InvalidAnalyticsUrl { value: String },
    #[error("tenancy must be 'multi' or 'single', got '{value}'")]
    InvalidTenancy { value: String },
    #[error("pixel user agent source must be 'query_then_header' or 'header_only', got '{value}'")]
    InvalidUserAgentSource { value: String },
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
    #[error("trap website id cannot be blank")]
    InvalidTrapWebsiteId,
    #[error("trap mode with multi tenancy requires BOTWATCH_TRAP_WEBSITE_ID")]
    MissingTrapWebsiteId,
    #[error("BOTWATCH_TRAP_WEBSITE_ID requires multi tenancy; single-site visits carry no website id")]
    TrapWebsiteIdWithoutRegistry,
}

/// Loads configuration using layered `.env` files and `BOTWATCH_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads and validates configuration. The process environment wins over every file.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let mut take = |key: &str| layered.remove(key).filter(|v| !v.trim().is_empty());

        let profile = take("PROFILE").unwrap_or(profile_hint);
        let api_bind_addr = take("API_BIND_ADDR").unwrap_or_else(default_api_bind_addr);
        let log_level = take("LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format = take("LOG_FORMAT")
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_else(default_log_format);
        let database_url = take("DATABASE_URL").unwrap_or_else(default_database_url);
        let db_max_connections = match take("DB_MAX_CONNECTIONS") {
            Some(raw) => parse_number("DB_MAX_CONNECTIONS", &raw)?,
            None => default_db_max_connections(),
        };
        let db_acquire_timeout_ms = match take("DB_ACQUIRE_TIMEOUT_MS") {
            Some(raw) => parse_number("DB_ACQUIRE_TIMEOUT_MS", &raw)?,
            None => default_db_acquire_timeout_ms(),
        };
        let analytics_url = take("ANALYTICS_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(default_analytics_url);
        let tenancy = match take("TENANCY") {
            Some(raw) => raw.parse()?,
            None => default_tenancy(),
        };
        let pixel_user_agent_source = match take("PIXEL_USER_AGENT_SOURCE") {
            Some(raw) => raw.parse()?,
            None => default_pixel_user_agent_source(),
        };
        let signatures_path = take("SIGNATURES_PATH").map(PathBuf::from);
        let trap_enabled = match take("TRAP_ENABLED") {
            Some(raw) => parse_bool("TRAP_ENABLED", &raw)?,
            None => false,
        };
        let trap_website_id = take("TRAP_WEBSITE_ID").map(|v| v.trim().to_string());
        let cors_allowed_origins = take("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            analytics_url,
            tenancy,
            pixel_user_agent_source,
            signatures_path,
            trap_enabled,
            trap_website_id,
            cors_allowed_origins,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_number<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}
