//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELFSYNC_*)
//! 2. TOML config file (if SHELFSYNC_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::{EvictionPolicy, PartitionRegistry};

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELFSYNC_*)
/// 2. TOML config file (if SHELFSYNC_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Path to the SQLite database holding partitions and the mutation queue.
    ///
    /// Set via SHELFSYNC_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the worker is installed for. Manifest paths resolve against it
    /// and only requests to this origin are treated as same-origin.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Absolute asset paths pre-cached at install time, in order.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Manifest path served to HTML requests when every strategy failed.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// URL prefixes routed network-first into the api partition.
    ///
    /// Set via SHELFSYNC_API_ORIGINS environment variable.
    #[serde(default = "default_api_origins")]
    pub api_origins: Vec<String>,

    /// Prefix of every partition name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version suffix of every partition name. Bumping it orphans the old
    /// partitions, which are purged on the next activation.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Maximum number of entries kept in the dynamic partition.
    #[serde(default = "default_dynamic_max_entries")]
    pub dynamic_max_entries: usize,

    /// How long a cached API response may stand in for a failed live fetch.
    #[serde(default = "default_api_max_age_ms")]
    pub api_max_age_ms: u64,

    /// Background sync tag that triggers a queue drain.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// Ask the host to activate this version without waiting for old clients.
    #[serde(default)]
    pub skip_waiting: bool,

    #[serde(default = "default_notification_title")]
    pub notification_title: String,

    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    #[serde(default = "default_notification_icon")]
    pub notification_badge: String,

    /// Body used when a push arrives without a payload.
    #[serde(default = "default_notification_body")]
    pub notification_default_body: String,

    /// In-app path opened when a notification is clicked.
    #[serde(default = "default_notification_url")]
    pub notification_url: String,

    /// User-Agent string for live fetches.
    ///
    /// Set via SHELFSYNC_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Host network timeout in milliseconds.
    ///
    /// Set via SHELFSYNC_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes accepted per live response.
    ///
    /// Set via SHELFSYNC_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

const APP_SCOPE: &str = "/pwa-book-logger/";

fn default_db_path() -> PathBuf {
    PathBuf::from("./shelfsync.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_precache() -> Vec<String> {
    [
        "",
        "assets/css/style.css",
        "assets/html/index.html",
        "assets/html/books.html",
        "assets/html/offline.html",
        "assets/icons/favicon.ico",
        "assets/icons/icon-128.png",
        "assets/icons/icon-512.png",
        "assets/js/firebase.js",
        "assets/js/signIn.js",
        "assets/js/books.js",
        "manifest.json",
    ]
    .iter()
    .map(|p| format!("{APP_SCOPE}{p}"))
    .collect()
}

fn default_offline_page() -> String {
    format!("{APP_SCOPE}assets/html/offline.html")
}

fn default_api_origins() -> Vec<String> {
    vec!["https://firestore.googleapis.com/".into()]
}

fn default_cache_prefix() -> String {
    "book-logger".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_dynamic_max_entries() -> usize {
    50
}

fn default_api_max_age_ms() -> u64 {
    86_400_000 // 24h
}

fn default_sync_tag() -> String {
    "sync-books".into()
}

fn default_notification_title() -> String {
    "Book Logger".into()
}

fn default_notification_icon() -> String {
    format!("{APP_SCOPE}assets/icons/icon-128.png")
}

fn default_notification_body() -> String {
    "Your library has new updates.".into()
}

fn default_notification_url() -> String {
    format!("{APP_SCOPE}assets/html/books.html")
}

fn default_user_agent() -> String {
    "shelfsync/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            precache: default_precache(),
            offline_page: default_offline_page(),
            api_origins: default_api_origins(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            dynamic_max_entries: default_dynamic_max_entries(),
            api_max_age_ms: default_api_max_age_ms(),
            sync_tag: default_sync_tag(),
            skip_waiting: false,
            notification_title: default_notification_title(),
            notification_icon: default_notification_icon(),
            notification_badge: default_notification_icon(),
            notification_default_body: default_notification_body(),
            notification_url: default_notification_url(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl WorkerConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Max age of API fallbacks in milliseconds, as a signed value for
    /// arithmetic against epoch timestamps.
    pub fn api_max_age(&self) -> i64 {
        i64::try_from(self.api_max_age_ms).unwrap_or(i64::MAX)
    }

    /// The partition names current for this version.
    pub fn registry(&self) -> PartitionRegistry {
        PartitionRegistry::new(&self.cache_prefix, &self.cache_version)
    }

    /// Eviction bound applied to the dynamic partition.
    pub fn eviction(&self) -> EvictionPolicy {
        EvictionPolicy::new(self.dynamic_max_entries)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELFSYNC_`
    /// 2. TOML file from `SHELFSYNC_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELFSYNC_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELFSYNC_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
