//! Configuration validation rules.
//!
//! This module provides validation logic for `WorkerConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::WorkerConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl WorkerConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) URL
    /// - a manifest entry is not an absolute path, or `offline_page` is not in the manifest
    /// - `dynamic_max_entries` or `api_max_age_ms` is 0
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent`, `sync_tag` or a partition name component is empty
    ///
    /// Returns `ConfigError::Missing` if the manifest is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        if self.precache.is_empty() {
            return Err(ConfigError::Missing {
                field: "precache".into(),
                hint: "list every asset needed for an offline first load".into(),
            });
        }
        if let Some(path) = self.precache.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("precache", format!("{path} is not an absolute path")));
        }
        if !self.precache.contains(&self.offline_page) {
            return Err(invalid("offline_page", "must be listed in precache"));
        }

        if let Some(prefix) = self.api_origins.iter().find(|p| url::Url::parse(p).is_err()) {
            return Err(invalid("api_origins", format!("{prefix} is not a URL")));
        }

        if self.cache_prefix.is_empty() || self.cache_version.is_empty() {
            return Err(invalid("cache_prefix", "partition prefix and version must not be empty"));
        }

        if self.dynamic_max_entries == 0 {
            return Err(invalid("dynamic_max_entries", "must be greater than 0"));
        }

        if self.api_max_age_ms == 0 {
            return Err(invalid("api_max_age_ms", "must be greater than 0"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.sync_tag.is_empty() {
            return Err(invalid("sync_tag", "must not be empty"));
        }

        if self.api_origins.is_empty() {
            tracing::warn!("no api_origins declared; every cross-origin request will pass through untouched");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = WorkerConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_origin() {
        let config = WorkerConfig { origin: "ftp://books.example.org".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_empty_manifest() {
        let config = WorkerConfig { precache: Vec::new(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Missing { field, .. }) if field == "precache"));
    }

    #[test]
    fn test_validate_relative_manifest_entry() {
        let mut config = WorkerConfig::default();
        config.precache.push("assets/js/ai.js".into());
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "precache"));
    }

    #[test]
    fn test_validate_offline_page_outside_manifest() {
        let config = WorkerConfig { offline_page: "/elsewhere/offline.html".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "offline_page"));
    }

    #[test]
    fn test_validate_zero_dynamic_bound() {
        let config = WorkerConfig { dynamic_max_entries: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "dynamic_max_entries"));
    }

    #[test]
    fn test_validate_zero_max_age() {
        let config = WorkerConfig { api_max_age_ms: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "api_max_age_ms"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = WorkerConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = WorkerConfig { timeout_ms: 301_000, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_empty_sync_tag() {
        let config = WorkerConfig { sync_tag: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "sync_tag"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = WorkerConfig { max_bytes: 1, timeout_ms: 100, dynamic_max_entries: 1, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
