//! Publisher configuration
//!
//! Handles:
//! - Data hub endpoint (absent = telemetry disabled)
//! - Request timeout
//! - Cross-platform storage (TOML in the OS config dir)
//! - Environment overrides (`DATA_HUB_URL`, `DATA_HUB_TIMEOUT_MS`)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_ENDPOINT: &str = "DATA_HUB_URL";
pub const ENV_TIMEOUT_MS: &str = "DATA_HUB_TIMEOUT_MS";

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const MIN_TIMEOUT_MS: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Data hub base URL, e.g. `http://data-hub:8000`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl PublisherConfig {
    /// Set the endpoint; an empty or blank URL disables telemetry
    pub fn with_endpoint(mut self, base_url: &str) -> Self {
        self.endpoint = normalize_endpoint(base_url);
        self
    }

    /// Set the request timeout, rounded up to whole milliseconds
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.timeout_ms = u64::try_from(millis).unwrap_or(u64::MAX).max(MIN_TIMEOUT_MS);
        self
    }

    /// Effective timeout, never below [`MIN_TIMEOUT_MS`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(MIN_TIMEOUT_MS))
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Load config from the OS-specific location, then apply the environment
    pub async fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self::load_from(&Self::config_file_path()?).await?;
        config.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Load config from an explicit path; a missing file yields defaults
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config: PublisherConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.endpoint = config.endpoint.as_deref().and_then(normalize_endpoint);
        Ok(config)
    }

    /// Apply `DATA_HUB_URL` / `DATA_HUB_TIMEOUT_MS` from the given lookup.
    ///
    /// A set-but-empty `DATA_HUB_URL` disables telemetry.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_ENDPOINT) {
            self.endpoint = normalize_endpoint(&url);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| {
                    format!("{} must be a number of milliseconds, got {:?}", ENV_TIMEOUT_MS, raw)
                })?;
        }
        Ok(self)
    }

    /// Save config to the OS-specific location
    pub async fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path).await?;
        Ok(path)
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    /// Get OS-specific config file path
    pub fn config_file_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;

        path.push("datahub-publisher");
        path.push("config.toml");
        Ok(path)
    }
}

/// Blank URLs mean "disabled"; a trailing slash is dropped so the API path joins cleanly
fn normalize_endpoint(base_url: &str) -> Option<String> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = PublisherConfig::default();
        assert!(!config.is_enabled());
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_config_file_path() {
        let path = PublisherConfig::config_file_path().unwrap();
        assert!(path.to_string_lossy().contains("datahub-publisher"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_endpoint_normalization() {
        let config = PublisherConfig::default().with_endpoint("  http://hub:8000/ ");
        assert_eq!(config.endpoint.as_deref(), Some("http://hub:8000"));

        let config = config.with_endpoint("");
        assert!(!config.is_enabled());
        assert!(!PublisherConfig::default().with_endpoint("   ").is_enabled());
    }

    #[test]
    fn test_env_overrides() {
        let config = PublisherConfig::default()
            .apply_overrides(env(&[
                (ENV_ENDPOINT, "http://hub:8000"),
                (ENV_TIMEOUT_MS, "250"),
            ]))
            .unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("http://hub:8000"));
        assert_eq!(config.timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_empty_env_url_disables() {
        let config = PublisherConfig::default()
            .with_endpoint("http://hub:8000")
            .apply_overrides(env(&[(ENV_ENDPOINT, "")]))
            .unwrap();
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_sub_millisecond_timeout_is_not_zero() {
        let config = PublisherConfig::default().with_timeout(Duration::from_micros(300));
        assert_eq!(config.timeout_ms, 1);
        assert_eq!(config.timeout(), Duration::from_millis(1));

        let config = PublisherConfig::default().with_timeout(Duration::from_micros(1500));
        assert_eq!(config.timeout(), Duration::from_millis(2));

        let config = PublisherConfig::default().with_timeout(Duration::ZERO);
        assert_eq!(config.timeout(), Duration::from_millis(1));
    }

    #[test]
    fn test_zero_timeout_override_is_clamped() {
        let config = PublisherConfig::default()
            .apply_overrides(env(&[(ENV_TIMEOUT_MS, "0")]))
            .unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(1));
    }

    #[test]
    fn test_bad_timeout_override() {
        let result = PublisherConfig::default().apply_overrides(env(&[(ENV_TIMEOUT_MS, "soon")]));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PublisherConfig::load_from(&dir.path().join("absent.toml")).await.unwrap();
        assert_eq!(config, PublisherConfig::default());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = PublisherConfig::default()
            .with_endpoint("http://127.0.0.1:8000")
            .with_timeout(Duration::from_millis(1500));

        config.save_to(&path).await.unwrap();
        let loaded = PublisherConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_partial_file_uses_default_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "endpoint = \"http://hub/\"\n").await.unwrap();

        let loaded = PublisherConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded.endpoint.as_deref(), Some("http://hub"));
        assert_eq!(loaded.timeout_ms, DEFAULT_TIMEOUT_MS);
    }
}
