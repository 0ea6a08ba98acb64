//! Worker configuration: partition names, pre-cache lists and byte budgets.

use serde::{Deserialize, Serialize};

/// Version token embedded in every default partition name. Bump on deploy to
/// invalidate what previous releases cached.
pub const DEFAULT_CACHE_VERSION: &str = "1.4.2";

/// Size assumed for every cached entry when estimating partition size.
pub const DEFAULT_ENTRY_ESTIMATE_BYTES: u64 = 50 * 1024;

pub const DEFAULT_IMAGE_CACHE_BUDGET_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_API_CACHE_BUDGET_BYTES: u64 = 10 * 1024 * 1024;

pub const DEFAULT_OFFLINE_PAGE: &str = "/offline.html";

const PARTITION_PREFIX: &str = "sitecache";

/// The four partitions the current release owns. Anything else found at
/// activation is stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheNames {
    pub static_assets: String,
    pub api: String,
    pub images: String,
    pub pages: String,
}

impl CacheNames {
    pub fn for_version(version: &str) -> Self {
        Self {
            static_assets: format!("{PARTITION_PREFIX}-static-v{version}"),
            api: format!("{PARTITION_PREFIX}-api-v{version}"),
            images: format!("{PARTITION_PREFIX}-images-v{version}"),
            pages: format!("{PARTITION_PREFIX}-pages-v{version}"),
        }
    }

    pub fn current(&self) -> [&str; 4] {
        [
            self.static_assets.as_str(),
            self.api.as_str(),
            self.images.as_str(),
            self.pages.as_str(),
        ]
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.current().contains(&name)
    }
}

impl Default for CacheNames {
    fn default() -> Self {
        Self::for_version(DEFAULT_CACHE_VERSION)
    }
}

/// Runtime configuration for a [`crate::ServiceWorker`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerConfig {
    /// Base URL of the origin the app talks to; relative paths resolve against it.
    pub origin_url: String,
    /// Base URL the app's tabs are served from when it differs from the
    /// origin (e.g. a gateway in front of it). Notification deep links open
    /// here.
    pub app_url: Option<String>,
    pub cache_names: CacheNames,
    pub image_budget_bytes: u64,
    pub api_budget_bytes: u64,
    pub entry_estimate_bytes: u64,
    /// Pages pre-cached at install into the pages partition.
    pub critical_pages: Vec<String>,
    /// Assets pre-cached at install into the static partition.
    pub static_assets: Vec<String>,
    /// Served when a page is requested offline and nothing better is cached.
    pub offline_page: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin_url: "http://localhost:3000".to_string(),
            app_url: None,
            cache_names: CacheNames::default(),
            image_budget_bytes: DEFAULT_IMAGE_CACHE_BUDGET_BYTES,
            api_budget_bytes: DEFAULT_API_CACHE_BUDGET_BYTES,
            entry_estimate_bytes: DEFAULT_ENTRY_ESTIMATE_BYTES,
            critical_pages: vec!["/".to_string(), DEFAULT_OFFLINE_PAGE.to_string()],
            static_assets: vec![
                "/manifest.json".to_string(),
                "/icons/icon-192x192.png".to_string(),
                "/icons/icon-512x512.png".to_string(),
            ],
            offline_page: DEFAULT_OFFLINE_PAGE.to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn with_origin(mut self, origin_url: &str) -> Self {
        self.origin_url = origin_url.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_app_url(mut self, app_url: &str) -> Self {
        self.app_url = Some(app_url.trim().trim_end_matches('/').to_string());
        self
    }

    /// Where open tabs live: the app URL if set, else the origin.
    pub fn app_base_url(&self) -> &str {
        self.app_url.as_deref().unwrap_or(&self.origin_url)
    }

    pub fn with_cache_version(mut self, version: &str) -> Self {
        self.cache_names = CacheNames::for_version(version);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_names_embed_version_token() {
        let names = CacheNames::for_version("2.0.0");
        assert_eq!(names.api, "sitecache-api-v2.0.0");
        assert!(names.is_current("sitecache-pages-v2.0.0"));
        assert!(!names.is_current("sitecache-pages-v1.4.2"));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: WorkerConfig =
            serde_json::from_str(r#"{"originUrl":"https://site.example"}"#).unwrap();
        assert_eq!(config.origin_url, "https://site.example");
        assert_eq!(config.offline_page, DEFAULT_OFFLINE_PAGE);
        assert_eq!(config.api_budget_bytes, DEFAULT_API_CACHE_BUDGET_BYTES);
        assert_eq!(config.app_base_url(), "https://site.example");
    }

    #[test]
    fn app_url_overrides_origin_for_tabs() {
        let config = WorkerConfig::default()
            .with_origin("https://site.example")
            .with_app_url("http://127.0.0.1:8080/");
        assert_eq!(config.app_base_url(), "http://127.0.0.1:8080");
        assert_eq!(config.origin_url, "https://site.example");
    }
}
