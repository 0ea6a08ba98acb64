//! Server configuration from environment variables.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use sitecache_core::WorkerConfig;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_ORIGIN_URL: &str = "http://localhost:3000";
const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Durable storage directory; `None` keeps everything in memory.
    pub data_dir: Option<String>,
    pub worker: WorkerConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let listen_addr = var("SITECACHE_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("SITECACHE_LISTEN_ADDR must be host:port")?;

        let origin_url = var("SITECACHE_ORIGIN_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_ORIGIN_URL.to_string());

        let public_url = var("SITECACHE_PUBLIC_URL").unwrap_or_else(|| default_public_url(listen_addr));

        let mut worker = WorkerConfig::default()
            .with_origin(&origin_url)
            .with_app_url(&public_url);
        if let Some(version) = var("SITECACHE_CACHE_VERSION") {
            worker = worker.with_cache_version(&version);
        }
        if let Some(mb) = var("SITECACHE_IMAGE_CACHE_MB") {
            worker.image_budget_bytes = parse_megabytes("SITECACHE_IMAGE_CACHE_MB", &mb)?;
        }
        if let Some(mb) = var("SITECACHE_API_CACHE_MB") {
            worker.api_budget_bytes = parse_megabytes("SITECACHE_API_CACHE_MB", &mb)?;
        }

        Ok(Self {
            listen_addr,
            data_dir: var("SITECACHE_DATA_DIR"),
            worker,
        })
    }
}

/// Where tabs reach the gateway when no public URL is configured.
fn default_public_url(listen_addr: SocketAddr) -> String {
    if listen_addr.ip().is_unspecified() {
        format!("http://localhost:{}", listen_addr.port())
    } else {
        format!("http://{listen_addr}")
    }
}

fn parse_megabytes(name: &str, value: &str) -> Result<u64> {
    let mb = value
        .parse::<u64>()
        .with_context(|| format!("{name} must be a whole number of megabytes"))?;
    Ok(mb.saturating_mul(BYTES_PER_MB))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_are_ephemeral_and_local() {
        let config = config(&[]).unwrap();
        assert_eq!(config.listen_addr.port(), 8080);
        assert!(config.data_dir.is_none());
        assert_eq!(config.worker.origin_url, DEFAULT_ORIGIN_URL);
        assert_eq!(config.worker.cache_names.api, "sitecache-api-v1.4.2");
        assert_eq!(config.worker.app_base_url(), "http://localhost:8080");
    }

    #[test]
    fn public_url_is_where_tabs_are_sent() {
        let bound = config(&[("SITECACHE_LISTEN_ADDR", "127.0.0.1:9000")]).unwrap();
        assert_eq!(bound.worker.app_base_url(), "http://127.0.0.1:9000");

        let public = config(&[
            ("SITECACHE_ORIGIN_URL", "https://api.site.example"),
            ("SITECACHE_PUBLIC_URL", "https://app.site.example/"),
        ])
        .unwrap();
        assert_eq!(public.worker.app_base_url(), "https://app.site.example");
        assert_eq!(public.worker.origin_url, "https://api.site.example");
    }

    #[test]
    fn overrides_are_trimmed_and_applied() {
        let config = config(&[
            ("SITECACHE_ORIGIN_URL", " https://site.example/ "),
            ("SITECACHE_CACHE_VERSION", "2.0.0"),
            ("SITECACHE_API_CACHE_MB", "5"),
            ("SITECACHE_DATA_DIR", "  "),
        ])
        .unwrap();
        assert_eq!(config.worker.origin_url, "https://site.example");
        assert_eq!(config.worker.cache_names.pages, "sitecache-pages-v2.0.0");
        assert_eq!(config.worker.api_budget_bytes, 5 * BYTES_PER_MB);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn bad_budget_is_rejected() {
        assert!(config(&[("SITECACHE_IMAGE_CACHE_MB", "lots")]).is_err());
    }
}
