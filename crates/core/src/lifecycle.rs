//! Install and activate: pre-caching, stale partition cleanup, client claim.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::cache::CacheStorage;
use crate::clients::ClientRegistry;
use crate::config::WorkerConfig;
use crate::errors::{Error, Result};
use crate::http::{path_of, resolve_url, FetchRequest, HttpResponse};
use crate::network::Network;
use crate::routing::is_auth_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this worker never serves requests.
    Redundant,
}

/// What an activation cleaned up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationReport {
    pub deleted_partitions: Vec<String>,
    pub purged_auth_entries: usize,
    pub claimed_clients: usize,
}

pub struct LifecycleManager {
    cache: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    clients: Arc<dyn ClientRegistry>,
    config: Arc<WorkerConfig>,
    state: RwLock<WorkerState>,
}

impl LifecycleManager {
    pub fn new(
        cache: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        clients: Arc<dyn ClientRegistry>,
        config: Arc<WorkerConfig>,
    ) -> Self {
        Self {
            cache,
            network,
            clients,
            config,
            state: RwLock::new(WorkerState::Parsed),
        }
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Pre-cache the critical pages and static assets.
    ///
    /// All-or-nothing: every URL is fetched before anything is written, and a
    /// single failure leaves the partitions untouched and the worker redundant.
    pub async fn install(&self) -> Result<()> {
        self.set_state(WorkerState::Installing).await;

        let result = self.precache().await;
        match &result {
            Ok(count) => {
                info!("[SW] Installed, {} resources pre-cached", count);
                self.set_state(WorkerState::Installed).await;
            }
            Err(err) => {
                warn!("[SW] Install failed: {}", err);
                self.set_state(WorkerState::Redundant).await;
            }
        }
        result.map(|_| ())
    }

    /// Drop partitions from older releases, purge auth pages a previous
    /// release may have cached, and take control of every open tab.
    pub async fn activate(&self) -> Result<ActivationReport> {
        if self.state().await == WorkerState::Redundant {
            return Err(Error::Install(
                "cannot activate a worker whose install failed".to_string(),
            ));
        }
        self.set_state(WorkerState::Activating).await;

        let mut report = ActivationReport::default();
        for partition in self.cache.partitions().await? {
            if self.config.cache_names.is_current(&partition) {
                continue;
            }
            if self.cache.delete_partition(&partition).await? {
                debug!("[SW] Deleted stale partition {}", partition);
                report.deleted_partitions.push(partition);
            }
        }

        let pages = &self.config.cache_names.pages;
        for key in self.cache.keys(pages).await? {
            if is_auth_path(&path_of(&key)) && self.cache.delete(pages, &key).await? {
                report.purged_auth_entries += 1;
            }
        }

        report.claimed_clients = self.clients.claim().await?;
        self.set_state(WorkerState::Activated).await;

        info!(
            "[SW] Activated: {} stale partition(s), {} auth page(s) purged, {} client(s) claimed",
            report.deleted_partitions.len(),
            report.purged_auth_entries,
            report.claimed_clients
        );
        Ok(report)
    }

    async fn precache(&self) -> Result<usize> {
        let names = &self.config.cache_names;
        let mut fetched = Vec::new();
        for (partition, paths) in [
            (&names.pages, &self.config.critical_pages),
            (&names.static_assets, &self.config.static_assets),
        ] {
            for path in paths {
                let url = resolve_url(&self.config.origin_url, path)?;
                let response = self.fetch_for_install(&url).await?;
                fetched.push((partition.as_str(), url, response));
            }
        }

        self.cache.open(&names.pages).await?;
        self.cache.open(&names.static_assets).await?;
        for (partition, key, response) in &fetched {
            self.cache.put(partition, key, response).await?;
        }
        Ok(fetched.len())
    }

    async fn fetch_for_install(&self, url: &str) -> Result<HttpResponse> {
        let request = FetchRequest::get(url);
        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|err| Error::Install(format!("{url}: {err}")))?;
        if !response.is_success() {
            return Err(Error::Install(format!(
                "{url} answered {}",
                response.status
            )));
        }
        Ok(response)
    }

    async fn set_state(&self, state: WorkerState) {
        *self.state.write().await = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStorage;
    use crate::test_support::{client, FakeClients, FakeNetwork};

    const ORIGIN: &str = "https://site.example";

    fn manager(
        cache: Arc<MemoryCacheStorage>,
        network: Arc<FakeNetwork>,
        clients: FakeClients,
    ) -> LifecycleManager {
        LifecycleManager::new(
            cache,
            network,
            Arc::new(clients),
            Arc::new(WorkerConfig::default().with_origin(ORIGIN)),
        )
    }

    fn serve_precache_list(network: &FakeNetwork) {
        let config = WorkerConfig::default();
        for path in config.critical_pages.iter().chain(&config.static_assets) {
            network.respond(
                &format!("{ORIGIN}{path}"),
                HttpResponse::new(200, Vec::new(), path.as_bytes().to_vec()),
            );
        }
    }

    #[tokio::test]
    async fn install_precaches_pages_and_assets() {
        let cache = Arc::new(MemoryCacheStorage::new());
        let network = Arc::new(FakeNetwork::new());
        serve_precache_list(&network);
        let lifecycle = manager(cache.clone(), network, FakeClients::default());

        lifecycle.install().await.unwrap();

        assert_eq!(lifecycle.state().await, WorkerState::Installed);
        let names = WorkerConfig::default().cache_names;
        let pages = cache.keys(&names.pages).await.unwrap();
        assert_eq!(
            pages,
            vec![format!("{ORIGIN}/"), format!("{ORIGIN}/offline.html")]
        );
        assert_eq!(cache.keys(&names.static_assets).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn one_missing_asset_fails_the_whole_install() {
        let cache = Arc::new(MemoryCacheStorage::new());
        let network = Arc::new(FakeNetwork::new());
        serve_precache_list(&network);
        network.respond(
            &format!("{ORIGIN}/icons/icon-512x512.png"),
            HttpResponse::empty(404),
        );
        let lifecycle = manager(cache.clone(), network, FakeClients::default());

        let err = lifecycle.install().await.unwrap_err();
        assert!(matches!(err, Error::Install(_)));
        assert_eq!(lifecycle.state().await, WorkerState::Redundant);
        assert!(cache.partitions().await.unwrap().is_empty());
        assert!(lifecycle.activate().await.is_err());
    }

    #[tokio::test]
    async fn activate_keeps_only_current_partitions_and_purges_auth_pages() {
        let cache = Arc::new(MemoryCacheStorage::new());
        let names = WorkerConfig::default().cache_names;
        let page = HttpResponse::empty(200);
        cache.put("sitecache-api-v1.4.1", "k", &page).await.unwrap();
        cache.put("sitecache-pages-v1.3.0", "k", &page).await.unwrap();
        cache.put(&names.api, "k", &page).await.unwrap();
        cache
            .put(&names.pages, &format!("{ORIGIN}/login?next=/dashboard"), &page)
            .await
            .unwrap();
        cache
            .put(&names.pages, &format!("{ORIGIN}/about"), &page)
            .await
            .unwrap();

        let lifecycle = manager(
            cache.clone(),
            Arc::new(FakeNetwork::new()),
            FakeClients::with_clients(vec![
                client("tab-1", "https://site.example/", true),
                client("tab-2", "https://site.example/dashboard", false),
            ]),
        );
        let report = lifecycle.activate().await.unwrap();

        assert_eq!(
            report.deleted_partitions,
            vec!["sitecache-api-v1.4.1", "sitecache-pages-v1.3.0"]
        );
        assert_eq!(report.purged_auth_entries, 1);
        assert_eq!(report.claimed_clients, 2);
        assert_eq!(lifecycle.state().await, WorkerState::Activated);

        let mut remaining = cache.partitions().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec![names.api.clone(), names.pages.clone()]);
        assert_eq!(
            cache.keys(&names.pages).await.unwrap(),
            vec![format!("{ORIGIN}/about")]
        );
    }
}
