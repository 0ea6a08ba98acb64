//! Cache strategies.
//!
//! Every strategy has the shape "try source A, on miss or failure try source B,
//! else synthesize a terminal response". None of them return an error: the
//! caller always gets a response to hand back.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, warn};
use serde_json::json;

use crate::background::BackgroundTasks;
use crate::cache::{CacheStorage, SizeGovernor};
use crate::config::WorkerConfig;
use crate::http::{path_of, resolve_url, FetchRequest, HttpResponse};
use crate::network::Network;
use crate::routing::{is_always_fresh_api_path, is_page_cache_excluded, Route};

pub const FROM_CACHE_HEADER: &str = "X-From-Cache";
pub const CACHE_DATE_HEADER: &str = "X-Cache-Date";

/// Shown to users whose API request could not be served from anywhere.
pub const OFFLINE_MESSAGE: &str = "오프라인 상태입니다. 인터넷 연결을 확인해주세요.";

/// Body returned for an API request with neither network nor cache.
pub fn offline_api_response() -> HttpResponse {
    HttpResponse::json(
        503,
        &json!({
            "error": "offline",
            "message": OFFLINE_MESSAGE,
        }),
    )
}

/// Runs the strategy matching a request's route against the cache partitions.
pub struct StrategyExecutor {
    cache: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    config: Arc<WorkerConfig>,
    governor: SizeGovernor,
    background: Arc<BackgroundTasks>,
}

impl StrategyExecutor {
    pub fn new(
        cache: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        config: Arc<WorkerConfig>,
    ) -> Self {
        let governor = SizeGovernor::new(config.entry_estimate_bytes);
        Self {
            cache,
            network,
            config,
            governor,
            background: Arc::new(BackgroundTasks::new()),
        }
    }

    pub fn background(&self) -> &Arc<BackgroundTasks> {
        &self.background
    }

    /// Serve `request` by its route. `None` means "not intercepted": the
    /// caller must send the request on untouched.
    pub async fn execute(&self, route: Route, request: &FetchRequest) -> Option<HttpResponse> {
        let response = match route {
            Route::Bypass(_) => return None,
            Route::StaticAsset => self.cache_first(request).await,
            Route::Image => self.images_cache_first(request).await,
            Route::CacheableApi => self.network_first_api(request).await,
            Route::Page => self.page_network_first(request).await,
            Route::NetworkOnly => self.network_only(request).await,
        };
        Some(response)
    }

    /// Static assets: serve from cache and refresh in the background; on a
    /// miss fetch, store a 200 and return.
    pub async fn cache_first(&self, request: &FetchRequest) -> HttpResponse {
        let partition = self.config.cache_names.static_assets.clone();
        let key = request.cache_key();

        if let Some(cached) = self.lookup(&partition, &key).await {
            self.revalidate_in_background(partition, key, request.clone())
                .await;
            return cached;
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store(&partition, &key, &response).await;
                }
                response
            }
            Err(err) => {
                debug!("[SW] Static asset unavailable {}: {}", request.url, err);
                HttpResponse::empty(503)
            }
        }
    }

    /// Images: immutable once fetched, so no revalidation. Total failure is a
    /// bare 404 so image call sites never see an error.
    pub async fn images_cache_first(&self, request: &FetchRequest) -> HttpResponse {
        let partition = &self.config.cache_names.images;
        let key = request.cache_key();

        if let Some(cached) = self.lookup(partition, &key).await {
            return cached;
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_governed(partition, self.config.image_budget_bytes, &key, &response)
                        .await;
                }
                response
            }
            Err(err) => {
                debug!("[SW] Image unavailable {}: {}", request.url, err);
                HttpResponse::empty(404)
            }
        }
    }

    /// Cacheable API: network first, cached copy (marked) when offline,
    /// structured 503 when neither is available.
    pub async fn network_first_api(&self, request: &FetchRequest) -> HttpResponse {
        let path = path_of(&request.url);
        if is_always_fresh_api_path(&path) {
            let fresh = request
                .clone()
                .with_header("Cache-Control", "no-cache")
                .with_header("Pragma", "no-cache");
            return match self.network.fetch(&fresh).await {
                Ok(response) => response,
                Err(err) => {
                    debug!("[SW] Always-fresh API offline {}: {}", request.url, err);
                    offline_api_response()
                }
            };
        }

        let partition = &self.config.cache_names.api;
        let key = request.private_cache_key();
        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_governed(partition, self.config.api_budget_bytes, &key, &response)
                        .await;
                }
                response
            }
            Err(err) => {
                debug!("[SW] API offline {}, trying cache: {}", request.url, err);
                match self.lookup(partition, &key).await {
                    Some(cached) => cached
                        .with_header(FROM_CACHE_HEADER, "true")
                        .with_header(CACHE_DATE_HEADER, &Utc::now().to_rfc3339()),
                    None => offline_api_response(),
                }
            }
        }
    }

    /// Pages: network first. Offline, excluded pages (auth, dashboard) get a
    /// bare 503 and are never served from cache.
    pub async fn page_network_first(&self, request: &FetchRequest) -> HttpResponse {
        let path = path_of(&request.url);
        let excluded = is_page_cache_excluded(&path);
        let partition = &self.config.cache_names.pages;
        let key = request.private_cache_key();

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() && !excluded {
                    self.store(partition, &key, &response).await;
                }
                response
            }
            Err(err) => {
                debug!("[SW] Page offline {}: {}", request.url, err);
                if excluded {
                    return HttpResponse::empty(503);
                }
                if let Some(cached) = self.lookup(partition, &key).await {
                    return cached;
                }
                if let Some(offline) = self.offline_page().await {
                    return offline;
                }
                HttpResponse::empty(503)
            }
        }
    }

    /// Everything unclassified: straight to the network, nothing cached.
    pub async fn network_only(&self, request: &FetchRequest) -> HttpResponse {
        match self.network.fetch(request).await {
            Ok(response) => response,
            Err(err) => {
                debug!("[SW] Network-only request failed {}: {}", request.url, err);
                HttpResponse::empty(503)
            }
        }
    }

    /// Write a fresh API response through the governor; used by the silent
    /// refresh that follows a push.
    pub async fn cache_api_response(&self, key: &str, response: &HttpResponse) {
        if response.is_ok() {
            self.store_governed(
                &self.config.cache_names.api,
                self.config.api_budget_bytes,
                key,
                response,
            )
            .await;
        }
    }

    async fn offline_page(&self) -> Option<HttpResponse> {
        let url = match resolve_url(&self.config.origin_url, &self.config.offline_page) {
            Ok(url) => url,
            Err(err) => {
                warn!("[SW] Offline page URL is invalid: {}", err);
                return None;
            }
        };
        self.lookup(&self.config.cache_names.pages, &url).await
    }

    async fn revalidate_in_background(&self, partition: String, key: String, request: FetchRequest) {
        let cache = Arc::clone(&self.cache);
        let network = Arc::clone(&self.network);
        self.background
            .spawn(async move {
                match network.fetch(&request).await {
                    Ok(response) if response.is_ok() => {
                        if let Err(err) = cache.put(&partition, &key, &response).await {
                            debug!("[SW] Revalidation write failed for {}: {}", key, err);
                        }
                    }
                    Ok(_) => {}
                    Err(err) => debug!("[SW] Revalidation skipped for {}: {}", key, err),
                }
            })
            .await;
    }

    async fn lookup(&self, partition: &str, key: &str) -> Option<HttpResponse> {
        match self.cache.match_key(partition, key).await {
            Ok(found) => found,
            Err(err) => {
                warn!("[SW] Cache read failed in {} for {}: {}", partition, key, err);
                None
            }
        }
    }

    async fn store(&self, partition: &str, key: &str, response: &HttpResponse) {
        if let Err(err) = self.cache.put(partition, key, response).await {
            warn!("[SW] Cache write failed in {} for {}: {}", partition, key, err);
        }
    }

    async fn store_governed(
        &self,
        partition: &str,
        budget_bytes: u64,
        key: &str,
        response: &HttpResponse,
    ) {
        if let Err(err) = self
            .governor
            .enforce(self.cache.as_ref(), partition, budget_bytes)
            .await
        {
            warn!("[SW] Size check failed for {}: {}", partition, err);
        }
        self.store(partition, key, response).await;
    }
}
