//! The worker facade: one entry point per event the host delivers.

use std::sync::Arc;

use log::{debug, trace};

use crate::cache::CacheStorage;
use crate::clients::ClientRegistry;
use crate::config::WorkerConfig;
use crate::errors::Result;
use crate::http::{FetchRequest, HttpResponse};
use crate::lifecycle::{ActivationReport, LifecycleManager, WorkerState};
use crate::network::Network;
use crate::notifications::{
    BadgeStore, ClickOutcome, NotificationClick, NotificationRouter, NotificationSink, PushOutcome,
};
use crate::routing::{BypassReason, RequestClassifier, Route};
use crate::strategy::StrategyExecutor;
use crate::sync::{PendingAction, PendingActionRepository, PendingMutation, SyncDrainReport, SyncDrainer};

/// Collaborators the worker runs against.
#[derive(Clone)]
pub struct WorkerDeps {
    pub cache: Arc<dyn CacheStorage>,
    pub network: Arc<dyn Network>,
    pub pending_actions: Arc<dyn PendingActionRepository>,
    pub badge: Arc<dyn BadgeStore>,
    pub notifications: Arc<dyn NotificationSink>,
    pub clients: Arc<dyn ClientRegistry>,
}

pub struct ServiceWorker {
    config: Arc<WorkerConfig>,
    classifier: RequestClassifier,
    executor: Arc<StrategyExecutor>,
    lifecycle: LifecycleManager,
    drainer: SyncDrainer,
    notifications: NotificationRouter,
    pending_actions: Arc<dyn PendingActionRepository>,
}

impl ServiceWorker {
    pub fn new(config: WorkerConfig, deps: WorkerDeps) -> Self {
        let config = Arc::new(config);
        let executor = Arc::new(StrategyExecutor::new(
            Arc::clone(&deps.cache),
            Arc::clone(&deps.network),
            Arc::clone(&config),
        ));
        let lifecycle = LifecycleManager::new(
            Arc::clone(&deps.cache),
            Arc::clone(&deps.network),
            Arc::clone(&deps.clients),
            Arc::clone(&config),
        );
        let drainer = SyncDrainer::new(
            Arc::clone(&deps.pending_actions),
            Arc::clone(&deps.network),
            config.origin_url.clone(),
        );
        let notifications = NotificationRouter::new(
            Arc::clone(&deps.network),
            Arc::clone(&executor),
            deps.notifications,
            deps.badge,
            deps.clients,
            config.origin_url.clone(),
            config.app_base_url().to_string(),
        );

        Self {
            config,
            classifier: RequestClassifier::default(),
            executor,
            lifecycle,
            drainer,
            notifications,
            pending_actions: deps.pending_actions,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub async fn state(&self) -> WorkerState {
        self.lifecycle.state().await
    }

    pub fn classify(&self, request: &FetchRequest) -> Route {
        self.classifier.classify(request)
    }

    /// Serve an intercepted request. `None` means the request is not
    /// intercepted and must reach the origin exactly as sent.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> Option<HttpResponse> {
        let route = self.classifier.classify(request);
        match route {
            Route::Bypass(BypassReason::Extension) => return None,
            Route::Bypass(BypassReason::Auth) => {
                debug!("[SW] Auth request bypassed: {}", request.url);
                return None;
            }
            Route::Bypass(BypassReason::NonGet) => {
                trace!("[SW] {} {} bypassed", request.method.as_str(), request.url);
                return None;
            }
            _ => trace!("[SW] {:?} {}", route, request.url),
        }
        self.executor.execute(route, request).await
    }

    /// Install, then activate straight away instead of waiting for older
    /// instances to go idle.
    pub async fn install(&self) -> Result<ActivationReport> {
        self.lifecycle.install().await?;
        self.lifecycle.activate().await
    }

    pub async fn activate(&self) -> Result<ActivationReport> {
        self.lifecycle.activate().await
    }

    pub async fn sync(&self, tag: &str) -> Result<SyncDrainReport> {
        self.drainer.drain(tag).await
    }

    /// Connectivity came back: drain every category.
    pub async fn sync_all(&self) -> Vec<SyncDrainReport> {
        self.drainer.drain_all().await
    }

    pub async fn push(&self, raw: Option<&[u8]>) -> PushOutcome {
        self.notifications.on_push(raw).await
    }

    pub async fn notification_click(&self, click: &NotificationClick) -> ClickOutcome {
        self.notifications.on_click(click).await
    }

    /// Queue a mutation that failed in the foreground for the next sync.
    pub async fn enqueue_pending(&self, mutation: PendingMutation) -> Result<PendingAction> {
        let action = self.pending_actions.enqueue(mutation).await?;
        debug!("[Sync] Queued {} ({})", action.id, action.kind().as_str());
        Ok(action)
    }

    pub async fn pending_count(&self) -> Result<usize> {
        self.pending_actions.count().await
    }

    /// Wait for background revalidation started by earlier fetches.
    pub async fn wait_background(&self) {
        self.executor.background().wait_idle().await;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cache::MemoryCacheStorage;
    use crate::http::{RequestDestination, RequestMode};
    use crate::notifications::MemoryBadgeStore;
    use crate::sync::MemoryPendingActions;
    use crate::test_support::{FakeClients, FakeNetwork, RecordingSink};

    const ORIGIN: &str = "https://site.example";

    struct Harness {
        worker: ServiceWorker,
        network: Arc<FakeNetwork>,
        cache: Arc<MemoryCacheStorage>,
    }

    fn harness() -> Harness {
        let network = Arc::new(FakeNetwork::new());
        let cache = Arc::new(MemoryCacheStorage::new());
        let deps = WorkerDeps {
            cache: cache.clone(),
            network: network.clone(),
            pending_actions: Arc::new(MemoryPendingActions::new()),
            badge: Arc::new(MemoryBadgeStore::new()),
            notifications: Arc::new(RecordingSink::default()),
            clients: Arc::new(FakeClients::default()),
        };
        Harness {
            worker: ServiceWorker::new(WorkerConfig::default().with_origin(ORIGIN), deps),
            network,
            cache,
        }
    }

    #[tokio::test]
    async fn auth_requests_touch_neither_network_nor_cache() {
        let h = harness();
        let login = FetchRequest::get(format!("{ORIGIN}/login"))
            .with_mode(RequestMode::Navigate)
            .with_destination(RequestDestination::Document);
        let chunk = FetchRequest::get(format!("{ORIGIN}/_next/static/chunks/login.js"))
            .with_referrer(format!("{ORIGIN}/login"));

        assert!(h.worker.handle_fetch(&login).await.is_none());
        assert!(h.worker.handle_fetch(&chunk).await.is_none());
        h.worker.wait_background().await;

        assert!(h.network.calls().is_empty());
        assert!(h.cache.partitions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn post_is_not_intercepted() {
        let h = harness();
        let request =
            FetchRequest::post_json(format!("{ORIGIN}/api/materials"), &json!({})).unwrap();
        assert!(h.worker.handle_fetch(&request).await.is_none());
        assert!(h.network.calls().is_empty());
    }

    #[tokio::test]
    async fn install_activates_immediately() {
        let h = harness();
        let config = h.worker.config().clone();
        for path in config.critical_pages.iter().chain(&config.static_assets) {
            h.network
                .respond(&format!("{ORIGIN}{path}"), HttpResponse::empty(200));
        }
        let report = h.worker.install().await.unwrap();
        assert!(report.deleted_partitions.is_empty());
        assert_eq!(h.worker.state().await, WorkerState::Activated);
    }

    #[tokio::test]
    async fn queued_mutation_is_replayed_on_sync() {
        let h = harness();
        h.network.set_offline(true);
        h.worker
            .enqueue_pending(PendingMutation::Attendance {
                record: json!({"workerId": 7, "checkIn": "2024-05-01T07:30:00+09:00"}),
            })
            .await
            .unwrap();
        assert_eq!(h.worker.pending_count().await.unwrap(), 1);

        let report = h.worker.sync("sync-attendance").await.unwrap();
        assert_eq!(report.failed, 1);

        h.network.set_offline(false);
        h.network
            .respond(&format!("{ORIGIN}/api/attendance"), HttpResponse::empty(201));
        let reports = h.worker.sync_all().await;
        assert_eq!(reports.iter().map(|r| r.replayed).sum::<usize>(), 1);
        assert_eq!(h.worker.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn image_request_is_served_through_cache() {
        let h = harness();
        let url = format!("{ORIGIN}/uploads/site/photo.webp");
        h.network
            .respond(&url, HttpResponse::new(200, Vec::new(), b"img".to_vec()));
        let request = FetchRequest::get(url.clone()).with_destination(RequestDestination::Image);

        assert_eq!(h.worker.classify(&request), Route::Image);
        h.worker.handle_fetch(&request).await.unwrap();
        h.network.set_offline(true);
        let offline = h.worker.handle_fetch(&request).await.unwrap();
        assert_eq!(offline.body, b"img");
    }
}
