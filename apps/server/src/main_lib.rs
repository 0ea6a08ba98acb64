use std::sync::Arc;

use anyhow::Context;
use sitecache_core::{
    BadgeStore, CacheStorage, MemoryBadgeStore, MemoryCacheStorage, MemoryPendingActions,
    PendingActionRepository, ServiceWorker, WorkerDeps,
};
use sitecache_origin::OriginClient;
use tracing::info;

use crate::config::ServerConfig;
use crate::events::{BusNotificationSink, ConnectedClients, EventBus};

pub struct AppState {
    pub worker: Arc<ServiceWorker>,
    pub origin: Arc<OriginClient>,
    pub clients: Arc<ConnectedClients>,
    pub event_bus: EventBus,
    pub config: ServerConfig,
}

struct Stores {
    cache: Arc<dyn CacheStorage>,
    pending_actions: Arc<dyn PendingActionRepository>,
    badge: Arc<dyn BadgeStore>,
}

fn open_stores(config: &ServerConfig) -> anyhow::Result<Stores> {
    match &config.data_dir {
        Some(dir) => {
            let stores = sitecache_storage_sqlite::open(dir)
                .with_context(|| format!("Failed to open storage in {dir}"))?;
            Ok(Stores {
                cache: stores.cache,
                pending_actions: stores.pending_actions,
                badge: stores.badge,
            })
        }
        None => {
            info!("SITECACHE_DATA_DIR not set; caches and queued actions live in memory");
            Ok(Stores {
                cache: Arc::new(MemoryCacheStorage::new()),
                pending_actions: Arc::new(MemoryPendingActions::new()),
                badge: Arc::new(MemoryBadgeStore::new()),
            })
        }
    }
}

pub fn build_state(config: ServerConfig) -> anyhow::Result<Arc<AppState>> {
    let stores = open_stores(&config)?;
    let origin = Arc::new(
        OriginClient::new(&config.worker.origin_url).context("Failed to build origin client")?,
    );
    let event_bus = EventBus::new();
    let clients = Arc::new(ConnectedClients::new(event_bus.clone()));

    let worker = ServiceWorker::new(
        config.worker.clone(),
        WorkerDeps {
            cache: stores.cache,
            network: origin.clone(),
            pending_actions: stores.pending_actions,
            badge: stores.badge,
            notifications: Arc::new(BusNotificationSink::new(event_bus.clone())),
            clients: clients.clone(),
        },
    );

    Ok(Arc::new(AppState {
        worker: Arc::new(worker),
        origin,
        clients,
        event_bus,
        config,
    }))
}
