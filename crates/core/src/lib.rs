//! Offline-first request handling for the construction-site app.
//!
//! Requests are classified into routes, each served by a cache strategy over
//! named, versioned partitions. Around that sit install/activate, replay of
//! queued mutations, and push notification handling. Storage, the origin and
//! the open app tabs are collaborators behind traits.

pub mod background;
pub mod cache;
pub mod clients;
pub mod config;
pub mod errors;
pub mod http;
pub mod lifecycle;
pub mod network;
pub mod notifications;
pub mod routing;
pub mod strategy;
pub mod sync;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use cache::{CacheStorage, MemoryCacheStorage, SizeGovernor};
pub use clients::{ClientInfo, ClientMessage, ClientRegistry};
pub use config::{CacheNames, WorkerConfig};
pub use errors::{Error, Result};
pub use http::{FetchRequest, HttpResponse, RequestDestination, RequestMethod, RequestMode};
pub use lifecycle::{ActivationReport, LifecycleManager, WorkerState};
pub use network::Network;
pub use notifications::{BadgeStore, MemoryBadgeStore, Notification, NotificationClick, NotificationSink};
pub use routing::{BypassReason, RequestClassifier, Route};
pub use strategy::StrategyExecutor;
pub use sync::{
    MemoryPendingActions, PendingAction, PendingActionKind, PendingActionRepository,
    PendingMutation, SyncDrainReport, SyncDrainer,
};
pub use worker::{ServiceWorker, WorkerDeps};
