//! Push delivery and notification interaction.

mod actions;
mod payload;
mod router;
mod types;

pub use actions::*;
pub use payload::*;
pub use router::*;
pub use types::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::errors::Result;

/// Displays notifications and drives the OS app badge.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<()>;

    async fn close(&self, tag: &str) -> Result<()>;

    /// Best effort; platforms without an app badge ignore it.
    async fn set_app_badge(&self, count: u32) -> Result<()>;

    async fn clear_app_badge(&self) -> Result<()>;
}

/// Unread-notification counter that must survive worker restarts.
///
/// Each call is one atomic read-modify-write.
#[async_trait]
pub trait BadgeStore: Send + Sync {
    async fn get(&self) -> Result<u32>;

    /// Returns the new count.
    async fn increment(&self) -> Result<u32>;

    /// Returns the new count; never goes below zero.
    async fn decrement(&self) -> Result<u32>;
}

/// Process-local badge counter, for ephemeral deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryBadgeStore {
    count: Mutex<u32>,
}

impl MemoryBadgeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BadgeStore for MemoryBadgeStore {
    async fn get(&self) -> Result<u32> {
        Ok(*self.count.lock().await)
    }

    async fn increment(&self) -> Result<u32> {
        let mut count = self.count.lock().await;
        *count = count.saturating_add(1);
        Ok(*count)
    }

    async fn decrement(&self) -> Result<u32> {
        let mut count = self.count.lock().await;
        *count = count.saturating_sub(1);
        Ok(*count)
    }
}

/// A click on a notification or one of its action buttons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationClick {
    pub tag: String,
    /// Empty when the body (not a button) was clicked.
    #[serde(default)]
    pub action: Option<String>,
    /// The `data` the notification was rendered with.
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}
