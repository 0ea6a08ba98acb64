//! Open app tabs ("clients") the worker governs and talks to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// An open tab of the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub id: String,
    pub url: String,
    pub focused: bool,
}

/// Messages posted to open tabs. This is the worker's only outbound signal
/// to the foreground app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    NotificationUpdate {
        notification_type: String,
        data: serde_json::Value,
    },
}

#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Every open tab, controlled or not.
    async fn list(&self) -> Result<Vec<ClientInfo>>;

    async fn post_message(&self, client_id: &str, message: &ClientMessage) -> Result<()>;

    /// Focus an existing tab and route it to `url`.
    async fn focus_and_navigate(&self, client_id: &str, url: &str) -> Result<()>;

    async fn open_window(&self, url: &str) -> Result<()>;

    /// Take control of every open tab without waiting for a reload. Returns
    /// how many tabs were claimed.
    async fn claim(&self) -> Result<usize>;
}
