//! Push and click handling.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

use super::payload::id_value;
use super::{
    resolve_click, BadgeStore, ClickAction, Notification, NotificationClick, NotificationSink,
    NotificationType, PushPayload, SideEffect,
};
use crate::clients::{ClientMessage, ClientRegistry};
use crate::errors::Result;
use crate::http::{resolve_url, FetchRequest};
use crate::network::Network;
use crate::strategy::StrategyExecutor;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOutcome {
    pub notification: Notification,
    pub badge_count: u32,
    /// API resource re-fetched and re-cached ahead of the user's click.
    pub refreshed: Option<String>,
    pub notified_clients: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickOutcome {
    pub badge_count: u32,
    pub side_effect: Option<String>,
    pub navigated_to: Option<String>,
}

pub struct NotificationRouter {
    network: Arc<dyn Network>,
    executor: Arc<StrategyExecutor>,
    sink: Arc<dyn NotificationSink>,
    badge: Arc<dyn BadgeStore>,
    clients: Arc<dyn ClientRegistry>,
    origin_url: String,
    /// Base URL the app's tabs are served from.
    app_url: String,
}

impl NotificationRouter {
    pub fn new(
        network: Arc<dyn Network>,
        executor: Arc<StrategyExecutor>,
        sink: Arc<dyn NotificationSink>,
        badge: Arc<dyn BadgeStore>,
        clients: Arc<dyn ClientRegistry>,
        origin_url: impl Into<String>,
        app_url: impl Into<String>,
    ) -> Self {
        Self {
            network,
            executor,
            sink,
            badge,
            clients,
            origin_url: origin_url.into(),
            app_url: app_url.into(),
        }
    }

    /// Handle a push delivery. Malformed payloads degrade to a generic
    /// notification; nothing here fails the push.
    pub async fn on_push(&self, raw: Option<&[u8]>) -> PushOutcome {
        let payload = PushPayload::decode(raw);
        let kind = payload.notification_type();
        let notification = Notification::render(&payload);

        if let Err(err) = self.sink.show(&notification).await {
            warn!("[Push] Could not show {}: {}", notification.tag, err);
        }

        let badge_count = match self.badge.increment().await {
            Ok(count) => count,
            Err(err) => {
                warn!("[Push] Badge increment failed: {}", err);
                0
            }
        };
        self.update_app_badge(badge_count).await;

        let refreshed = self.silent_update(kind, &payload.data).await;
        let notified_clients = self
            .broadcast(ClientMessage::NotificationUpdate {
                notification_type: kind.as_str().to_string(),
                data: Value::Object(payload.data.clone()),
            })
            .await;

        info!(
            "[Push] Shown {} (badge {}, {} tab(s) notified)",
            notification.tag, badge_count, notified_clients
        );
        PushOutcome {
            notification,
            badge_count,
            refreshed,
            notified_clients,
        }
    }

    /// Handle a click on a notification or one of its buttons.
    pub async fn on_click(&self, click: &NotificationClick) -> ClickOutcome {
        if let Err(err) = self.sink.close(&click.tag).await {
            debug!("[Push] Close of {} failed: {}", click.tag, err);
        }

        let badge_count = match self.badge.decrement().await {
            Ok(count) => count,
            Err(err) => {
                warn!("[Push] Badge decrement failed: {}", err);
                0
            }
        };
        self.update_app_badge(badge_count).await;

        let kind = NotificationType::parse(click.data.get("type").and_then(Value::as_str));
        let mut outcome = ClickOutcome {
            badge_count,
            side_effect: None,
            navigated_to: None,
        };

        match resolve_click(kind, click.action.as_deref(), &click.data) {
            ClickAction::SideEffectThenNavigate { effect, url } => {
                outcome.side_effect = Some(self.perform(&effect).await);
                outcome.navigated_to = self.navigate(&url).await;
            }
            ClickAction::SideEffect(effect) => {
                outcome.side_effect = Some(self.perform(&effect).await);
            }
            ClickAction::Navigate(url) => {
                outcome.navigated_to = self.navigate(&url).await;
            }
            ClickAction::Dismiss => {
                debug!("[Push] {} dismissed", click.tag);
            }
        }
        outcome
    }

    /// The API resource a notification type makes stale.
    pub fn silent_update_path(kind: NotificationType, data: &Map<String, Value>) -> String {
        match kind {
            NotificationType::MaterialApproval => {
                match data.get("materialRequestId").and_then(id_value) {
                    Some(id) => format!("/api/materials/requests/{id}"),
                    None => "/api/materials".to_string(),
                }
            }
            NotificationType::DailyReportReminder => "/api/daily-reports".to_string(),
            _ => "/api/notifications".to_string(),
        }
    }

    async fn silent_update(&self, kind: NotificationType, data: &Map<String, Value>) -> Option<String> {
        let path = Self::silent_update_path(kind, data);
        let url = match resolve_url(&self.origin_url, &path) {
            Ok(url) => url,
            Err(err) => {
                warn!("[Push] Bad silent update URL {}: {}", path, err);
                return None;
            }
        };

        let request = FetchRequest::get(url.clone());
        match self.network.fetch(&request).await {
            Ok(response) if response.is_ok() => {
                self.executor
                    .cache_api_response(&request.cache_key(), &response)
                    .await;
                Some(url)
            }
            Ok(response) => {
                debug!("[Push] Silent update of {} returned {}", url, response.status);
                None
            }
            Err(err) => {
                debug!("[Push] Silent update of {} skipped: {}", url, err);
                None
            }
        }
    }

    async fn broadcast(&self, message: ClientMessage) -> usize {
        let clients = match self.clients.list().await {
            Ok(clients) => clients,
            Err(err) => {
                warn!("[Push] Could not list clients: {}", err);
                return 0;
            }
        };

        let mut delivered = 0;
        for client in clients {
            match self.clients.post_message(&client.id, &message).await {
                Ok(()) => delivered += 1,
                Err(err) => debug!("[Push] postMessage to {} failed: {}", client.id, err),
            }
        }
        delivered
    }

    /// POST the side effect. Failures are logged; the click flow continues.
    async fn perform(&self, effect: &SideEffect) -> String {
        match self.post_side_effect(effect).await {
            Ok(status) if (200..300).contains(&status) => {
                debug!("[Push] {} answered {}", effect.path, status)
            }
            Ok(status) => warn!("[Push] {} answered {}", effect.path, status),
            Err(err) => warn!("[Push] Side effect {} failed: {}", effect.path, err),
        }
        effect.path.clone()
    }

    async fn post_side_effect(&self, effect: &SideEffect) -> Result<u16> {
        let url = resolve_url(&self.origin_url, &effect.path)?;
        let request = FetchRequest::post_json(url, &effect.body)?;
        Ok(self.network.fetch(&request).await?.status)
    }

    /// Prefer routing an already-open app tab over opening a new one.
    async fn navigate(&self, url: &str) -> Option<String> {
        let (target, app_origin) = match resolve_url(&self.app_url, url)
            .and_then(|target| Ok((target, Url::parse(&self.app_url)?.origin())))
        {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!("[Push] Cannot navigate to {}: {}", url, err);
                return None;
            }
        };

        let clients = self.clients.list().await.unwrap_or_default();
        let existing = clients
            .iter()
            .filter(|c| Url::parse(&c.url).is_ok_and(|u| u.origin() == app_origin))
            .max_by_key(|c| c.focused);

        if let Some(client) = existing {
            match self.clients.focus_and_navigate(&client.id, &target).await {
                Ok(()) => return Some(target),
                Err(err) => debug!("[Push] Focus of {} failed, opening window: {}", client.id, err),
            }
        }

        match self.clients.open_window(&target).await {
            Ok(()) => Some(target),
            Err(err) => {
                warn!("[Push] Could not open {}: {}", target, err);
                None
            }
        }
    }

    async fn update_app_badge(&self, count: u32) {
        let result = if count == 0 {
            self.sink.clear_app_badge().await
        } else {
            self.sink.set_app_badge(count).await
        };
        if let Err(err) = result {
            debug!("[Push] App badge update ignored: {}", err);
        }
    }
}

#[cfg(test)]
mod tests;
