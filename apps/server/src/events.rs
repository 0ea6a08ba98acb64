//! Server-sent events to connected app tabs.
//!
//! Each tab keeps an SSE connection open; while it is open the tab is a
//! "client" of the worker. Notifications, badge updates, postMessage and
//! navigation requests all travel over this channel.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::sse::Event;
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use serde_json::{json, Value};
use sitecache_core::{
    ClientInfo, ClientMessage, ClientRegistry, Notification, NotificationSink, Result,
};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

pub const CLIENT_CONNECTED: &str = "client-connected";
pub const CLIENT_MESSAGE: &str = "message";
pub const CLIENT_NAVIGATE: &str = "navigate";
pub const OPEN_WINDOW: &str = "open-window";
pub const CONTROLLER_CHANGE: &str = "controllerchange";
pub const NOTIFICATION_SHOW: &str = "notification-show";
pub const NOTIFICATION_CLOSE: &str = "notification-close";
pub const APP_BADGE: &str = "app-badge";
pub const SYNC_COMPLETE: &str = "sync-complete";

const EVENT_BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
pub struct ServerEvent {
    pub name: String,
    pub payload: Value,
    /// Delivered only to this client; `None` goes to every tab.
    #[serde(skip)]
    pub target: Option<String>,
}

impl ServerEvent {
    pub fn new(name: &str) -> Self {
        Self::with_payload(name, Value::Null)
    }

    pub fn with_payload(name: &str, payload: Value) -> Self {
        Self {
            name: name.to_string(),
            payload,
            target: None,
        }
    }

    pub fn to(mut self, client_id: &str) -> Self {
        self.target = Some(client_id.to_string());
        self
    }

    fn is_for(&self, client_id: &str) -> bool {
        self.target.as_deref().map_or(true, |t| t == client_id)
    }

    fn to_sse(&self) -> Event {
        Event::default()
            .event(self.name.as_str())
            .data(self.payload.to_string())
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ServerEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { tx }
    }

    /// Publish to every subscriber. Having no tab connected is not an error.
    pub fn publish(&self, event: ServerEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }
}

/// Tabs currently connected to the event stream.
pub struct ConnectedClients {
    clients: RwLock<HashMap<String, ClientInfo>>,
    bus: EventBus,
}

impl ConnectedClients {
    pub fn new(bus: EventBus) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            bus,
        }
    }

    pub async fn register(&self, url: String, focused: bool) -> ClientInfo {
        let client = ClientInfo {
            id: Uuid::new_v4().to_string(),
            url,
            focused,
        };
        let mut clients = self.clients.write().await;
        if focused {
            clients.values_mut().for_each(|c| c.focused = false);
        }
        clients.insert(client.id.clone(), client.clone());
        debug!("Client {} connected ({} open)", client.id, clients.len());
        client
    }

    pub async fn unregister(&self, client_id: &str) {
        if self.clients.write().await.remove(client_id).is_some() {
            debug!("Client {} disconnected", client_id);
        }
    }

    /// Record a tab gaining focus. Returns false for an unknown id.
    pub async fn focus(&self, client_id: &str) -> bool {
        let mut clients = self.clients.write().await;
        if !clients.contains_key(client_id) {
            return false;
        }
        for (id, client) in clients.iter_mut() {
            client.focused = id == client_id;
        }
        true
    }

    pub async fn count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// SSE stream for a newly connected tab. The tab is unregistered when
    /// the stream is dropped.
    pub async fn connect(
        self: Arc<Self>,
        url: String,
        focused: bool,
    ) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
        let rx = self.bus.subscribe();
        let client = self.register(url, focused).await;
        let hello = ServerEvent::with_payload(CLIENT_CONNECTED, json!({ "id": client.id }));
        let state = ClientStream {
            rx,
            id: client.id,
            clients: self,
        };

        let events = stream::unfold(state, |mut state| async move {
            loop {
                match state.rx.recv().await {
                    Ok(event) if event.is_for(&state.id) => {
                        return Some((Ok(event.to_sse()), state));
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Client {} missed {} event(s)", state.id, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        stream::once(async move { Ok(hello.to_sse()) }).chain(events)
    }
}

struct ClientStream {
    rx: broadcast::Receiver<ServerEvent>,
    id: String,
    clients: Arc<ConnectedClients>,
}

impl Drop for ClientStream {
    fn drop(&mut self) {
        let clients = Arc::clone(&self.clients);
        let id = std::mem::take(&mut self.id);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { clients.unregister(&id).await });
        }
    }
}

#[async_trait]
impl ClientRegistry for ConnectedClients {
    async fn list(&self) -> Result<Vec<ClientInfo>> {
        Ok(self.clients.read().await.values().cloned().collect())
    }

    async fn post_message(&self, client_id: &str, message: &ClientMessage) -> Result<()> {
        let payload = serde_json::to_value(message)?;
        self.bus
            .publish(ServerEvent::with_payload(CLIENT_MESSAGE, payload).to(client_id));
        Ok(())
    }

    async fn focus_and_navigate(&self, client_id: &str, url: &str) -> Result<()> {
        if !self.focus(client_id).await {
            return Err(sitecache_core::Error::invalid_request(format!(
                "client {client_id} is gone"
            )));
        }
        self.bus.publish(
            ServerEvent::with_payload(CLIENT_NAVIGATE, json!({ "url": url })).to(client_id),
        );
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<()> {
        self.bus
            .publish(ServerEvent::with_payload(OPEN_WINDOW, json!({ "url": url })));
        Ok(())
    }

    async fn claim(&self) -> Result<usize> {
        self.bus.publish(ServerEvent::new(CONTROLLER_CHANGE));
        Ok(self.count().await)
    }
}

/// Notifications are rendered by the connected tabs.
pub struct BusNotificationSink {
    bus: EventBus,
}

impl BusNotificationSink {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl NotificationSink for BusNotificationSink {
    async fn show(&self, notification: &Notification) -> Result<()> {
        let payload = serde_json::to_value(notification)?;
        self.bus
            .publish(ServerEvent::with_payload(NOTIFICATION_SHOW, payload));
        Ok(())
    }

    async fn close(&self, tag: &str) -> Result<()> {
        self.bus
            .publish(ServerEvent::with_payload(NOTIFICATION_CLOSE, json!({ "tag": tag })));
        Ok(())
    }

    async fn set_app_badge(&self, count: u32) -> Result<()> {
        self.bus
            .publish(ServerEvent::with_payload(APP_BADGE, json!({ "count": count })));
        Ok(())
    }

    async fn clear_app_badge(&self) -> Result<()> {
        self.bus
            .publish(ServerEvent::with_payload(APP_BADGE, json!({ "count": 0 })));
        Ok(())
    }
}
