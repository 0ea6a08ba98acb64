//! Fakes shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::cache::{CacheStorage, MemoryCacheStorage};
use crate::clients::{ClientInfo, ClientMessage, ClientRegistry};
use crate::errors::{Error, Result};
use crate::http::{FetchRequest, HttpResponse};
use crate::network::Network;
use crate::notifications::{Notification, NotificationSink};

/// Scripted origin. Unscripted URLs answer 404; `set_offline` makes every
/// fetch fail as unreachable.
#[derive(Default)]
pub struct FakeNetwork {
    responses: Mutex<HashMap<String, HttpResponse>>,
    offline: AtomicBool,
    calls: Mutex<Vec<FetchRequest>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: HttpResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<FetchRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<HttpResponse> {
        self.calls.lock().unwrap().push(request.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::network("connection refused"));
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| HttpResponse::empty(404)))
    }
}

/// Reads work, every write fails as if the quota were exhausted.
#[derive(Default)]
pub struct QuotaExceededCache {
    inner: MemoryCacheStorage,
}

#[async_trait]
impl CacheStorage for QuotaExceededCache {
    async fn open(&self, partition: &str) -> Result<()> {
        self.inner.open(partition).await
    }

    async fn partitions(&self) -> Result<Vec<String>> {
        self.inner.partitions().await
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool> {
        self.inner.delete_partition(partition).await
    }

    async fn match_key(&self, partition: &str, key: &str) -> Result<Option<HttpResponse>> {
        self.inner.match_key(partition, key).await
    }

    async fn put(&self, _partition: &str, _key: &str, _response: &HttpResponse) -> Result<()> {
        Err(Error::cache("quota exceeded"))
    }

    async fn keys(&self, partition: &str) -> Result<Vec<String>> {
        self.inner.keys(partition).await
    }

    async fn delete(&self, partition: &str, key: &str) -> Result<bool> {
        self.inner.delete(partition, key).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Shown(String),
    Closed(String),
    Badge(u32),
    BadgeCleared,
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn show(&self, notification: &Notification) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Shown(notification.tag.clone()));
        Ok(())
    }

    async fn close(&self, tag: &str) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Closed(tag.to_string()));
        Ok(())
    }

    async fn set_app_badge(&self, count: u32) -> Result<()> {
        self.events.lock().unwrap().push(SinkEvent::Badge(count));
        Ok(())
    }

    async fn clear_app_badge(&self) -> Result<()> {
        self.events.lock().unwrap().push(SinkEvent::BadgeCleared);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Message(String, ClientMessage),
    Navigated(String, String),
    Opened(String),
}

#[derive(Default)]
pub struct FakeClients {
    clients: Mutex<Vec<ClientInfo>>,
    events: Mutex<Vec<ClientEvent>>,
}

impl FakeClients {
    pub fn with_clients(clients: Vec<ClientInfo>) -> Self {
        Self {
            clients: Mutex::new(clients),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClientRegistry for FakeClients {
    async fn list(&self) -> Result<Vec<ClientInfo>> {
        Ok(self.clients.lock().unwrap().clone())
    }

    async fn post_message(&self, client_id: &str, message: &ClientMessage) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(ClientEvent::Message(client_id.to_string(), message.clone()));
        Ok(())
    }

    async fn focus_and_navigate(&self, client_id: &str, url: &str) -> Result<()> {
        self.events.lock().unwrap().push(ClientEvent::Navigated(
            client_id.to_string(),
            url.to_string(),
        ));
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(ClientEvent::Opened(url.to_string()));
        Ok(())
    }

    async fn claim(&self) -> Result<usize> {
        Ok(self.clients.lock().unwrap().len())
    }
}

pub fn client(id: &str, url: &str, focused: bool) -> ClientInfo {
    ClientInfo {
        id: id.to_string(),
        url: url.to_string(),
        focused,
    }
}
