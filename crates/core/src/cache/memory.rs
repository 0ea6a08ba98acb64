//! Ephemeral in-process cache storage.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CacheStorage;
use crate::errors::Result;
use crate::http::HttpResponse;

/// Cache storage held in memory. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    partitions: RwLock<BTreeMap<String, Vec<(String, HttpResponse)>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, partition: &str) -> Result<()> {
        self.partitions
            .write()
            .await
            .entry(partition.to_string())
            .or_default();
        Ok(())
    }

    async fn partitions(&self) -> Result<Vec<String>> {
        Ok(self.partitions.read().await.keys().cloned().collect())
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool> {
        Ok(self.partitions.write().await.remove(partition).is_some())
    }

    async fn match_key(&self, partition: &str, key: &str) -> Result<Option<HttpResponse>> {
        let partitions = self.partitions.read().await;
        Ok(partitions.get(partition).and_then(|entries| {
            entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, response)| response.clone())
        }))
    }

    async fn put(&self, partition: &str, key: &str, response: &HttpResponse) -> Result<()> {
        let mut partitions = self.partitions.write().await;
        let entries = partitions.entry(partition.to_string()).or_default();
        entries.retain(|(k, _)| k != key);
        entries.push((key.to_string(), response.clone()));
        Ok(())
    }

    async fn keys(&self, partition: &str) -> Result<Vec<String>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(partition)
            .map(|entries| entries.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default())
    }

    async fn delete(&self, partition: &str, key: &str) -> Result<bool> {
        let mut partitions = self.partitions.write().await;
        let Some(entries) = partitions.get_mut(partition) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|(k, _)| k != key);
        Ok(entries.len() != before)
    }
}
