//! Named cache partitions.

mod governor;
mod memory;

pub use governor::SizeGovernor;
pub use memory::MemoryCacheStorage;

use async_trait::async_trait;

use crate::errors::Result;
use crate::http::HttpResponse;

/// Durable store of named partitions, each an insertion-ordered map of
/// request key → response.
///
/// Partitions are created lazily by `open` or the first `put`. Overwriting a
/// key moves it to the newest position.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Ensure the partition exists.
    async fn open(&self, partition: &str) -> Result<()>;

    /// Names of every existing partition.
    async fn partitions(&self) -> Result<Vec<String>>;

    /// Drop a partition and all its entries. Returns whether it existed.
    async fn delete_partition(&self, partition: &str) -> Result<bool>;

    async fn match_key(&self, partition: &str, key: &str) -> Result<Option<HttpResponse>>;

    async fn put(&self, partition: &str, key: &str, response: &HttpResponse) -> Result<()>;

    /// Stored keys, oldest insertion first.
    async fn keys(&self, partition: &str) -> Result<Vec<String>>;

    async fn delete(&self, partition: &str, key: &str) -> Result<bool>;
}
