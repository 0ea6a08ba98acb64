//! Byte-budget enforcement for cache partitions.
//!
//! Size is estimated as `entries × entry_estimate_bytes`; no content length is
//! read. When the estimate exceeds the budget the oldest fifth of the
//! partition is dropped by insertion order. Reads never refresh recency.

use log::debug;

use super::CacheStorage;
use crate::errors::Result;

/// Fraction of the partition evicted per enforcement, as a divisor.
const EVICTION_DIVISOR: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct SizeGovernor {
    entry_estimate_bytes: u64,
}

impl SizeGovernor {
    pub fn new(entry_estimate_bytes: u64) -> Self {
        Self {
            entry_estimate_bytes,
        }
    }

    pub fn estimate(&self, entry_count: usize) -> u64 {
        (entry_count as u64).saturating_mul(self.entry_estimate_bytes)
    }

    /// Number of oldest entries to evict from a partition of `entry_count`
    /// entries. Never includes the newest entry.
    pub fn eviction_count(&self, entry_count: usize, budget_bytes: u64) -> usize {
        if entry_count < 2 || self.estimate(entry_count) <= budget_bytes {
            return 0;
        }
        (entry_count / EVICTION_DIVISOR)
            .max(1)
            .min(entry_count - 1)
    }

    /// Evict from `partition` if it is over budget. Returns how many entries were removed.
    pub async fn enforce(
        &self,
        cache: &dyn CacheStorage,
        partition: &str,
        budget_bytes: u64,
    ) -> Result<usize> {
        let keys = cache.keys(partition).await?;
        let evict = self.eviction_count(keys.len(), budget_bytes);
        if evict == 0 {
            return Ok(0);
        }

        let mut removed = 0;
        for key in keys.iter().take(evict) {
            if cache.delete(partition, key).await? {
                removed += 1;
            }
        }
        debug!(
            "[SW] Evicted {} of {} entries from {} (budget {} bytes)",
            removed,
            keys.len(),
            partition,
            budget_bytes
        );
        Ok(removed)
    }
}
