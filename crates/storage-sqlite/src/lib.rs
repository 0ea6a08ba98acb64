//! SQLite-backed storage for the worker: cache partitions, the pending-action
//! queue and the badge counter.

pub mod badge;
pub mod cache;
pub mod db;
pub mod errors;
pub mod pending;
pub mod schema;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

pub use badge::SqliteBadgeStore;
pub use cache::SqliteCacheStorage;
pub use db::{create_pool, get_connection, init, run_migrations, write_actor::spawn_writer, WriteHandle};
pub use errors::StorageError;
pub use pending::SqlitePendingActions;

/// Every durable store the worker needs, sharing one pool and one writer.
pub struct SqliteStores {
    pub cache: Arc<SqliteCacheStorage>,
    pub pending_actions: Arc<SqlitePendingActions>,
    pub badge: Arc<SqliteBadgeStore>,
}

/// Create (or open) the database under `data_dir`, migrate it and build the stores.
pub fn open(data_dir: &str) -> errors::Result<SqliteStores> {
    let db_path = init(data_dir)?;
    run_migrations(&db_path)?;
    let pool = create_pool(&db_path)?;
    let writer = spawn_writer(pool.as_ref().clone());
    log::info!("[Storage] Opened {}", db_path);

    Ok(SqliteStores {
        cache: Arc::new(SqliteCacheStorage::new(Arc::clone(&pool), writer.clone())),
        pending_actions: Arc::new(SqlitePendingActions::new(Arc::clone(&pool), writer.clone())),
        badge: Arc::new(SqliteBadgeStore::new(pool, writer)),
    })
}
