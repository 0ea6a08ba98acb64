//! Durable unread-notification counter.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use sitecache_core::{BadgeStore, Result};

use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::worker_counters;

pub const BADGE_COUNTER: &str = "notification_badge";

pub struct SqliteBadgeStore {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl SqliteBadgeStore {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        SqliteBadgeStore { pool, writer }
    }

    /// Read-modify-write the counter inside one writer transaction.
    async fn adjust(&self, delta: i64) -> Result<u32> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<u32> {
                let current = read_counter(conn)?;
                let next = current.saturating_add(delta).clamp(0, i64::from(u32::MAX));
                diesel::replace_into(worker_counters::table)
                    .values((
                        worker_counters::name.eq(BADGE_COUNTER),
                        worker_counters::value.eq(next),
                        worker_counters::updated_at.eq(Utc::now().to_rfc3339()),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(to_count(next))
            })
            .await
    }
}

fn read_counter(conn: &mut SqliteConnection) -> Result<i64> {
    let value = worker_counters::table
        .find(BADGE_COUNTER)
        .select(worker_counters::value)
        .first::<i64>(conn)
        .optional()
        .map_err(StorageError::from)?;
    Ok(value.unwrap_or(0))
}

fn to_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

#[async_trait]
impl BadgeStore for SqliteBadgeStore {
    async fn get(&self) -> Result<u32> {
        let mut conn = get_connection(&self.pool)?;
        Ok(to_count(read_counter(&mut conn)?))
    }

    async fn increment(&self) -> Result<u32> {
        self.adjust(1).await
    }

    async fn decrement(&self) -> Result<u32> {
        self.adjust(-1).await
    }
}
