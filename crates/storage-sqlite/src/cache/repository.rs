use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use sitecache_core::{CacheStorage, HttpResponse, Result};

use super::model::{CacheEntryDB, CachePartitionDB, NewCacheEntryDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{cache_entries, cache_partitions};

/// Cache partitions persisted in SQLite. Insertion order is the `seq` column.
pub struct SqliteCacheStorage {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl SqliteCacheStorage {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        SqliteCacheStorage { pool, writer }
    }
}

fn ensure_partition(conn: &mut SqliteConnection, partition: &str) -> Result<()> {
    diesel::insert_or_ignore_into(cache_partitions::table)
        .values(&CachePartitionDB {
            name: partition.to_string(),
            created_at: Utc::now().to_rfc3339(),
        })
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(())
}

#[async_trait]
impl CacheStorage for SqliteCacheStorage {
    async fn open(&self, partition: &str) -> Result<()> {
        let partition = partition.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                ensure_partition(conn, &partition)
            })
            .await
    }

    async fn partitions(&self) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        let names = cache_partitions::table
            .select(cache_partitions::name)
            .order(cache_partitions::name.asc())
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(names)
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool> {
        let partition = partition.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                diesel::delete(
                    cache_entries::table.filter(cache_entries::partition_name.eq(&partition)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                let affected = diesel::delete(cache_partitions::table.find(&partition))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(affected > 0)
            })
            .await
    }

    async fn match_key(&self, partition: &str, key: &str) -> Result<Option<HttpResponse>> {
        let mut conn = get_connection(&self.pool)?;
        let row = cache_entries::table
            .filter(cache_entries::partition_name.eq(partition))
            .filter(cache_entries::request_key.eq(key))
            .select(CacheEntryDB::as_select())
            .first::<CacheEntryDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        match row {
            Some(row) => Ok(Some(HttpResponse::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, partition: &str, key: &str, response: &HttpResponse) -> Result<()> {
        let entry = NewCacheEntryDB::from_response(partition, key, response, Utc::now().to_rfc3339())?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                ensure_partition(conn, &entry.partition_name)?;
                // Delete then insert so an overwrite takes the newest seq.
                diesel::delete(
                    cache_entries::table
                        .filter(cache_entries::partition_name.eq(&entry.partition_name))
                        .filter(cache_entries::request_key.eq(&entry.request_key)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                diesel::insert_into(cache_entries::table)
                    .values(&entry)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn keys(&self, partition: &str) -> Result<Vec<String>> {
        let mut conn = get_connection(&self.pool)?;
        let keys = cache_entries::table
            .filter(cache_entries::partition_name.eq(partition))
            .order(cache_entries::seq.asc())
            .select(cache_entries::request_key)
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(keys)
    }

    async fn delete(&self, partition: &str, key: &str) -> Result<bool> {
        let partition = partition.to_string();
        let key = key.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let affected = diesel::delete(
                    cache_entries::table
                        .filter(cache_entries::partition_name.eq(&partition))
                        .filter(cache_entries::request_key.eq(&key)),
                )
                .execute(conn)
                .map_err(StorageError::from)?;
                Ok(affected > 0)
            })
            .await
    }
}
