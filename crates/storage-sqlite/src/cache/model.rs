//! Database models for cache partitions and entries.

use diesel::prelude::*;
use sitecache_core::HttpResponse;

use crate::errors::StorageError;

#[derive(Queryable, Insertable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::cache_partitions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CachePartitionDB {
    pub name: String,
    pub created_at: String,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::cache_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CacheEntryDB {
    pub seq: i64,
    pub partition_name: String,
    pub request_key: String,
    pub status: i32,
    pub headers: String,
    pub body: Vec<u8>,
    pub stored_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::cache_entries)]
pub struct NewCacheEntryDB {
    pub partition_name: String,
    pub request_key: String,
    pub status: i32,
    pub headers: String,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl NewCacheEntryDB {
    pub fn from_response(
        partition: &str,
        key: &str,
        response: &HttpResponse,
        stored_at: String,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            partition_name: partition.to_string(),
            request_key: key.to_string(),
            status: i32::from(response.status),
            headers: serde_json::to_string(&response.headers)?,
            body: response.body.clone(),
            stored_at,
        })
    }
}

impl TryFrom<CacheEntryDB> for HttpResponse {
    type Error = StorageError;

    fn try_from(row: CacheEntryDB) -> Result<Self, Self::Error> {
        let status = u16::try_from(row.status)
            .map_err(|_| StorageError::Corrupt(format!("status {} for {}", row.status, row.request_key)))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&row.headers)?;
        Ok(HttpResponse::new(status, headers, row.body))
    }
}
