use std::sync::Arc;

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::debug;
use sitecache_core::{
    PendingAction, PendingActionKind, PendingActionRepository, PendingMutation, Result,
};

use super::model::{NewPendingActionDB, PendingActionDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::pending_actions;

/// Durable pending-action queue. Survives restarts, so mutations queued
/// while offline are replayed by whichever process drains next.
pub struct SqlitePendingActions {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl SqlitePendingActions {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        SqlitePendingActions { pool, writer }
    }
}

#[async_trait]
impl PendingActionRepository for SqlitePendingActions {
    async fn enqueue(&self, mutation: PendingMutation) -> Result<PendingAction> {
        let action = PendingAction::new(mutation);
        let row = NewPendingActionDB::try_from(&action)?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(pending_actions::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        debug!("[Storage] Queued pending action {}", action.id);
        Ok(action)
    }

    async fn list(&self, kind: PendingActionKind) -> Result<Vec<PendingAction>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = pending_actions::table
            .filter(pending_actions::kind.eq(kind.as_str()))
            .order(pending_actions::seq.asc())
            .select(PendingActionDB::as_select())
            .load::<PendingActionDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|row| PendingAction::try_from(row).map_err(Into::into))
            .collect()
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let affected =
                    diesel::delete(pending_actions::table.filter(pending_actions::id.eq(&id)))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                Ok(affected > 0)
            })
            .await
    }

    async fn count(&self) -> Result<usize> {
        let mut conn = get_connection(&self.pool)?;
        let count: i64 = pending_actions::table
            .select(count_star())
            .first(&mut conn)
            .map_err(StorageError::from)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_db;
    use serde_json::json;

    #[tokio::test]
    async fn queue_is_ordered_per_kind_and_survives_reopen() {
        let (pool, writer, _dir) = setup_db();
        let queue = SqlitePendingActions::new(Arc::clone(&pool), writer.clone());

        let first = queue
            .enqueue(PendingMutation::DailyReport {
                report: json!({"siteId": 3, "weather": "맑음"}),
            })
            .await
            .unwrap();
        queue
            .enqueue(PendingMutation::Attendance {
                record: json!({"workerId": 7}),
            })
            .await
            .unwrap();
        let second = queue
            .enqueue(PendingMutation::DailyReport {
                report: json!({"siteId": 3, "weather": "비"}),
            })
            .await
            .unwrap();

        let reopened = SqlitePendingActions::new(pool, writer);
        let reports = reopened.list(PendingActionKind::DailyReport).await.unwrap();
        assert_eq!(
            reports.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
            vec![first.id.as_str(), second.id.as_str()]
        );
        assert_eq!(reports[0], first);
        assert_eq!(reopened.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn remove_reports_whether_anything_was_deleted() {
        let (pool, writer, _dir) = setup_db();
        let queue = SqlitePendingActions::new(pool, writer);
        let action = queue
            .enqueue(PendingMutation::OfflineAction {
                url: "/api/materials/requests/9".to_string(),
                method: "PATCH".to_string(),
                headers: Default::default(),
                body: Some(r#"{"quantity":12}"#.to_string()),
            })
            .await
            .unwrap();

        assert!(queue.remove(&action.id).await.unwrap());
        assert!(!queue.remove(&action.id).await.unwrap());
        assert_eq!(queue.count().await.unwrap(), 0);
    }
}
