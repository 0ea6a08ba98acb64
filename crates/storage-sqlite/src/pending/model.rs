//! Database model for queued offline mutations.

use diesel::prelude::*;
use sitecache_core::{PendingAction, PendingMutation};

use crate::errors::StorageError;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::pending_actions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PendingActionDB {
    pub seq: i64,
    pub id: String,
    pub kind: String,
    pub mutation: String,
    pub created_at: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::pending_actions)]
pub struct NewPendingActionDB {
    pub id: String,
    pub kind: String,
    pub mutation: String,
    pub created_at: String,
}

impl TryFrom<&PendingAction> for NewPendingActionDB {
    type Error = StorageError;

    fn try_from(action: &PendingAction) -> Result<Self, Self::Error> {
        Ok(Self {
            id: action.id.clone(),
            kind: action.kind().as_str().to_string(),
            mutation: serde_json::to_string(&action.mutation)?,
            created_at: action.created_at.clone(),
        })
    }
}

impl TryFrom<PendingActionDB> for PendingAction {
    type Error = StorageError;

    fn try_from(row: PendingActionDB) -> Result<Self, Self::Error> {
        let mutation: PendingMutation = serde_json::from_str(&row.mutation)?;
        Ok(PendingAction {
            id: row.id,
            mutation,
            created_at: row.created_at,
        })
    }
}
