//! Mutations queued while offline, and the store that holds them.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::{Error, Result};

/// Category of a queued mutation; one sync tag drains one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingActionKind {
    DailyReport,
    Attendance,
    MaterialRequest,
    OfflineAction,
}

impl PendingActionKind {
    pub const ALL: [PendingActionKind; 4] = [
        Self::DailyReport,
        Self::Attendance,
        Self::MaterialRequest,
        Self::OfflineAction,
    ];

    /// Sync tag the foreground registers for this category.
    pub fn sync_tag(&self) -> &'static str {
        match self {
            Self::DailyReport => "sync-daily-reports",
            Self::Attendance => "sync-attendance",
            Self::MaterialRequest => "sync-material-requests",
            Self::OfflineAction => "sync-offline-actions",
        }
    }

    pub fn from_sync_tag(tag: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.sync_tag() == tag)
            .ok_or_else(|| Error::UnknownSyncTag(tag.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DailyReport => "daily_report",
            Self::Attendance => "attendance",
            Self::MaterialRequest => "material_request",
            Self::OfflineAction => "offline_action",
        }
    }
}

/// The mutation itself. Typed categories are replayed as a JSON POST to a
/// fixed endpoint; generic offline actions carry their own request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingMutation {
    DailyReport {
        report: serde_json::Value,
    },
    Attendance {
        record: serde_json::Value,
    },
    MaterialRequest {
        request: serde_json::Value,
    },
    OfflineAction {
        url: String,
        method: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        body: Option<String>,
    },
}

impl PendingMutation {
    pub fn kind(&self) -> PendingActionKind {
        match self {
            Self::DailyReport { .. } => PendingActionKind::DailyReport,
            Self::Attendance { .. } => PendingActionKind::Attendance,
            Self::MaterialRequest { .. } => PendingActionKind::MaterialRequest,
            Self::OfflineAction { .. } => PendingActionKind::OfflineAction,
        }
    }
}

/// A queued mutation. Created on enqueue, removed after a successful replay,
/// never modified in between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    pub id: String,
    pub mutation: PendingMutation,
    pub created_at: String,
}

impl PendingAction {
    pub fn new(mutation: PendingMutation) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            mutation,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn kind(&self) -> PendingActionKind {
        self.mutation.kind()
    }
}

/// Durable queue of pending actions, shared by the foreground (enqueue) and
/// the sync drainer (list/remove).
#[async_trait]
pub trait PendingActionRepository: Send + Sync {
    async fn enqueue(&self, mutation: PendingMutation) -> Result<PendingAction>;

    /// Queued actions of one category, oldest first.
    async fn list(&self, kind: PendingActionKind) -> Result<Vec<PendingAction>>;

    async fn remove(&self, id: &str) -> Result<bool>;

    async fn count(&self) -> Result<usize>;
}

/// In-memory queue for ephemeral deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryPendingActions {
    actions: Mutex<Vec<PendingAction>>,
}

impl MemoryPendingActions {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingActionRepository for MemoryPendingActions {
    async fn enqueue(&self, mutation: PendingMutation) -> Result<PendingAction> {
        let action = PendingAction::new(mutation);
        self.actions.lock().await.push(action.clone());
        Ok(action)
    }

    async fn list(&self, kind: PendingActionKind) -> Result<Vec<PendingAction>> {
        Ok(self
            .actions
            .lock()
            .await
            .iter()
            .filter(|a| a.kind() == kind)
            .cloned()
            .collect())
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let mut actions = self.actions.lock().await;
        let before = actions.len();
        actions.retain(|a| a.id != id);
        Ok(actions.len() != before)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.actions.lock().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_tags_round_trip_to_kinds() {
        for kind in PendingActionKind::ALL {
            assert_eq!(PendingActionKind::from_sync_tag(kind.sync_tag()).unwrap(), kind);
        }
        assert!(matches!(
            PendingActionKind::from_sync_tag("sync-payroll"),
            Err(Error::UnknownSyncTag(_))
        ));
    }

    #[test]
    fn mutation_is_tagged_by_kind() {
        let mutation: PendingMutation = serde_json::from_value(serde_json::json!({
            "kind": "offline_action",
            "url": "/api/materials/7",
            "method": "PATCH",
            "body": "{\"qty\":3}"
        }))
        .unwrap();
        assert_eq!(mutation.kind(), PendingActionKind::OfflineAction);
        match mutation {
            PendingMutation::OfflineAction { headers, body, .. } => {
                assert!(headers.is_empty());
                assert_eq!(body.as_deref(), Some("{\"qty\":3}"));
            }
            other => panic!("unexpected mutation {:?}", other),
        }
    }
}
