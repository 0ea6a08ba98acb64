//! Replays queued mutations when connectivity returns.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;

use super::{
    classify_http_status, PendingAction, PendingActionKind, PendingActionRepository,
    PendingMutation, ReplayRetryClass,
};
use crate::errors::{Error, Result};
use crate::http::{resolve_url, FetchRequest, RequestMethod, RequestMode};
use crate::network::Network;

pub const DAILY_REPORTS_ENDPOINT: &str = "/api/daily-reports";
pub const ATTENDANCE_ENDPOINT: &str = "/api/attendance";
pub const MATERIAL_REQUESTS_ENDPOINT: &str = "/api/materials/requests";

/// Outcome of draining one sync tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncDrainReport {
    pub tag: String,
    pub attempted: usize,
    pub replayed: usize,
    pub failed: usize,
}

pub struct SyncDrainer {
    actions: Arc<dyn PendingActionRepository>,
    network: Arc<dyn Network>,
    origin_url: String,
}

impl SyncDrainer {
    pub fn new(
        actions: Arc<dyn PendingActionRepository>,
        network: Arc<dyn Network>,
        origin_url: impl Into<String>,
    ) -> Self {
        Self {
            actions,
            network,
            origin_url: origin_url.into(),
        }
    }

    /// Drain the category named by `tag`.
    ///
    /// Each item is isolated: a failed replay is logged, left queued, and the
    /// rest of the batch continues. There is no backoff; the item is retried
    /// on the next trigger.
    pub async fn drain(&self, tag: &str) -> Result<SyncDrainReport> {
        let kind = PendingActionKind::from_sync_tag(tag)?;
        let queued = self.actions.list(kind).await?;
        let mut report = SyncDrainReport {
            tag: tag.to_string(),
            attempted: queued.len(),
            replayed: 0,
            failed: 0,
        };

        if queued.is_empty() {
            debug!("[Sync] Nothing queued for {}", tag);
            return Ok(report);
        }

        for action in queued {
            match self.replay(&action).await {
                Ok(()) => match self.actions.remove(&action.id).await {
                    Ok(_) => report.replayed += 1,
                    Err(err) => {
                        // Replayed but still queued; the origin will see it again.
                        warn!("[Sync] Replayed {} but could not dequeue it: {}", action.id, err);
                        report.failed += 1;
                    }
                },
                Err(err) => {
                    warn!("[Sync] Replay of {} ({}) failed: {}", action.id, tag, err);
                    report.failed += 1;
                }
            }
        }

        info!(
            "[Sync] {}: replayed {}/{} ({} left queued)",
            tag, report.replayed, report.attempted, report.failed
        );
        Ok(report)
    }

    /// Drain every category in turn; a failing category does not stop the others.
    pub async fn drain_all(&self) -> Vec<SyncDrainReport> {
        let mut reports = Vec::with_capacity(PendingActionKind::ALL.len());
        for kind in PendingActionKind::ALL {
            match self.drain(kind.sync_tag()).await {
                Ok(report) => reports.push(report),
                Err(err) => warn!("[Sync] Draining {} failed: {}", kind.sync_tag(), err),
            }
        }
        reports
    }

    async fn replay(&self, action: &PendingAction) -> Result<()> {
        let request = self.replay_request(&action.mutation)?;
        let response = self.network.fetch(&request).await?;
        if response.is_success() {
            return Ok(());
        }

        let class = classify_http_status(response.status);
        if class != ReplayRetryClass::Retryable {
            warn!(
                "[Sync] {} rejected with {} ({:?}); keeping it queued",
                action.id, response.status, class
            );
        }
        Err(Error::InvalidRequest(format!(
            "origin answered {} for {} {}",
            response.status,
            request.method.as_str(),
            request.url
        )))
    }

    /// Rebuild the HTTP request a queued mutation stands for.
    pub fn replay_request(&self, mutation: &PendingMutation) -> Result<FetchRequest> {
        match mutation {
            PendingMutation::DailyReport { report } => {
                FetchRequest::post_json(self.endpoint(DAILY_REPORTS_ENDPOINT)?, report)
            }
            PendingMutation::Attendance { record } => {
                FetchRequest::post_json(self.endpoint(ATTENDANCE_ENDPOINT)?, record)
            }
            PendingMutation::MaterialRequest { request } => {
                FetchRequest::post_json(self.endpoint(MATERIAL_REQUESTS_ENDPOINT)?, request)
            }
            PendingMutation::OfflineAction {
                url,
                method,
                headers,
                body,
            } => Ok(FetchRequest {
                method: RequestMethod::parse(method),
                url: self.endpoint(url)?,
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                body: body.as_ref().map(|b| b.clone().into_bytes()),
                mode: RequestMode::Cors,
                destination: Default::default(),
                referrer: None,
            }),
        }
    }

    fn endpoint(&self, path: &str) -> Result<String> {
        resolve_url(&self.origin_url, path)
    }
}
