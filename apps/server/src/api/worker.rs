//! Control endpoints: the events a browser would deliver to a service worker,
//! exposed over HTTP so the host (or an operator) can trigger them.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sitecache_core::notifications::{ClickOutcome, PushOutcome};
use sitecache_core::{
    ActivationReport, CacheNames, NotificationClick, PendingAction, PendingMutation,
    SyncDrainReport, WorkerState,
};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::events::{ServerEvent, SYNC_COMPLETE};
use crate::main_lib::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkerStatus {
    state: WorkerState,
    origin_url: String,
    cache_names: CacheNames,
    pending_actions: usize,
    connected_clients: usize,
}

#[derive(Debug, Deserialize)]
struct ConnectQuery {
    url: Option<String>,
    #[serde(default)]
    focused: bool,
}

async fn status(State(state): State<Arc<AppState>>) -> ApiResult<Json<WorkerStatus>> {
    let worker = &state.worker;
    Ok(Json(WorkerStatus {
        state: worker.state().await,
        origin_url: worker.config().origin_url.clone(),
        cache_names: worker.config().cache_names.clone(),
        pending_actions: worker.pending_count().await?,
        connected_clients: state.clients.count().await,
    }))
}

async fn install(State(state): State<Arc<AppState>>) -> ApiResult<Json<ActivationReport>> {
    let report = state.worker.install().await?;
    info!(
        "Worker installed: {} stale partition(s) deleted, {} client(s) claimed",
        report.deleted_partitions.len(),
        report.claimed_clients
    );
    Ok(Json(report))
}

async fn activate(State(state): State<Arc<AppState>>) -> ApiResult<Json<ActivationReport>> {
    Ok(Json(state.worker.activate().await?))
}

fn publish_sync(state: &AppState, reports: &[SyncDrainReport]) {
    if let Ok(payload) = serde_json::to_value(reports) {
        state
            .event_bus
            .publish(ServerEvent::with_payload(SYNC_COMPLETE, payload));
    }
}

async fn sync_all(State(state): State<Arc<AppState>>) -> Json<Vec<SyncDrainReport>> {
    let reports = state.worker.sync_all().await;
    publish_sync(&state, &reports);
    Json(reports)
}

async fn sync_tag(
    State(state): State<Arc<AppState>>,
    Path(tag): Path<String>,
) -> ApiResult<Json<SyncDrainReport>> {
    let report = state.worker.sync(&tag).await?;
    publish_sync(&state, std::slice::from_ref(&report));
    Ok(Json(report))
}

async fn push(State(state): State<Arc<AppState>>, body: Bytes) -> Json<PushOutcome> {
    let raw = (!body.is_empty()).then_some(body.as_ref());
    Json(state.worker.push(raw).await)
}

async fn notification_click(
    State(state): State<Arc<AppState>>,
    Json(click): Json<NotificationClick>,
) -> Json<ClickOutcome> {
    Json(state.worker.notification_click(&click).await)
}

async fn enqueue_pending_action(
    State(state): State<Arc<AppState>>,
    Json(mutation): Json<PendingMutation>,
) -> ApiResult<(StatusCode, Json<PendingAction>)> {
    let action = state.worker.enqueue_pending(mutation).await?;
    Ok((StatusCode::CREATED, Json(action)))
}

async fn pending_action_count(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<serde_json::Value>> {
    let count = state.worker.pending_count().await?;
    Ok(Json(json!({ "count": count })))
}

async fn events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let url = query
        .url
        .or_else(|| {
            headers
                .get(axum::http::header::REFERER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("{}/", state.config.worker.app_base_url()));
    debug!("Event stream opened for {}", url);

    let stream = Arc::clone(&state.clients).connect(url, query.focused).await;
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn focus_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.clients.focus(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Client {id} is not connected")))
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/__sw/status", get(status))
        .route("/__sw/install", post(install))
        .route("/__sw/activate", post(activate))
        .route("/__sw/sync", post(sync_all))
        .route("/__sw/sync/{tag}", post(sync_tag))
        .route("/__sw/push", post(push))
        .route("/__sw/notification-click", post(notification_click))
        .route(
            "/__sw/pending-actions",
            get(pending_action_count).post(enqueue_pending_action),
        )
        .route("/__sw/events", get(events))
        .route("/__sw/clients/{id}/focus", post(focus_client))
}
