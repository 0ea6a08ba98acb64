//! Everything that is not a control route goes through the worker, the way a
//! page's fetches go through its service worker.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, request::Parts, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use sitecache_core::{FetchRequest, HttpResponse, RequestDestination, RequestMethod, RequestMode};
use sitecache_origin::is_hop_by_hop;
use tracing::{debug, warn};

use crate::main_lib::AppState;

/// Largest request body forwarded to the origin.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub async fn handle(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!("Rejected request body for {}: {}", parts.uri, err);
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };
    let fetch = to_fetch_request(&state.config.worker.origin_url, &parts, body.to_vec());

    if let Some(response) = state.worker.handle_fetch(&fetch).await {
        return into_response(response);
    }

    match state.origin.send(&fetch).await {
        Ok(response) => into_response(response),
        Err(err) => {
            warn!("Pass-through to origin failed for {}: {}", fetch.url, err);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

pub(crate) fn to_fetch_request(origin_url: &str, parts: &Parts, body: Vec<u8>) -> FetchRequest {
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let headers = parts
        .headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    FetchRequest {
        method: RequestMethod::parse(parts.method.as_str()),
        url: format!("{}{}", origin_url.trim_end_matches('/'), path),
        headers,
        body: (!body.is_empty()).then_some(body),
        mode: header_str(parts, "sec-fetch-mode")
            .map(RequestMode::parse)
            .unwrap_or_default(),
        destination: header_str(parts, "sec-fetch-dest")
            .map(RequestDestination::parse)
            .unwrap_or_default(),
        referrer: header_str(parts, header::REFERER.as_str()).map(str::to_string),
    }
}

pub(crate) fn into_response(response: HttpResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() = status;

    let headers = out.headers_mut();
    for (name, value) in &response.headers {
        if is_hop_by_hop(name) {
            continue;
        }
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => debug!("Dropped unrepresentable header {}", name),
        }
    }
    out
}
