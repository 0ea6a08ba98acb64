//! HTTP client for the site-management origin.
//!
//! Every status the origin answers with is passed back as a response; only a
//! transport failure is an error.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use sitecache_core::http::resolve_url;
use sitecache_core::{FetchRequest, HttpResponse, Network};

use crate::error::{OriginError, Result};

/// Default timeout for origin requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Connection-scoped headers that must not be forwarded in either direction.
const HOP_BY_HOP_HEADERS: [&str; 10] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone)]
pub struct OriginClient {
    client: reqwest::Client,
    base_url: String,
}

impl OriginClient {
    fn log_response(status: reqwest::StatusCode, url: &str, body: &[u8]) {
        if status.is_success() || status.is_redirection() {
            debug!("[Origin] {} -> {}", url, status);
            return;
        }

        let text = String::from_utf8_lossy(body);
        let mut preview = text.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if text.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("[Origin] {} -> {}: {}", url, status, preview);
    }

    /// Create a client for the origin at `base_url` (e.g. "https://site.example").
    ///
    /// Redirects are not followed: the app sees them as the origin sent them.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `request` to the origin. Relative URLs resolve against the base URL.
    pub async fn send(&self, request: &FetchRequest) -> Result<HttpResponse> {
        let url = resolve_url(&self.base_url, &request.url)
            .map_err(|e| OriginError::invalid_request(e.to_string()))?;
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|_| {
                OriginError::invalid_request(format!("method {}", request.method.as_str()))
            })?;

        let mut builder = self
            .client
            .request(method, &url)
            .headers(Self::request_headers(request)?);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = Self::response_headers(response.headers());
        let body = response.bytes().await?.to_vec();
        Self::log_response(status, &url, &body);

        Ok(HttpResponse::new(status.as_u16(), headers, body))
    }

    fn request_headers(request: &FetchRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            if is_hop_by_hop(name) {
                continue;
            }
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| OriginError::invalid_request(format!("header name {name}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| OriginError::invalid_request(format!("header value for {name}")))?;
            headers.append(header_name, header_value);
        }
        Ok(headers)
    }

    fn response_headers(headers: &HeaderMap) -> Vec<(String, String)> {
        headers
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl Network for OriginClient {
    async fn fetch(&self, request: &FetchRequest) -> sitecache_core::Result<HttpResponse> {
        Ok(self.send(request).await?)
    }
}
