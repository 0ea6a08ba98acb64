//! Request/response model shared by the classifier, strategies and collaborators.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::errors::{Error, Result};

/// HTTP request method.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestMethod {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Other(String),
}

impl RequestMethod {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "OPTIONS" => Self::Options,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Other(method) => method.as_str(),
        }
    }
}

/// Request mode, as reported by `Sec-Fetch-Mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
    Websocket,
}

impl RequestMode {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "navigate" => Self::Navigate,
            "same-origin" => Self::SameOrigin,
            "cors" => Self::Cors,
            "websocket" => Self::Websocket,
            _ => Self::NoCors,
        }
    }
}

/// Resource type the request is for, as reported by `Sec-Fetch-Dest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestDestination {
    #[default]
    Empty,
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    Other,
}

impl RequestDestination {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "empty" => Self::Empty,
            "document" | "iframe" | "frame" => Self::Document,
            "image" => Self::Image,
            "script" | "worker" | "sharedworker" => Self::Script,
            "style" => Self::Style,
            "font" => Self::Font,
            "manifest" => Self::Manifest,
            _ => Self::Other,
        }
    }
}

/// An intercepted outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub method: RequestMethod,
    /// Absolute URL.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub mode: RequestMode,
    pub destination: RequestDestination,
    pub referrer: Option<String>,
}

impl FetchRequest {
    /// A plain GET, the shape every pre-cache and silent-update request takes.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: RequestMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            mode: RequestMode::NoCors,
            destination: RequestDestination::Empty,
            referrer: None,
        }
    }

    /// A JSON POST used for side-effect calls and sync replays.
    pub fn post_json(url: impl Into<String>, payload: &serde_json::Value) -> Result<Self> {
        Ok(Self {
            method: RequestMethod::Post,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(serde_json::to_vec(payload)?),
            mode: RequestMode::Cors,
            destination: RequestDestination::Empty,
            referrer: None,
        })
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_destination(mut self, destination: RequestDestination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    /// Replace (or add) a header, case-insensitively.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn parsed_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.url)?)
    }

    /// Cache key: the URL without its fragment.
    pub fn cache_key(&self) -> String {
        cache_key_for(&self.url)
    }

    /// Cache key for responses that may belong to one user. A request that
    /// carries credentials gets a key scoped to a digest of them, so one
    /// session's cached copy is never served to another.
    pub fn private_cache_key(&self) -> String {
        let key = self.cache_key();
        match credential_scope(&self.headers) {
            Some(scope) => format!("{key}#{CREDENTIAL_SCOPE_PREFIX}{scope}"),
            None => key,
        }
    }
}

/// A response produced by the origin, read from a partition, or synthesized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Bare response with no headers and an empty body.
    pub fn empty(status: u16) -> Self {
        Self::new(status, Vec::new(), Vec::new())
    }

    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(
            status,
            vec![("Content-Type".to_string(), "application/json".to_string())],
            value.to_string().into_bytes(),
        )
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Request headers that identify whose response it is.
const CREDENTIAL_HEADERS: [&str; 2] = ["authorization", "cookie"];
const CREDENTIAL_SCOPE_PREFIX: &str = "scope=";
const CREDENTIAL_SCOPE_BYTES: usize = 16;

fn credential_scope(headers: &[(String, String)]) -> Option<String> {
    let mut hasher = Sha256::new();
    let mut found = false;
    for name in CREDENTIAL_HEADERS {
        if let Some(value) = find_header(headers, name) {
            hasher.update(name.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
            found = true;
        }
    }
    if !found {
        return None;
    }
    let digest = hasher.finalize();
    Some(
        digest
            .iter()
            .take(CREDENTIAL_SCOPE_BYTES)
            .map(|b| format!("{b:02x}"))
            .collect(),
    )
}

pub fn cache_key_for(url: &str) -> String {
    match url.split_once('#') {
        Some((without_fragment, _)) => without_fragment.to_string(),
        None => url.to_string(),
    }
}

/// Join an app-relative path onto the origin base URL.
pub fn resolve_url(base: &str, path: &str) -> Result<String> {
    if path.starts_with("http://") || path.starts_with("https://") {
        return Ok(path.to_string());
    }
    let base = Url::parse(base).map_err(|e| Error::invalid_request(format!("bad base: {e}")))?;
    Ok(base.join(path)?.to_string())
}

/// Path component of a URL, or the input itself when it is already a path.
pub fn path_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}
