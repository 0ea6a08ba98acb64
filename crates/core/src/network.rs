//! Origin network seam.

use async_trait::async_trait;

use crate::errors::Result;
use crate::http::{FetchRequest, HttpResponse};

/// Reaches the origin.
///
/// Any HTTP status is an `Ok`; `Err(Error::Network)` means the origin could
/// not be reached at all, which is what the fallback strategies react to.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<HttpResponse>;
}
