//! Client for the origin the gateway fronts.

pub mod client;
pub mod error;

pub use client::{is_hop_by_hop, OriginClient};
pub use error::{OriginError, Result};
