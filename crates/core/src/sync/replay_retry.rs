//! Classification of failed replays, for logging.

use serde::{Deserialize, Serialize};

/// How a failed replay is expected to behave on the next sync trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayRetryClass {
    /// Offline or transient server failure; the next trigger will likely succeed.
    Retryable,
    /// The origin rejected the payload; retrying will not change the answer.
    Permanent,
    /// The session expired; replays succeed only after the user signs in again.
    ReauthRequired,
}

/// Classify an HTTP status returned by a replay.
pub fn classify_http_status(status: u16) -> ReplayRetryClass {
    match status {
        401 | 403 => ReplayRetryClass::ReauthRequired,
        408 | 409 | 423 | 425 | 429 => ReplayRetryClass::Retryable,
        500..=599 => ReplayRetryClass::Retryable,
        _ => ReplayRetryClass::Permanent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_http_status_for_replay_logging() {
        assert_eq!(classify_http_status(500), ReplayRetryClass::Retryable);
        assert_eq!(classify_http_status(429), ReplayRetryClass::Retryable);
        assert_eq!(classify_http_status(401), ReplayRetryClass::ReauthRequired);
        assert_eq!(classify_http_status(400), ReplayRetryClass::Permanent);
    }
}
