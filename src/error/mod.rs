//! Error types for the image broker.
//!
//! The taxonomy is deliberately flat: callers mostly care whether a failure is
//! a rate-limit signal (retried by the broker) or terminal (everything else).

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Result type alias for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Top-level error type for the image broker.
#[derive(Error, Debug, Clone)]
pub enum BrokerError {
    /// No API credential was configured. Raised on the first upstream call,
    /// not at construction time.
    #[error("missing API credential")]
    MissingCredential,

    /// Invalid client configuration.
    #[error("invalid configuration: {message}")]
    Configuration {
        /// What was wrong with the configuration.
        message: String,
    },

    /// An empty or otherwise unusable prompt/instruction.
    #[error("invalid prompt: {message}")]
    InvalidPrompt {
        /// What was wrong with the prompt.
        message: String,
    },

    /// Malformed image payload handed to `edit`.
    #[error("invalid image data: {message}")]
    InvalidImageData {
        /// What was wrong with the payload.
        message: String,
    },

    /// The upstream service signalled that the request rate was exceeded.
    #[error("rate limited by upstream service")]
    RateLimited {
        /// Server-provided wait hint, when present.
        retry_after: Option<Duration>,
    },

    /// A rate-limited request failed on every permitted attempt.
    #[error("rate limit persisted after {attempts} attempts")]
    RetriesExhausted {
        /// Total attempts made, including the initial one.
        attempts: u32,
    },

    /// The upstream call succeeded at the transport level but the response
    /// carried no usable image part.
    #[error("upstream returned no image data")]
    NoImageProduced,

    /// Any other upstream service failure.
    #[error("upstream error (HTTP {status}): {message}")]
    Upstream {
        /// HTTP status code returned by the service.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },

    /// Connection-level failure before a response was received.
    #[error("network error: {message}")]
    Network {
        /// Description of the transport failure.
        message: String,
    },

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The response body could not be decoded.
    #[error("failed to decode response: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },
}

impl BrokerError {
    /// Returns true if this error is a rate-limit signal that warrants a
    /// retry with backoff.
    ///
    /// An explicit 429 maps to [`BrokerError::RateLimited`] during response
    /// parsing; additionally, upstream messages mentioning a quota or rate
    /// limit are classified as rate-limit signals regardless of status code.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            BrokerError::RateLimited { .. } => true,
            BrokerError::Upstream { status, message } => {
                *status == 429 || message_signals_rate_limit(message)
            }
            _ => false,
        }
    }

    /// Returns the server-provided retry-after hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            BrokerError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BrokerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BrokerError::Timeout
        } else {
            BrokerError::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(err: serde_json::Error) -> Self {
        BrokerError::Decode {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for BrokerError {
    fn from(err: url::ParseError) -> Self {
        BrokerError::Configuration {
            message: format!("invalid URL: {err}"),
        }
    }
}

/// Structured error body returned by the Gemini API.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    /// The error detail payload.
    pub error: ApiErrorDetail,
}

/// Detail section of a structured API error.
#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    /// Numeric error code (mirrors the HTTP status).
    #[serde(default)]
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Canonical status string, e.g. `RESOURCE_EXHAUSTED`.
    #[serde(default)]
    pub status: String,
}

/// Maps a non-success HTTP response to a [`BrokerError`].
///
/// Parses the structured `{"error": {...}}` body when present and falls back
/// to the raw text otherwise. A 429, a `RESOURCE_EXHAUSTED` status, or a
/// message carrying a quota indicator all map to [`BrokerError::RateLimited`].
pub fn map_status(status: u16, retry_after: Option<Duration>, body: &[u8]) -> BrokerError {
    let (message, canonical) = match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(parsed) => (parsed.error.message, parsed.error.status),
        Err(_) => (String::from_utf8_lossy(body).into_owned(), String::new()),
    };

    if status == 429
        || canonical.eq_ignore_ascii_case("RESOURCE_EXHAUSTED")
        || message_signals_rate_limit(&message)
    {
        return BrokerError::RateLimited { retry_after };
    }

    BrokerError::Upstream { status, message }
}

/// Returns true if an error message carries a rate-limit or quota indicator.
fn message_signals_rate_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("429") || lower.contains("quota") || lower.contains("rate limit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_classified_for_retry() {
        let err = BrokerError::RateLimited { retry_after: None };
        assert!(err.is_rate_limit());

        let err = BrokerError::Upstream {
            status: 503,
            message: "quota exceeded for project".to_string(),
        };
        assert!(err.is_rate_limit());
    }

    #[test]
    fn terminal_errors_are_not_rate_limits() {
        assert!(!BrokerError::MissingCredential.is_rate_limit());
        assert!(!BrokerError::NoImageProduced.is_rate_limit());
        assert!(!BrokerError::Upstream {
            status: 500,
            message: "internal".to_string(),
        }
        .is_rate_limit());
    }

    #[test]
    fn retry_after_only_on_rate_limits() {
        let err = BrokerError::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        assert_eq!(BrokerError::Timeout.retry_after(), None);
    }

    #[test]
    fn map_status_parses_structured_body() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = map_status(429, Some(Duration::from_secs(10)), body.as_bytes());
        assert!(matches!(
            err,
            BrokerError::RateLimited {
                retry_after: Some(d)
            } if d == Duration::from_secs(10)
        ));
    }

    #[test]
    fn map_status_sniffs_quota_messages() {
        let body = r#"{"error":{"code":403,"message":"Quota exceeded for requests per minute","status":"PERMISSION_DENIED"}}"#;
        let err = map_status(403, None, body.as_bytes());
        assert!(matches!(err, BrokerError::RateLimited { .. }));
    }

    #[test]
    fn map_status_falls_back_to_raw_text() {
        let err = map_status(500, None, b"something broke");
        match err {
            BrokerError::Upstream { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "something broke");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }
}
