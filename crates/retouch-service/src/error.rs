//! Service error taxonomy and retry classification.

use std::time::Duration;

use thiserror::Error;

/// Message fragments that indicate an overloaded backend when no structured
/// status is available.
const OVERLOAD_PATTERNS: &[&str] = &[
    "overloaded",
    "resource exhausted",
    "rate limit",
    "too many requests",
    "try again later",
    "temporarily unavailable",
];

/// Errors from a single edit attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The backend is busy; retrying unchanged may succeed.
    #[error("Service is busy{}: {message}", status_suffix(.status))]
    Transient {
        status: Option<u16>,
        message: String,
    },

    /// The request was rejected and retrying will not help.
    #[error("Service rejected the request{}: {message}", status_suffix(.status))]
    Terminal {
        status: Option<u16>,
        message: String,
    },

    /// Missing or rejected API key. Poisons the rest of a batch round.
    #[error("API key missing or rejected: {0}")]
    Credential(String),

    /// The response carried no image.
    #[error("The service returned no image{}", detail_suffix(.0))]
    EmptyResponse(Option<String>),

    /// An attempt exceeded its deadline.
    #[error("Request timed out after {}s", whole_seconds(.0))]
    Timeout(Duration),

    /// Transport failure before an HTTP status was received.
    #[error("Network error: {0}")]
    Network(String),

    /// The response body could not be understood.
    #[error("Malformed response: {0}")]
    InvalidResponse(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

fn whole_seconds(duration: &Duration) -> u64 {
    duration.as_secs()
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

impl ServiceError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Transient { .. } | ServiceError::Timeout(_))
    }

    pub fn is_credential(&self) -> bool {
        matches!(self, ServiceError::Credential(_))
    }

    /// Classify a failed response.
    ///
    /// The structured API status (`RESOURCE_EXHAUSTED`, `UNAVAILABLE`, ...) is
    /// checked first, then the HTTP status, and only then the message text.
    pub fn classify(http_status: Option<u16>, api_status: Option<&str>, message: &str) -> Self {
        let message = message.trim().to_string();
        let lower = message.to_lowercase();

        match api_status {
            Some("RESOURCE_EXHAUSTED" | "UNAVAILABLE") => {
                return ServiceError::Transient {
                    status: http_status,
                    message,
                }
            }
            Some("UNAUTHENTICATED" | "PERMISSION_DENIED") => {
                return ServiceError::Credential(message)
            }
            _ => {}
        }

        match http_status {
            Some(429 | 503) => {
                return ServiceError::Transient {
                    status: http_status,
                    message,
                }
            }
            Some(401 | 403) => return ServiceError::Credential(message),
            _ => {}
        }

        if lower.contains("api key") {
            return ServiceError::Credential(message);
        }
        if api_status.is_none() && OVERLOAD_PATTERNS.iter().any(|p| lower.contains(p)) {
            return ServiceError::Transient {
                status: http_status,
                message,
            };
        }
        ServiceError::Terminal {
            status: http_status,
            message,
        }
    }
}
