//! Service configuration.
//!
//! Defaults are usable as-is apart from the API key. Values can come from an
//! embedded JSON document ([`ServiceConfig::from_json`]) or the process
//! environment ([`ServiceConfig::from_env`]).

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::retry::RetryPolicy;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-pro-image-preview";
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid config document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Connection, retry and concurrency settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Absent keys are reported per request as a credential error.
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_jitter_ms: u64,
    pub attempt_timeout_ms: u64,
    /// `None` means unbounded.
    pub max_concurrent: Option<usize>,
    /// Longest edge of import previews.
    pub preview_edge: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_retries: 5,
            base_delay_ms: 1000,
            max_jitter_ms: 500,
            attempt_timeout_ms: 120_000,
            max_concurrent: Some(DEFAULT_MAX_CONCURRENT),
            preview_edge: retouch_core::DEFAULT_PREVIEW_EDGE,
        }
    }
}

impl ServiceConfig {
    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str::<Self>(json)?.validate()
    }

    /// Defaults overridden by environment variables.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `GEMINI_API_KEY`, else `API_KEY` | `api_key` |
    /// | `RETOUCH_ENDPOINT` | `endpoint` |
    /// | `RETOUCH_MODEL` | `model` |
    /// | `RETOUCH_MAX_CONCURRENT` (`0` = unbounded) | `max_concurrent` |
    /// | `RETOUCH_ATTEMPT_TIMEOUT_MS` | `attempt_timeout_ms` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        config.api_key = non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY"));
        if let Some(endpoint) = non_empty("RETOUCH_ENDPOINT") {
            config.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(model) = non_empty("RETOUCH_MODEL") {
            config.model = model;
        }
        if let Some(raw) = non_empty("RETOUCH_MAX_CONCURRENT") {
            let limit: usize = parse_number("RETOUCH_MAX_CONCURRENT", &raw)?;
            config.max_concurrent = (limit > 0).then_some(limit);
        }
        if let Some(raw) = non_empty("RETOUCH_ATTEMPT_TIMEOUT_MS") {
            let ms: u64 = parse_number("RETOUCH_ATTEMPT_TIMEOUT_MS", &raw)?;
            if ms == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "RETOUCH_ATTEMPT_TIMEOUT_MS",
                    value: raw,
                    reason: "must be positive".to_string(),
                });
            }
            config.attempt_timeout_ms = ms;
        }
        config.validate()
    }

    /// Checks shared by every source. A zero concurrency limit means unbounded.
    fn validate(mut self) -> Result<Self, ConfigError> {
        if self.attempt_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "attempt_timeout_ms",
                value: self.attempt_timeout_ms.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.max_concurrent == Some(0) {
            self.max_concurrent = None;
        }
        Ok(self)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_jitter: Duration::from_millis(self.max_jitter_ms),
        }
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
