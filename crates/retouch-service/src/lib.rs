//! Retouch Service - generative edit dispatch
//!
//! This crate drives edits against the image model: a [`GeminiClient`]
//! behind the [`EditService`] seam, retry with exponential backoff, a batch
//! [`Orchestrator`] with bounded concurrency and per-asset failure isolation,
//! and the [`Session`] facade that ties assets, options and the viewport
//! together.
//!
//! # Example
//!
//! ```ignore
//! use retouch_service::{GeminiClient, ServiceConfig, Session};
//!
//! let config = ServiceConfig::from_env()?;
//! let session = Session::new(GeminiClient::new(&config), &config);
//! session.add_assets(files);
//! let report = session.start_batch().await;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod gemini;
pub mod orchestrator;
pub mod retry;
pub mod session;

pub use client::EditService;
pub use config::{ConfigError, ServiceConfig};
pub use error::ServiceError;
pub use gemini::GeminiClient;
pub use orchestrator::{BatchReport, EditError, Orchestrator, SharedRegistry};
pub use retry::{retry_with_backoff, RetryOutcome, RetryPolicy};
pub use session::{AssetSummary, ImportReport, Session};
