//! Batch and single-asset dispatch.
//!
//! A batch claims every pending or errored asset up front, then drives all
//! requests from one task with at most `max_concurrent` in flight. Each
//! request retries independently; a failure only ever marks its own asset.
//! The registry lock is taken for short synchronous sections and never held
//! across an await.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use log::{debug, info, warn};
use thiserror::Error;

use retouch_core::encode::EncodeError;
use retouch_core::{
    AssetId, AssetRegistry, AssetStatus, EncodedImage, GeometrySyncError, MaskOverlay,
    ProcessingOptions, ProcessingRequest, ProjectNotes, RegistryError, RequestBuilder,
    StandardRequestBuilder,
};

use crate::client::EditService;
use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::retry::{retry_with_backoff, RetryPolicy};

/// Errors from a single masked edit.
#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Mask and image disagree on size; the mask was discarded.
    #[error(transparent)]
    GeometrySync(#[from] GeometrySyncError),

    #[error("Could not serialize the mask: {0}")]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("No asset is selected")]
    NoSelection,
}

/// What a batch run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub dispatched: usize,
    pub completed: Vec<AssetId>,
    pub failed: Vec<(AssetId, String)>,
    /// Service attempts across all assets, retries included.
    pub attempts: u32,
}

/// Shared handle to the registry.
pub type SharedRegistry = Arc<Mutex<AssetRegistry>>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct BatchGuard<'a>(&'a AtomicUsize);

impl<'a> BatchGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Settled {
    asset: AssetId,
    attempts: u32,
    result: Result<(), String>,
}

/// Dispatches edit requests and records their outcome in the registry.
pub struct Orchestrator<S, B = StandardRequestBuilder> {
    service: S,
    builder: B,
    registry: SharedRegistry,
    policy: RetryPolicy,
    attempt_timeout: Duration,
    max_concurrent: Option<usize>,
    running_batches: AtomicUsize,
}

impl<S: EditService> Orchestrator<S> {
    pub fn new(service: S, registry: SharedRegistry, config: &ServiceConfig) -> Self {
        Self::with_builder(service, StandardRequestBuilder, registry, config)
    }
}

impl<S: EditService, B: RequestBuilder> Orchestrator<S, B> {
    pub fn with_builder(
        service: S,
        builder: B,
        registry: SharedRegistry,
        config: &ServiceConfig,
    ) -> Self {
        Self {
            service,
            builder,
            registry,
            policy: config.retry_policy(),
            attempt_timeout: config.attempt_timeout(),
            max_concurrent: config.max_concurrent,
            running_batches: AtomicUsize::new(0),
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// True while a batch has requests that have not settled.
    pub fn is_batch_running(&self) -> bool {
        self.running_batches.load(Ordering::SeqCst) > 0
    }

    /// Process every pending or errored asset.
    pub async fn run_batch(&self, options: &ProcessingOptions, notes: &ProjectNotes) -> BatchReport {
        self.run_batch_with(options, notes, |_| {}).await
    }

    /// Like [`run_batch`](Self::run_batch), calling `on_settled` after each
    /// asset's status is written.
    pub async fn run_batch_with(
        &self,
        options: &ProcessingOptions,
        notes: &ProjectNotes,
        on_settled: impl Fn(AssetId),
    ) -> BatchReport {
        let requests = self.claim_batch(options, notes);
        if requests.is_empty() {
            debug!("batch: nothing to dispatch");
            return BatchReport::default();
        }

        let _running = BatchGuard::enter(&self.running_batches);
        let dispatched = requests.len();
        let limit = self.max_concurrent.unwrap_or(dispatched).max(1);
        info!("batch: dispatching {} assets ({} at a time)", dispatched, limit);

        // First credential failure of this round; later items fail fast with it.
        let poisoned = OnceLock::new();
        let mut settled = stream::iter(requests)
            .map(|request| self.process_batch_item(request, &poisoned))
            .buffer_unordered(limit);

        let mut report = BatchReport {
            dispatched,
            ..Default::default()
        };
        while let Some(outcome) = settled.next().await {
            report.attempts += outcome.attempts;
            match outcome.result {
                Ok(()) => report.completed.push(outcome.asset),
                Err(message) => report.failed.push((outcome.asset, message)),
            }
            on_settled(outcome.asset);
        }
        info!(
            "batch: {} completed, {} failed",
            report.completed.len(),
            report.failed.len()
        );
        report
    }

    fn claim_batch(&self, options: &ProcessingOptions, notes: &ProjectNotes) -> Vec<ProcessingRequest> {
        let mut registry = lock(&self.registry);
        let mut requests = Vec::new();
        for id in registry.dispatchable_ids() {
            if let Err(err) = registry.begin_processing(id) {
                warn!("batch: skipping {}: {}", id, err);
                continue;
            }
            if let Some(asset) = registry.get(id) {
                requests.push(self.builder.batch(asset, options, notes));
            }
        }
        requests
    }

    async fn process_batch_item(
        &self,
        request: ProcessingRequest,
        poisoned: &OnceLock<String>,
    ) -> Settled {
        let asset = request.asset;
        let (result, attempts) = match poisoned.get() {
            Some(message) => (Err(ServiceError::Credential(message.clone())), 0),
            None => {
                let outcome = retry_with_backoff(&self.policy, self.attempt_timeout, |_| {
                    self.service.edit(&request)
                })
                .await;
                if let Err(ServiceError::Credential(message)) = &outcome.result {
                    let _ = poisoned.set(message.clone());
                }
                (outcome.result, outcome.attempts)
            }
        };

        let result = match result {
            Ok(image) => {
                self.settle(asset, AssetStatus::Completed(image));
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                warn!("{} failed after {} attempts: {}", asset, attempts, message);
                self.settle(asset, AssetStatus::Error(message.clone()));
                Err(message)
            }
        };
        Settled {
            asset,
            attempts,
            result,
        }
    }

    fn settle(&self, asset: AssetId, status: AssetStatus) {
        if let Err(err) = lock(&self.registry).transition(asset, status) {
            // The asset was deleted while its request was in flight
            debug!("dropping outcome for {}: {}", asset, err);
        }
    }

    /// Edit one asset inside the region marked by `mask`.
    ///
    /// Runs outside any batch and leaves the batch flag alone. The mask is
    /// checked against the displayed image before anything is claimed, so a
    /// mismatch dispatches nothing. A failed edit leaves the asset in error
    /// with its message, like a failed batch item.
    ///
    /// # Errors
    ///
    /// `EditError::GeometrySync` for a mismatched mask,
    /// `EditError::Registry` if the asset is unknown or already processing,
    /// `EditError::Service` when the edit itself failed.
    pub async fn submit_masked_edit(
        &self,
        id: AssetId,
        options: &ProcessingOptions,
        mask: &MaskOverlay,
        replacement: Option<&str>,
    ) -> Result<EncodedImage, EditError> {
        let request = {
            let mut registry = lock(&self.registry);
            let asset = registry.get(id).ok_or(RegistryError::NotFound(id))?;
            let request = self.builder.masked(asset, options, mask, replacement)?;
            registry.begin_processing(id)?;
            request
        };
        info!("{}: masked edit dispatched", id);

        let outcome = retry_with_backoff(&self.policy, self.attempt_timeout, |_| {
            self.service.edit(&request)
        })
        .await;

        match outcome.result {
            Ok(image) => {
                self.settle(id, AssetStatus::Completed(image.clone()));
                Ok(image)
            }
            Err(err) => {
                warn!("{}: masked edit failed: {}", id, err);
                self.settle(id, AssetStatus::Error(err.to_string()));
                Err(err.into())
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{busy, image, imported, ScriptedService, Step};
    use super::*;
    use retouch_core::StatusKind;

    fn setup(n: usize, service: ScriptedService) -> (Orchestrator<ScriptedService>, Vec<AssetId>) {
        setup_with(n, service, ServiceConfig::default())
    }

    fn setup_with(
        n: usize,
        service: ScriptedService,
        config: ServiceConfig,
    ) -> (Orchestrator<ScriptedService>, Vec<AssetId>) {
        let mut registry = AssetRegistry::new();
        let ids = registry.add_all((0..n).map(|i| imported(&format!("{}.jpg", i))));
        let orchestrator = Orchestrator::new(service, Arc::new(Mutex::new(registry)), &config);
        (orchestrator, ids)
    }

    fn kind(orchestrator: &Orchestrator<ScriptedService>, id: AssetId) -> StatusKind {
        lock(orchestrator.registry()).get(id).unwrap().kind()
    }

    fn mask(width: u32, height: u32) -> MaskOverlay {
        let mut surface = retouch_core::MaskSurface::new();
        surface.resize(width, height, retouch_core::Rect::new(0.0, 0.0, 100.0, 100.0));
        surface.serialize().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_is_isolated() {
        let service = ScriptedService::default();
        let (orchestrator, ids) = setup(3, service);
        orchestrator.service().script(
            ids[1],
            [Step::Reply(Err(ServiceError::classify(Some(400), None, "bad image")))],
        );

        let report = orchestrator
            .run_batch(&ProcessingOptions::default(), &ProjectNotes::default())
            .await;

        assert_eq!(report.dispatched, 3);
        assert_eq!(report.completed.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, ids[1]);
        assert!(report.failed[0].1.contains("bad image"));

        assert_eq!(kind(&orchestrator, ids[0]), StatusKind::Completed);
        assert_eq!(kind(&orchestrator, ids[1]), StatusKind::Error);
        assert_eq!(kind(&orchestrator, ids[2]), StatusKind::Completed);
        let registry = lock(orchestrator.registry());
        assert!(registry.get(ids[1]).unwrap().error().unwrap().contains("bad image"));
        drop(registry);
        assert!(!orchestrator.is_batch_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rerun_only_dispatches_failed() {
        let (orchestrator, ids) = setup(3, ScriptedService::default());
        orchestrator.service().script(
            ids[2],
            [Step::Reply(Err(ServiceError::classify(Some(400), None, "nope")))],
        );
        let options = ProcessingOptions::default();
        let notes = ProjectNotes::default();

        orchestrator.run_batch(&options, &notes).await;
        let report = orchestrator.run_batch(&options, &notes).await;
        assert_eq!(report.dispatched, 1);
        assert_eq!(report.completed, vec![ids[2]]);

        let report = orchestrator.run_batch(&options, &notes).await;
        assert_eq!(report, BatchReport::default());
        assert_eq!(orchestrator.service().calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_retried_until_success() {
        let (orchestrator, ids) = setup(1, ScriptedService::default());
        orchestrator
            .service()
            .script(ids[0], [Step::Reply(Err(busy())), Step::Reply(Err(busy()))]);

        let started = tokio::time::Instant::now();
        let report = orchestrator
            .run_batch(&ProcessingOptions::default(), &ProjectNotes::default())
            .await;

        assert_eq!(report.completed, vec![ids[0]]);
        assert_eq!(report.attempts, 3);
        // 2s + 4s of backoff, plus jitter
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(6));
        assert!(elapsed <= Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_transient() {
        let (orchestrator, ids) = setup(1, ScriptedService::default());
        orchestrator.service().script(ids[0], [Step::Hang]);

        let report = orchestrator
            .run_batch(&ProcessingOptions::default(), &ProjectNotes::default())
            .await;
        assert_eq!(report.completed, vec![ids[0]]);
        assert_eq!(report.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_marks_error() {
        let config = ServiceConfig {
            max_retries: 2,
            ..Default::default()
        };
        let (orchestrator, ids) = setup_with(1, ScriptedService::default(), config);
        orchestrator.service().script(ids[0], vec![Step::Reply(Err(busy())); 3]);

        let report = orchestrator
            .run_batch(&ProcessingOptions::default(), &ProjectNotes::default())
            .await;
        assert_eq!(report.attempts, 3);
        assert_eq!(kind(&orchestrator, ids[0]), StatusKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_credential_error_poisons_round() {
        let config = ServiceConfig {
            max_concurrent: Some(1),
            ..Default::default()
        };
        let (orchestrator, ids) = setup_with(3, ScriptedService::default(), config);
        orchestrator.service().script(
            ids[0],
            [Step::Reply(Err(ServiceError::Credential("key rejected".into())))],
        );

        let report = orchestrator
            .run_batch(&ProcessingOptions::default(), &ProjectNotes::default())
            .await;

        assert_eq!(orchestrator.service().calls(), vec![ids[0]]);
        assert_eq!(report.failed.len(), 3);
        let registry = lock(orchestrator.registry());
        for id in &ids {
            assert!(registry.get(*id).unwrap().error().unwrap().contains("key rejected"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_credential_error_lets_in_flight_finish() {
        let config = ServiceConfig {
            max_concurrent: Some(3),
            ..Default::default()
        };
        let (orchestrator, ids) = setup_with(4, ScriptedService::default(), config);
        let slow = || [Step::After(Duration::from_secs(1), Ok(image(800, 600)))];
        orchestrator.service().script(
            ids[0],
            [Step::Reply(Err(ServiceError::Credential("key rejected".into())))],
        );
        orchestrator.service().script(ids[1], slow());
        orchestrator.service().script(ids[2], slow());

        let report = orchestrator
            .run_batch(&ProcessingOptions::default(), &ProjectNotes::default())
            .await;

        // The fourth item is started only after the credential error settled
        let mut calls = orchestrator.service().calls();
        calls.sort();
        assert_eq!(calls, ids[..3].to_vec());
        assert_eq!(kind(&orchestrator, ids[0]), StatusKind::Error);
        assert_eq!(kind(&orchestrator, ids[1]), StatusKind::Completed);
        assert_eq!(kind(&orchestrator, ids[2]), StatusKind::Completed);
        assert_eq!(kind(&orchestrator, ids[3]), StatusKind::Error);
        let registry = lock(orchestrator.registry());
        assert!(registry.get(ids[3]).unwrap().error().unwrap().contains("key rejected"));
        drop(registry);
        assert_eq!(report.completed.len(), 2);
        assert_eq!(report.failed.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let config = ServiceConfig {
            max_concurrent: Some(2),
            ..Default::default()
        };
        let service = ScriptedService::with_latency(Duration::from_secs(1));
        let (orchestrator, _) = setup_with(6, service, config);

        let report = orchestrator
            .run_batch(&ProcessingOptions::default(), &ProjectNotes::default())
            .await;
        assert_eq!(report.completed.len(), 6);
        assert_eq!(orchestrator.service().peak_in_flight(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_concurrency() {
        let config = ServiceConfig {
            max_concurrent: None,
            ..Default::default()
        };
        let service = ScriptedService::with_latency(Duration::from_secs(1));
        let (orchestrator, _) = setup_with(5, service, config);
        orchestrator
            .run_batch(&ProcessingOptions::default(), &ProjectNotes::default())
            .await;
        assert_eq!(orchestrator.service().peak_in_flight(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_flag_spans_run() {
        let service = ScriptedService::with_latency(Duration::from_secs(1));
        let (orchestrator, _) = setup(2, service);
        let options = ProcessingOptions::default();
        let notes = ProjectNotes::default();

        let observe = async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            orchestrator.is_batch_running()
        };
        let (report, running) = tokio::join!(orchestrator.run_batch(&options, &notes), observe);
        assert!(running);
        assert_eq!(report.completed.len(), 2);
        assert!(!orchestrator.is_batch_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_settled_called_per_asset() {
        let (orchestrator, ids) = setup(3, ScriptedService::default());
        let seen = Mutex::new(Vec::new());
        orchestrator
            .run_batch_with(&ProcessingOptions::default(), &ProjectNotes::default(), |id| {
                lock(&seen).push(id)
            })
            .await;
        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, ids);
    }

    #[tokio::test(start_paused = true)]
    async fn test_masked_edit_outside_batch() {
        let (orchestrator, ids) = setup(2, ScriptedService::default());
        let result = orchestrator
            .submit_masked_edit(ids[0], &ProcessingOptions::default(), &mask(400, 300), Some("tree"))
            .await
            .unwrap();
        assert_eq!(result, image(800, 600));
        assert_eq!(kind(&orchestrator, ids[0]), StatusKind::Completed);
        assert_eq!(kind(&orchestrator, ids[1]), StatusKind::Pending);
        assert!(!orchestrator.is_batch_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_masked_edit_geometry_mismatch_dispatches_nothing() {
        let (orchestrator, ids) = setup(1, ScriptedService::default());
        let err = orchestrator
            .submit_masked_edit(ids[0], &ProcessingOptions::default(), &mask(200, 100), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EditError::GeometrySync(_)));
        assert!(orchestrator.service().calls().is_empty());
        assert_eq!(kind(&orchestrator, ids[0]), StatusKind::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_masked_edit_on_completed_marks_error() {
        let (orchestrator, ids) = setup(1, ScriptedService::default());
        orchestrator
            .run_batch(&ProcessingOptions::default(), &ProjectNotes::default())
            .await;
        orchestrator.service().script(
            ids[0],
            [Step::Reply(Err(ServiceError::EmptyResponse(None)))],
        );

        // The completed asset displays its 800x600 result
        let err = orchestrator
            .submit_masked_edit(ids[0], &ProcessingOptions::default(), &mask(800, 600), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EditError::Service(ServiceError::EmptyResponse(None))));
        assert_eq!(kind(&orchestrator, ids[0]), StatusKind::Error);
        let registry = lock(orchestrator.registry());
        let asset = registry.get(ids[0]).unwrap();
        assert!(asset.result().is_none());
        assert!(asset.error().unwrap().contains("no image"));
        drop(registry);

        // The errored asset is picked up again by the next batch
        let report = orchestrator
            .run_batch(&ProcessingOptions::default(), &ProjectNotes::default())
            .await;
        assert_eq!(report.completed, ids);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_masked_edit_on_pending_marks_error() {
        let (orchestrator, ids) = setup(1, ScriptedService::default());
        orchestrator.service().script(
            ids[0],
            [Step::Reply(Err(ServiceError::classify(Some(400), None, "no")))],
        );
        let result = orchestrator
            .submit_masked_edit(ids[0], &ProcessingOptions::default(), &mask(400, 300), None)
            .await;
        assert!(result.is_err());
        assert_eq!(kind(&orchestrator, ids[0]), StatusKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_masked_edit_unknown_asset() {
        let (orchestrator, _) = setup(1, ScriptedService::default());
        let err = orchestrator
            .submit_masked_edit(
                AssetId::from_raw(42),
                &ProcessingOptions::default(),
                &mask(400, 300),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EditError::Registry(RegistryError::NotFound(_))));
    }
}
