//! Session state behind the application boundary.
//!
//! A [`Session`] owns the asset registry, the current options and project
//! notes, the viewport and the orchestrator. Every mutation goes through one
//! of its methods, each of which takes its locks for a short synchronous
//! section. After any change to the selection or to an asset's status the
//! viewport is re-synced with the selected asset's displayed image.

use std::sync::{Arc, Mutex};

use log::{info, warn};
use serde::Serialize;

use retouch_core::{
    import_image, AssetId, AssetRegistry, CompletedResult, EncodedImage, ImportError,
    MaskOverlay, ProcessingOptions, ProjectNotes, RegistryError, RequestBuilder,
    StandardRequestBuilder, StatusCounts, StatusKind, ViewportController,
};

use crate::client::EditService;
use crate::config::ServiceConfig;
use crate::orchestrator::{lock, BatchReport, EditError, Orchestrator};

/// Outcome of importing a set of files.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub added: Vec<AssetId>,
    /// Files that could not be imported, by name.
    pub rejected: Vec<(String, ImportError)>,
}

/// Read-only view of one asset for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetSummary {
    pub id: AssetId,
    pub name: String,
    pub status: StatusKind,
    pub error: Option<String>,
    pub selected: bool,
}

pub struct Session<S, B = StandardRequestBuilder> {
    orchestrator: Orchestrator<S, B>,
    viewport: Mutex<ViewportController>,
    options: Mutex<ProcessingOptions>,
    notes: Mutex<ProjectNotes>,
    preview_edge: u32,
}

impl<S: EditService> Session<S> {
    pub fn new(service: S, config: &ServiceConfig) -> Self {
        Self::with_builder(service, StandardRequestBuilder, config)
    }
}

impl<S: EditService, B: RequestBuilder> Session<S, B> {
    pub fn with_builder(service: S, builder: B, config: &ServiceConfig) -> Self {
        let registry = Arc::new(Mutex::new(AssetRegistry::new()));
        Self {
            orchestrator: Orchestrator::with_builder(service, builder, registry, config),
            viewport: Mutex::new(ViewportController::new()),
            options: Mutex::new(ProcessingOptions::default()),
            notes: Mutex::new(ProjectNotes::default()),
            preview_edge: config.preview_edge,
        }
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, AssetRegistry> {
        lock(self.orchestrator.registry())
    }

    /// Point the viewport at whatever the selected asset currently shows.
    fn sync_viewport(&self) {
        let displayed = self.registry().selected().map(|asset| asset.displayed());
        lock(&self.viewport).set_displayed(displayed);
    }

    /// Import files and add the decodable ones as pending assets.
    ///
    /// The first newly added asset becomes the selection. Files that fail to
    /// decode are reported individually and do not stop the rest.
    pub fn add_assets<N, D>(&self, files: impl IntoIterator<Item = (N, D)>) -> ImportReport
    where
        N: Into<String>,
        D: Into<Arc<[u8]>>,
    {
        let mut report = ImportReport::default();
        let mut imported = Vec::new();
        for (name, bytes) in files {
            let name = name.into();
            match import_image(&name, bytes, self.preview_edge) {
                Ok(image) => imported.push(image),
                Err(err) => {
                    warn!("rejected {}: {}", name, err);
                    report.rejected.push((name, err));
                }
            }
        }
        if imported.is_empty() {
            return report;
        }

        {
            let mut registry = self.registry();
            report.added = registry.add_all(imported);
            if let Some(first) = report.added.first() {
                // Freshly added, so the id is known
                let _ = registry.select(*first);
            }
        }
        info!("added {} assets", report.added.len());
        self.sync_viewport();
        report
    }

    /// Remove an asset. Returns false if it did not exist.
    ///
    /// An in-flight request for the asset still runs; its outcome is dropped.
    pub fn delete_asset(&self, id: AssetId) -> bool {
        let removed = self.registry().remove(id).is_some();
        if removed {
            self.sync_viewport();
        }
        removed
    }

    /// Select an asset for display. Switching clears the mask.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` for an unknown id.
    pub fn select_asset(&self, id: AssetId) -> Result<(), RegistryError> {
        self.registry().select(id)?;
        self.sync_viewport();
        Ok(())
    }

    pub fn selected_id(&self) -> Option<AssetId> {
        self.registry().selected_id()
    }

    pub fn options(&self) -> ProcessingOptions {
        lock(&self.options).clone()
    }

    pub fn set_options(&self, options: ProcessingOptions) {
        *lock(&self.options) = options;
    }

    pub fn notes(&self) -> ProjectNotes {
        lock(&self.notes).clone()
    }

    pub fn set_notes(&self, notes: ProjectNotes) {
        *lock(&self.notes) = notes;
    }

    pub fn assets(&self) -> Vec<AssetSummary> {
        let registry = self.registry();
        let selected = registry.selected_id();
        registry
            .iter()
            .map(|asset| AssetSummary {
                id: asset.id(),
                name: asset.name().to_string(),
                status: asset.kind(),
                error: asset.error().map(str::to_string),
                selected: Some(asset.id()) == selected,
            })
            .collect()
    }

    pub fn result(&self, id: AssetId) -> Option<EncodedImage> {
        self.registry().get(id)?.result().cloned()
    }

    pub fn counts(&self) -> StatusCounts {
        self.registry().counts()
    }

    /// Number of assets a batch started now would dispatch.
    pub fn dispatchable_count(&self) -> usize {
        self.registry().dispatchable_ids().len()
    }

    /// Completed results in display order, for export.
    pub fn completed_results(&self) -> Vec<CompletedResult> {
        self.registry().completed_results()
    }

    pub fn is_batch_running(&self) -> bool {
        self.orchestrator.is_batch_running()
    }

    /// Run a batch over every pending or errored asset with the current
    /// options and notes.
    pub async fn start_batch(&self) -> BatchReport {
        let options = self.options();
        let notes = self.notes();
        self.orchestrator
            .run_batch_with(&options, &notes, |_| self.sync_viewport())
            .await
    }

    /// Submit a masked edit for one asset with the current options.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::submit_masked_edit`].
    pub async fn submit_masked_edit(
        &self,
        id: AssetId,
        mask: &MaskOverlay,
        replacement: Option<&str>,
    ) -> Result<EncodedImage, EditError> {
        let options = self.options();
        let result = self
            .orchestrator
            .submit_masked_edit(id, &options, mask, replacement)
            .await;
        self.sync_viewport();
        result
    }

    /// Submit the mask drawn in the viewport for the selected asset.
    ///
    /// Returns `Ok(None)` when nothing has been drawn. The mask is cleared
    /// once the edit succeeds and kept for another try if it fails.
    ///
    /// # Errors
    ///
    /// `EditError::NoSelection` without a selected asset, otherwise see
    /// [`Orchestrator::submit_masked_edit`].
    pub async fn commit_mask(
        &self,
        replacement: Option<&str>,
    ) -> Result<Option<EncodedImage>, EditError> {
        let id = self.selected_id().ok_or(EditError::NoSelection)?;
        let Some(mask) = lock(&self.viewport).serialize_mask()? else {
            return Ok(None);
        };

        let image = self.submit_masked_edit(id, &mask, replacement).await?;
        lock(&self.viewport).clear_mask();
        Ok(Some(image))
    }

    /// Run `f` with exclusive access to the viewport.
    pub fn with_viewport<R>(&self, f: impl FnOnce(&mut ViewportController) -> R) -> R {
        f(&mut lock(&self.viewport))
    }
}
