//! Imported assets and their processing lifecycle.
//!
//! The [`AssetRegistry`] is the single source of truth for which images are
//! loaded, which one is selected and where each stands in processing. Status
//! only changes through [`AssetRegistry::transition`], and the status enum
//! carries its own payload: a completed asset always has a result and an
//! errored asset always has a message.
//!
//! ```text
//! Pending ──► Processing ──► Completed
//!    ▲            │  ▲           │
//!    │            ▼  └───────────┘ (re-edit)
//!    └──────── Error ─► Processing (retry)
//! ```

use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::{probe, DecodeError};
use crate::import::ImportedImage;
use crate::viewport::DisplayedImage;

/// Opaque asset identifier, unique within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(u64);

impl AssetId {
    /// Rebuild an id from its raw value (e.g. one handed to JavaScript).
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset-{}", self.0)
    }
}

/// Encoded image bytes plus the facts needed to display or submit them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Arc<[u8]>,
    pub mime: String,
    /// Natural width, after EXIF orientation.
    pub width: u32,
    /// Natural height, after EXIF orientation.
    pub height: u32,
}

impl EncodedImage {
    /// Wrap encoded bytes, reading format and oriented size from the header.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError` if the bytes are not a supported image.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Self, DecodeError> {
        let bytes = bytes.into();
        let info = probe(&bytes)?;
        Ok(Self {
            bytes,
            mime: info.mime,
            width: info.width,
            height: info.height,
        })
    }
}

/// Lifecycle status, with the data that belongs to each state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetStatus {
    Pending,
    Processing,
    Completed(EncodedImage),
    Error(String),
}

impl AssetStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            AssetStatus::Pending => StatusKind::Pending,
            AssetStatus::Processing => StatusKind::Processing,
            AssetStatus::Completed(_) => StatusKind::Completed,
            AssetStatus::Error(_) => StatusKind::Error,
        }
    }
}

/// Payload-free view of [`AssetStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Pending,
    Processing,
    Completed,
    Error,
}

impl StatusKind {
    /// Whether a batch run should pick this asset up.
    pub fn is_dispatchable(self) -> bool {
        matches!(self, StatusKind::Pending | StatusKind::Error)
    }

    fn can_become(self, next: StatusKind) -> bool {
        match next {
            StatusKind::Processing => self != StatusKind::Processing,
            StatusKind::Completed | StatusKind::Error => self == StatusKind::Processing,
            StatusKind::Pending => false,
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusKind::Pending => "pending",
            StatusKind::Processing => "processing",
            StatusKind::Completed => "completed",
            StatusKind::Error => "error",
        };
        f.write_str(s)
    }
}

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown asset {0}")]
    NotFound(AssetId),

    #[error("Asset {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: AssetId,
        from: StatusKind,
        to: StatusKind,
    },
}

/// One imported image and its processing state.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    id: AssetId,
    name: String,
    source: EncodedImage,
    preview: Option<EncodedImage>,
    status: AssetStatus,
}

impl ImageAsset {
    pub fn id(&self) -> AssetId {
        self.id
    }

    /// Original file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &EncodedImage {
        &self.source
    }

    /// Downscaled JPEG for thumbnails.
    pub fn preview(&self) -> Option<&EncodedImage> {
        self.preview.as_ref()
    }

    pub fn status(&self) -> &AssetStatus {
        &self.status
    }

    pub fn kind(&self) -> StatusKind {
        self.status.kind()
    }

    pub fn result(&self) -> Option<&EncodedImage> {
        match &self.status {
            AssetStatus::Completed(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            AssetStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    /// The image the user sees for this asset: the result once completed,
    /// the source otherwise.
    pub fn displayed_image(&self) -> &EncodedImage {
        self.result().unwrap_or(&self.source)
    }

    /// Viewport description of [`displayed_image`](Self::displayed_image).
    pub fn displayed(&self) -> DisplayedImage {
        let image = self.displayed_image();
        DisplayedImage {
            asset: self.id,
            width: image.width,
            height: image.height,
            has_result: self.result().is_some(),
        }
    }
}

/// Per-status asset counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.error
    }
}

/// A finished result ready for export.
#[derive(Debug, Clone)]
pub struct CompletedResult {
    pub id: AssetId,
    pub name: String,
    pub image: EncodedImage,
}

/// Ordered collection of assets with a single selection.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    assets: Vec<ImageAsset>,
    selected: Option<AssetId>,
    next_id: u64,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Assets in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ImageAsset> {
        self.assets.iter()
    }

    pub fn get(&self, id: AssetId) -> Option<&ImageAsset> {
        self.assets.iter().find(|a| a.id == id)
    }

    fn get_mut(&mut self, id: AssetId) -> Result<&mut ImageAsset, RegistryError> {
        self.assets
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(RegistryError::NotFound(id))
    }

    /// Add an imported image as a pending asset.
    pub fn add(&mut self, image: ImportedImage) -> AssetId {
        self.next_id += 1;
        let id = AssetId(self.next_id);
        debug!("registry add {} ({})", id, image.name);
        self.assets.push(ImageAsset {
            id,
            name: image.name,
            source: image.source,
            preview: Some(image.preview),
            status: AssetStatus::Pending,
        });
        id
    }

    /// Add several images, returning their ids in order.
    pub fn add_all(&mut self, images: impl IntoIterator<Item = ImportedImage>) -> Vec<AssetId> {
        images.into_iter().map(|image| self.add(image)).collect()
    }

    /// Remove an asset. If it was selected, selection falls back to the first
    /// remaining asset.
    pub fn remove(&mut self, id: AssetId) -> Option<ImageAsset> {
        let index = self.assets.iter().position(|a| a.id == id)?;
        let removed = self.assets.remove(index);
        if self.selected == Some(id) {
            self.selected = self.assets.first().map(|a| a.id);
        }
        debug!("registry remove {}", id);
        Some(removed)
    }

    /// Select an asset.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` for unknown ids; the selection is unchanged.
    pub fn select(&mut self, id: AssetId) -> Result<(), RegistryError> {
        if self.get(id).is_none() {
            return Err(RegistryError::NotFound(id));
        }
        self.selected = Some(id);
        Ok(())
    }

    /// The selected asset, falling back to the first one when the selection
    /// is unset or stale.
    pub fn selected(&self) -> Option<&ImageAsset> {
        self.selected
            .and_then(|id| self.get(id))
            .or_else(|| self.assets.first())
    }

    pub fn selected_id(&self) -> Option<AssetId> {
        self.selected().map(|a| a.id)
    }

    /// Move an asset to a new status.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` for unknown ids and
    /// `RegistryError::InvalidTransition` for moves the lifecycle does not
    /// allow (for example processing to processing).
    pub fn transition(&mut self, id: AssetId, status: AssetStatus) -> Result<(), RegistryError> {
        let asset = self.get_mut(id)?;
        let from = asset.status.kind();
        let to = status.kind();
        if !from.can_become(to) {
            return Err(RegistryError::InvalidTransition { id, from, to });
        }
        debug!("registry {} {} -> {}", id, from, to);
        asset.status = status;
        Ok(())
    }

    /// Claim an asset for processing. Fails if it is already processing, so
    /// at most one request per asset is ever in flight.
    pub fn begin_processing(&mut self, id: AssetId) -> Result<(), RegistryError> {
        self.transition(id, AssetStatus::Processing)
    }

    /// Ids a batch run should dispatch: pending and errored assets, in order.
    pub fn dispatchable_ids(&self) -> Vec<AssetId> {
        self.assets
            .iter()
            .filter(|a| a.kind().is_dispatchable())
            .map(|a| a.id)
            .collect()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for asset in &self.assets {
            match asset.kind() {
                StatusKind::Pending => counts.pending += 1,
                StatusKind::Processing => counts.processing += 1,
                StatusKind::Completed => counts.completed += 1,
                StatusKind::Error => counts.error += 1,
            }
        }
        counts
    }

    /// Results of every completed asset, in order.
    pub fn completed_results(&self) -> Vec<CompletedResult> {
        self.assets
            .iter()
            .filter_map(|a| {
                a.result().map(|image| CompletedResult {
                    id: a.id,
                    name: a.name.clone(),
                    image: image.clone(),
                })
            })
            .collect()
    }
}



// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::fixtures::{encoded, imported};
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Add,
        Remove(usize),
        Select(usize),
        Claim(usize),
        Complete(usize),
        Fail(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Add),
            (0usize..8).prop_map(Op::Remove),
            (0usize..8).prop_map(Op::Select),
            (0usize..8).prop_map(Op::Claim),
            (0usize..8).prop_map(Op::Complete),
            (0usize..8).prop_map(Op::Fail),
        ]
    }

    proptest! {
        /// Property: status payloads, selection and counts stay consistent
        /// after every mutation, legal or not.
        #[test]
        fn prop_registry_invariants(ops in prop::collection::vec(op_strategy(), 1..80)) {
            let mut registry = AssetRegistry::new();
            for op in ops {
                let pick = |registry: &AssetRegistry, i: usize| {
                    registry.iter().nth(i).map(|a| a.id()).unwrap_or(AssetId::from_raw(999))
                };
                match op {
                    Op::Add => { registry.add(imported("x.jpg")); }
                    Op::Remove(i) => { let id = pick(&registry, i); registry.remove(id); }
                    Op::Select(i) => { let id = pick(&registry, i); let _ = registry.select(id); }
                    Op::Claim(i) => { let id = pick(&registry, i); let _ = registry.begin_processing(id); }
                    Op::Complete(i) => {
                        let id = pick(&registry, i);
                        let _ = registry.transition(id, AssetStatus::Completed(encoded(5, 5)));
                    }
                    Op::Fail(i) => {
                        let id = pick(&registry, i);
                        let _ = registry.transition(id, AssetStatus::Error("e".into()));
                    }
                }

                for asset in registry.iter() {
                    prop_assert_eq!(asset.result().is_some(), asset.kind() == StatusKind::Completed);
                    prop_assert_eq!(asset.error().is_some(), asset.kind() == StatusKind::Error);
                }
                prop_assert_eq!(registry.counts().total(), registry.len());
                prop_assert_eq!(registry.selected().is_some(), !registry.is_empty());
                if let Some(selected) = registry.selected() {
                    prop_assert!(registry.get(selected.id()).is_some());
                }
            }
        }
    }
}
