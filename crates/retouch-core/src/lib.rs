//! Retouch Core - viewport, masking and asset lifecycle
//!
//! This crate provides the synchronous core of Retouch: layout geometry for
//! a zoomable image viewport, a natural-resolution mask surface for localized
//! edits, the asset registry that tracks each photo through processing, and
//! the building of edit requests from assets and options.
//!
//! Nothing here performs I/O. Network dispatch lives in `retouch-service`,
//! browser bindings in `retouch-wasm`.

pub mod asset;
pub mod decode;
pub mod encode;
pub mod geometry;
pub mod import;
pub mod mask;
pub mod options;
pub mod prompt;
pub mod request;
pub mod viewport;

pub use asset::{
    AssetId, AssetRegistry, AssetStatus, CompletedResult, EncodedImage, ImageAsset, RegistryError,
    StatusCounts, StatusKind,
};
pub use geometry::{fit_contain, screen_to_natural, zoom_anchored, Point, Rect, Size, ZoomStep};
pub use import::{import_image, ImportError, ImportedImage, DEFAULT_PREVIEW_EDGE};
pub use mask::{GeometrySyncError, MaskOverlay, MaskSurface};
pub use options::{AspectRatio, ProcessingOptions, Resolution, TargetAspect};
pub use prompt::ProjectNotes;
pub use request::{ImagePart, ProcessingRequest, RequestBuilder, StandardRequestBuilder};
pub use viewport::{DisplayedImage, InteractionKind, ViewMode, ViewportController, ViewportTransform};
