//! Freehand mask overlay for localized edits.
//!
//! This module provides functionality for:
//! - Brush sizing relative to the image's natural width
//! - Drawing round-capped strokes onto a natural-resolution raster
//! - Serializing the raster as a lossless PNG overlay
//!
//! # Coordinate System
//!
//! The raster always matches the natural (oriented) resolution of the image
//! being edited. Pointer input arrives in client space and is mapped through
//! the image's on-screen box, so the overlay lines up pixel for pixel with the
//! image no matter how it is fitted, zoomed or resized.

mod brush;
mod surface;

pub use brush::{
    paint_segment, stroke_width, DEFAULT_BRUSH_PERCENT, MASK_COLOR, MIN_BRUSH_WIDTH,
    REFERENCE_WIDTH,
};
pub use surface::MaskSurface;

use std::sync::Arc;

use thiserror::Error;

use crate::decode::{probe, DecodeError};

/// The mask and the image it is meant for disagree on size.
///
/// A mismatched mask would mark the wrong pixels, so it is discarded rather
/// than submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Mask is {mask_width}x{mask_height} but the image is {image_width}x{image_height}")]
pub struct GeometrySyncError {
    pub mask_width: u32,
    pub mask_height: u32,
    pub image_width: u32,
    pub image_height: u32,
}

/// A serialized mask: PNG bytes plus the natural dimensions they encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskOverlay {
    png: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl MaskOverlay {
    pub(crate) fn new(png: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            png: png.into(),
            width,
            height,
        }
    }

    /// Wrap an externally produced PNG mask, reading its dimensions from the header.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::InvalidFormat` if the bytes are not a PNG.
    pub fn from_png(bytes: &[u8]) -> Result<Self, DecodeError> {
        let info = probe(bytes)?;
        if info.mime != "image/png" {
            return Err(DecodeError::InvalidFormat);
        }
        Ok(Self::new(bytes.to_vec(), info.width, info.height))
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    /// Shared handle to the PNG bytes.
    pub fn png_shared(&self) -> Arc<[u8]> {
        Arc::clone(&self.png)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Check the overlay against the natural size of the image it targets.
    ///
    /// # Errors
    ///
    /// Returns `GeometrySyncError` when the dimensions differ.
    pub fn ensure_matches(&self, width: u32, height: u32) -> Result<(), GeometrySyncError> {
        if (self.width, self.height) == (width, height) {
            Ok(())
        } else {
            Err(GeometrySyncError {
                mask_width: self.width,
                mask_height: self.height,
                image_width: width,
                image_height: height,
            })
        }
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
