//! Source import: validation, natural dimensions and preview generation.

use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::asset::EncodedImage;
use crate::decode::{decode_oriented, downscale, probe, DecodeError};
use crate::encode::{encode_jpeg, EncodeError};

/// Longest edge of generated previews, in pixels.
pub const DEFAULT_PREVIEW_EDGE: u32 = 512;

/// JPEG quality used for previews.
pub const PREVIEW_QUALITY: u8 = 85;

/// Errors that can occur while importing a source file.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Preview encoding failed: {0}")]
    Preview(#[from] EncodeError),
}

/// A validated source plus its preview, ready to be added to the registry.
#[derive(Debug, Clone)]
pub struct ImportedImage {
    pub name: String,
    pub source: EncodedImage,
    pub preview: EncodedImage,
}

/// Import one file.
///
/// The original bytes are kept untouched for submission. Natural dimensions
/// are the EXIF-oriented ones, and the preview is an oriented JPEG whose
/// longest edge is at most `preview_edge`.
///
/// # Errors
///
/// Returns `ImportError::Decode` for files that are not decodable JPEG/PNG
/// images.
pub fn import_image(
    name: &str,
    bytes: impl Into<Arc<[u8]>>,
    preview_edge: u32,
) -> Result<ImportedImage, ImportError> {
    let bytes: Arc<[u8]> = bytes.into();
    let info = probe(&bytes)?;
    let decoded = decode_oriented(&bytes)?;
    let small = downscale(&decoded, preview_edge);
    let (preview_width, preview_height) = small.dimensions();
    let jpeg = encode_jpeg(small.as_raw(), preview_width, preview_height, PREVIEW_QUALITY)?;

    debug!(
        "imported {} ({}, {}x{}, preview {}x{})",
        name, info.mime, info.width, info.height, preview_width, preview_height
    );

    Ok(ImportedImage {
        name: name.to_string(),
        source: EncodedImage {
            bytes,
            mime: info.mime,
            width: info.width,
            height: info.height,
        },
        preview: EncodedImage {
            bytes: jpeg.into(),
            mime: "image/jpeg".to_string(),
            width: preview_width,
            height: preview_height,
        },
    })
}
