//! Source image decoding for Retouch.
//!
//! This module provides functionality for:
//! - Probing an imported file for its format and oriented natural dimensions
//! - Decoding JPEG/PNG sources with EXIF orientation applied
//! - Downscaling decoded images for previews
//!
//! Natural dimensions always account for EXIF orientation, so that a mask
//! raster sized from them lines up with the image the user sees.

mod resize;
mod source;
mod types;

pub use resize::{downscale, fit_within};
pub use source::{decode_oriented, probe};
pub use types::{DecodeError, ImageInfo, Orientation};

#[cfg(test)]
pub(crate) use source::fixtures;
