//! Source image probing and decoding with EXIF orientation handling.
//!
//! Natural dimensions reported here are the *oriented* ones, matching what a
//! browser reports for an `<img>` element. Everything that must line up with
//! the on-screen image (mask raster size, aspect inference) uses them.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{ImageFormat, ImageReader, RgbImage};

use super::{DecodeError, ImageInfo, Orientation};

/// Read format, oriented dimensions and orientation without decoding pixels.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` if the bytes are not a readable image
/// format, `DecodeError::CorruptedFile` if the header cannot be parsed, and
/// `DecodeError::EmptyImage` for zero-sized images.
pub fn probe(bytes: &[u8]) -> Result<ImageInfo, DecodeError> {
    let format = guess_readable_format(bytes)?;

    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyImage { width, height });
    }

    let orientation = extract_orientation(bytes);
    let (width, height) = orientation.displayed_size(width, height);

    Ok(ImageInfo {
        mime: format.to_mime_type().to_string(),
        width,
        height,
        orientation,
    })
}

/// Decode an image from bytes, applying EXIF orientation correction.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` if the format is not recognized and
/// `DecodeError::CorruptedFile` if decoding fails.
pub fn decode_oriented(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    let format = guess_readable_format(bytes)?;
    let orientation = extract_orientation(bytes);

    let img = ImageReader::with_format(Cursor::new(bytes), format)
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    let decoded = orientation.apply(img).into_rgb8();
    let (width, height) = decoded.dimensions();
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyImage { width, height });
    }
    Ok(decoded)
}

fn guess_readable_format(bytes: &[u8]) -> Result<ImageFormat, DecodeError> {
    let format = image::guess_format(bytes).map_err(|_| DecodeError::InvalidFormat)?;
    if format.reading_enabled() {
        Ok(format)
    } else {
        Err(DecodeError::InvalidFormat)
    }
}

/// Extract EXIF orientation.
///
/// Returns `Orientation::Normal` if no EXIF data is found or orientation
/// cannot be determined.
fn extract_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);

    match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from_exif)
            .unwrap_or_default(),
        Err(_) => Orientation::Normal,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::encoded_image;
    use super::*;

    #[test]
    fn test_probe_png() {
        let bytes = encoded_image(40, 30, ImageFormat::Png);
        let info = probe(&bytes).unwrap();
        assert_eq!(info.mime, "image/png");
        assert_eq!((info.width, info.height), (40, 30));
        assert_eq!(info.orientation, Orientation::Normal);
    }

    #[test]
    fn test_probe_jpeg() {
        let bytes = encoded_image(64, 16, ImageFormat::Jpeg);
        let info = probe(&bytes).unwrap();
        assert_eq!(info.mime, "image/jpeg");
        assert_eq!((info.width, info.height), (64, 16));
    }

    #[test]
    fn test_probe_invalid_bytes() {
        assert!(matches!(
            probe(&[0x00, 0x01, 0x02, 0x03]),
            Err(DecodeError::InvalidFormat)
        ));
        assert!(probe(&[]).is_err());
    }

    #[test]
    fn test_probe_truncated_png() {
        let bytes = encoded_image(40, 30, ImageFormat::Png);
        assert!(probe(&bytes[..12]).is_err());
    }

    #[test]
    fn test_decode_oriented_dimensions() {
        let bytes = encoded_image(20, 10, ImageFormat::Png);
        let img = decode_oriented(&bytes).unwrap();
        assert_eq!(img.dimensions(), (20, 10));
    }

    #[test]
    fn test_decode_truncated_png() {
        let bytes = encoded_image(32, 32, ImageFormat::Png);
        let truncated = &bytes[..bytes.len() / 2];
        assert!(decode_oriented(truncated).is_err());
    }

    #[test]
    fn test_orientation_without_exif() {
        let bytes = encoded_image(8, 8, ImageFormat::Jpeg);
        assert_eq!(extract_orientation(&bytes), Orientation::Normal);
    }
}
