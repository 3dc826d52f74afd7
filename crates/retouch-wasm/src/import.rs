//! Import bindings: validate a dropped file and build its preview.

use retouch_core::import;
use wasm_bindgen::prelude::*;

/// A validated source file and its JPEG preview.
#[wasm_bindgen]
pub struct JsImportedImage {
    name: String,
    mime: String,
    width: u32,
    height: u32,
    preview: Vec<u8>,
    preview_width: u32,
    preview_height: u32,
}

#[wasm_bindgen]
impl JsImportedImage {
    #[wasm_bindgen(getter)]
    pub fn name(&self) -> String {
        self.name.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn mime(&self) -> String {
        self.mime.clone()
    }

    /// Natural width, after EXIF orientation.
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Preview JPEG bytes. Makes a copy.
    pub fn preview(&self) -> Vec<u8> {
        self.preview.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn preview_width(&self) -> u32 {
        self.preview_width
    }

    #[wasm_bindgen(getter)]
    pub fn preview_height(&self) -> u32 {
        self.preview_height
    }
}

/// Import a JPEG or PNG file.
///
/// # Errors
///
/// Returns an error string if the bytes are not a decodable image.
#[wasm_bindgen]
pub fn import_image(name: &str, bytes: &[u8], preview_edge: u32) -> Result<JsImportedImage, JsValue> {
    let imported = import::import_image(name, bytes, preview_edge)
        .map_err(|e| JsValue::from_str(&format!("{}: {}", name, e)))?;
    Ok(JsImportedImage {
        name: imported.name,
        mime: imported.source.mime,
        width: imported.source.width,
        height: imported.source.height,
        preview: imported.preview.bytes.to_vec(),
        preview_width: imported.preview.width,
        preview_height: imported.preview.height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_png() {
        let pixels = vec![128u8; 300 * 200 * 4];
        let png = retouch_core::encode::encode_png_rgba(&pixels, 300, 200).unwrap();
        let imported = import_image("shot.png", &png, 100).unwrap();

        assert_eq!(imported.name(), "shot.png");
        assert_eq!(imported.mime(), "image/png");
        assert_eq!((imported.width(), imported.height()), (300, 200));
        assert_eq!((imported.preview_width(), imported.preview_height()), (100, 67));
        assert_eq!(&imported.preview()[0..2], &[0xFF, 0xD8]);
    }
}
