//! Viewport and mask bindings.
//!
//! [`JsViewport`] wraps the core viewport controller. The host forwards
//! layout changes, pointer and wheel events, and reads back the transform,
//! the compare split and the mask overlay to render.
//!
//! # Example
//!
//! ```typescript
//! const viewport = new JsViewport();
//! viewport.set_layout(rect.left, rect.top, rect.width, rect.height);
//! viewport.set_displayed(asset.id, asset.width, asset.height, asset.hasResult);
//!
//! canvas.onpointerdown = (e) => viewport.pointer_down(e.clientX, e.clientY);
//! const { mode, transform, compare_split } = viewport.state();
//! ```

use retouch_core::{
    AssetId, DisplayedImage, Point, Rect, ViewMode, ViewportController, ViewportTransform,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::types::{interaction_name, mode_name, JsRect};

/// Everything the host needs to render one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub mode: ViewMode,
    pub transform: ViewportTransform,
    pub slider_position: f64,
    pub compare_split: Option<f64>,
    pub image_rect: Option<Rect>,
    pub has_mask: bool,
    pub brush_percent: f64,
}

#[wasm_bindgen]
#[derive(Debug, Default)]
pub struct JsViewport {
    inner: ViewportController,
}

#[wasm_bindgen]
impl JsViewport {
    #[wasm_bindgen(constructor)]
    pub fn new() -> JsViewport {
        JsViewport::default()
    }

    /// Update the container box in client space.
    pub fn set_layout(&mut self, left: f64, top: f64, width: f64, height: f64) {
        self.inner.set_layout(Rect::new(left, top, width, height));
    }

    /// Show an asset. Switching to a different image clears the mask.
    pub fn set_displayed(&mut self, asset_id: u64, width: u32, height: u32, has_result: bool) {
        self.inner.set_displayed(Some(DisplayedImage {
            asset: AssetId::from_raw(asset_id),
            width,
            height,
            has_result,
        }));
    }

    pub fn clear_displayed(&mut self) {
        self.inner.set_displayed(None);
    }

    #[wasm_bindgen(getter)]
    pub fn mode(&self) -> String {
        mode_name(self.inner.mode()).to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn scale(&self) -> f64 {
        self.inner.transform().scale
    }

    #[wasm_bindgen(getter)]
    pub fn translate_x(&self) -> f64 {
        self.inner.transform().translate.x
    }

    #[wasm_bindgen(getter)]
    pub fn translate_y(&self) -> f64 {
        self.inner.transform().translate.y
    }

    #[wasm_bindgen(getter)]
    pub fn slider_position(&self) -> f64 {
        self.inner.slider_position()
    }

    /// Slider split while comparing an image that has a result.
    pub fn compare_split(&self) -> Option<f64> {
        self.inner.compare_split()
    }

    /// Box the image occupies on screen, zoom included.
    pub fn image_rect(&self) -> Option<JsRect> {
        self.inner.image_display_rect().map(JsRect::from)
    }

    pub fn toggle_zoom(&mut self) {
        self.inner.toggle_zoom();
    }

    pub fn toggle_compare(&mut self) {
        self.inner.toggle_compare();
    }

    pub fn toggle_masking(&mut self) {
        self.inner.toggle_masking();
    }

    #[wasm_bindgen(getter)]
    pub fn brush_percent(&self) -> f64 {
        self.inner.brush_percent()
    }

    #[wasm_bindgen(setter)]
    pub fn set_brush_percent(&mut self, percent: f64) {
        self.inner.set_brush_percent(percent);
    }

    pub fn wheel(&mut self, delta_y: f64, x: f64, y: f64) {
        self.inner.wheel(delta_y, Point::new(x, y));
    }

    /// Returns the interaction started (`"pan"`, `"slider"`, `"draw"`), or
    /// `undefined` if the event should fall through.
    pub fn pointer_down(&mut self, x: f64, y: f64) -> Option<String> {
        self.inner
            .pointer_down(Point::new(x, y))
            .map(|kind| interaction_name(kind).to_string())
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.inner.pointer_move(Point::new(x, y));
    }

    pub fn pointer_up(&mut self) {
        self.inner.pointer_up();
    }

    #[wasm_bindgen(getter)]
    pub fn has_mask(&self) -> bool {
        self.inner.has_mask()
    }

    pub fn clear_mask(&mut self) {
        self.inner.clear_mask();
    }

    #[wasm_bindgen(getter)]
    pub fn mask_width(&self) -> u32 {
        self.inner.mask().dimensions().0
    }

    #[wasm_bindgen(getter)]
    pub fn mask_height(&self) -> u32 {
        self.inner.mask().dimensions().1
    }

    /// RGBA pixels of the overlay at natural resolution, for drawing it on
    /// a canvas with `ImageData`.
    pub fn mask_pixels(&self) -> Vec<u8> {
        self.inner.mask().raster().as_raw().clone()
    }

    /// PNG of the overlay, or `undefined` if nothing is drawn.
    pub fn mask_png(&self) -> Result<Option<Vec<u8>>, JsValue> {
        self.inner
            .serialize_mask()
            .map(|mask| mask.map(|overlay| overlay.png().to_vec()))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Snapshot of the render state as a plain object.
    pub fn state(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.view_state())
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize state: {}", e)))
    }
}

impl JsViewport {
    pub(crate) fn view_state(&self) -> ViewState {
        ViewState {
            mode: self.inner.mode(),
            transform: self.inner.transform(),
            slider_position: self.inner.slider_position(),
            compare_split: self.inner.compare_split(),
            image_rect: self.inner.image_display_rect(),
            has_mask: self.inner.has_mask(),
            brush_percent: self.inner.brush_percent(),
        }
    }
}
