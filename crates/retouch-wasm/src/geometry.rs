//! Layout geometry bindings.
//!
//! # Example
//!
//! ```typescript
//! import { fit_image, screen_to_natural, JsRect } from '@retouch/wasm';
//!
//! const box = fit_image(new JsRect(0, 0, 800, 600), 4000, 2000);
//! const pixel = screen_to_natural(event.clientX, event.clientY, box, 4000, 2000);
//! ```

use retouch_core::geometry;
use retouch_core::{Point, Rect, Size};
use wasm_bindgen::prelude::*;

use crate::types::{JsPoint, JsRect};

/// Result of a zoom step.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JsZoomStep {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
    /// True when the scale reached 1 and zoom should be left.
    pub exited: bool,
}

/// Box an image of the given natural size occupies when contained and
/// centered in `container`.
#[wasm_bindgen]
pub fn fit_image(container: &JsRect, natural_width: u32, natural_height: u32) -> JsRect {
    let container = Rect::from(*container);
    let fitted = geometry::fit_contain(
        container.size(),
        Size::from_pixels(natural_width, natural_height),
    );
    container.centered(fitted).into()
}

/// Map a client-space point to natural pixel coordinates.
///
/// Returns `undefined` for an empty display box or image.
#[wasm_bindgen]
pub fn screen_to_natural(
    x: f64,
    y: f64,
    display: &JsRect,
    natural_width: u32,
    natural_height: u32,
) -> Option<JsPoint> {
    geometry::screen_to_natural(
        Point::new(x, y),
        Rect::from(*display),
        Size::from_pixels(natural_width, natural_height),
    )
    .map(JsPoint::from)
}

/// Rescale about an anchor (viewport space, relative to the center).
#[wasm_bindgen]
pub fn zoom_anchored(
    old_scale: f64,
    new_scale: f64,
    translate_x: f64,
    translate_y: f64,
    anchor_x: f64,
    anchor_y: f64,
) -> JsZoomStep {
    let step = geometry::zoom_anchored(
        old_scale,
        new_scale,
        Point::new(translate_x, translate_y),
        Point::new(anchor_x, anchor_y),
    );
    JsZoomStep {
        scale: step.scale,
        translate_x: step.translate.x,
        translate_y: step.translate.y,
        exited: step.exited,
    }
}
