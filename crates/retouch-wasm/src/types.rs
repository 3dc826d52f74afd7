//! WASM-compatible value types for geometry.

use retouch_core::{InteractionKind, Point, Rect, ViewMode};
use wasm_bindgen::prelude::*;

/// A rectangle in client space.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JsRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[wasm_bindgen]
impl JsRect {
    #[wasm_bindgen(constructor)]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> JsRect {
        JsRect {
            left,
            top,
            width,
            height,
        }
    }
}

impl From<Rect> for JsRect {
    fn from(rect: Rect) -> Self {
        JsRect::new(rect.left, rect.top, rect.width, rect.height)
    }
}

impl From<JsRect> for Rect {
    fn from(rect: JsRect) -> Self {
        Rect::new(rect.left, rect.top, rect.width, rect.height)
    }
}

/// A point, in client space or natural pixels depending on where it came from.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JsPoint {
    pub x: f64,
    pub y: f64,
}

impl From<Point> for JsPoint {
    fn from(point: Point) -> Self {
        JsPoint {
            x: point.x,
            y: point.y,
        }
    }
}

pub(crate) fn mode_name(mode: ViewMode) -> &'static str {
    match mode {
        ViewMode::Normal => "normal",
        ViewMode::Comparing => "comparing",
        ViewMode::Zoomed => "zoomed",
        ViewMode::Masking => "masking",
    }
}

pub(crate) fn interaction_name(kind: InteractionKind) -> &'static str {
    match kind {
        InteractionKind::Pan => "pan",
        InteractionKind::Slider => "slider",
        InteractionKind::Draw => "draw",
    }
}
