//! Retouch WASM - WebAssembly bindings for Retouch
//!
//! This crate exposes the synchronous parts of retouch-core to the browser:
//! layout geometry, the viewport state machine with its mask overlay, file
//! import, and prompt building. Network dispatch stays on the host side.
//!
//! # Module Structure
//!
//! - `geometry` - Fit, coordinate mapping and anchored zoom
//! - `viewport` - `JsViewport`, the zoom/compare/mask controller
//! - `import` - Source validation and preview generation
//! - `prompt` - Processing options and prompt text
//! - `types` - WASM-compatible rect and point types
//!
//! # Usage
//!
//! ```typescript
//! import init, { import_image, JsViewport } from '@retouch/wasm';
//!
//! await init();
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const image = import_image(file.name, bytes, 512);
//! const viewport = new JsViewport();
//! viewport.set_displayed(1, image.width, image.height, false);
//! ```

use wasm_bindgen::prelude::*;

mod geometry;
mod import;
mod prompt;
mod types;
mod viewport;

pub use geometry::{fit_image, screen_to_natural, zoom_anchored, JsZoomStep};
pub use import::{import_image, JsImportedImage};
pub use prompt::{build_batch_prompt, build_masked_prompt, default_options, infer_aspect_ratio};
pub use types::{JsPoint, JsRect};
pub use viewport::{JsViewport, ViewState};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    // A second instantiation finds the logger already set
    let _ = console_log::init_with_level(log::Level::Debug);
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
