//! Downscaling for previews.

use image::imageops::{self, FilterType};
use image::RgbImage;

/// Size that fits `width x height` inside a `max_edge` square, keeping the
/// aspect ratio. Never upscales and never returns a zero edge.
pub fn fit_within(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let max_edge = max_edge.max(1);
    if width <= max_edge && height <= max_edge {
        return (width, height);
    }
    let scale = max_edge as f64 / width.max(height) as f64;
    let shrink = |edge: u32| ((edge as f64 * scale).round() as u32).clamp(1, max_edge);
    (shrink(width), shrink(height))
}

/// Copy of `image` whose longest edge is at most `max_edge`.
pub fn downscale(image: &RgbImage, max_edge: u32) -> RgbImage {
    let (width, height) = fit_within(image.width(), image.height(), max_edge);
    if (width, height) == image.dimensions() {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Triangle)
}
