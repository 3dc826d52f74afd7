//! Brush sizing and hard-edged stroke rasterization.
//!
//! Strokes are rendered with round caps and round joins: every segment is
//! rasterized as a capsule (all pixels whose center lies within half the line
//! width of the segment). Consecutive capsules share their end discs, which
//! produces the round joins.

use image::{Rgba, RgbaImage};

use crate::geometry::Point;

/// Minimum stroke width in natural pixels.
pub const MIN_BRUSH_WIDTH: f64 = 5.0;

/// Image width at which one brush percent equals one natural pixel.
pub const REFERENCE_WIDTH: f64 = 1000.0;

/// Default brush size, in brush percent.
pub const DEFAULT_BRUSH_PERCENT: f64 = 30.0;

/// Marker color for masked pixels (`#E62727`). It only flags the region; the
/// service is told to treat the red area as the edit target.
pub const MASK_COLOR: Rgba<u8> = Rgba([0xE6, 0x27, 0x27, 0xFF]);

/// Stroke width in natural pixels for a brush size given in percent.
///
/// Scaling by `natural_width / REFERENCE_WIDTH` keeps the brush the same
/// relative size on small and large images.
pub fn stroke_width(natural_width: u32, brush_percent: f64) -> f64 {
    let percent = brush_percent.clamp(1.0, 100.0);
    ((natural_width as f64 / REFERENCE_WIDTH) * percent).max(MIN_BRUSH_WIDTH)
}

/// Paint a round-capped segment from `from` to `to` with the given width.
///
/// Returns the number of pixels newly marked.
pub fn paint_segment(raster: &mut RgbaImage, from: Point, to: Point, width: f64) -> usize {
    let (w, h) = raster.dimensions();
    if w == 0 || h == 0 {
        return 0;
    }
    let radius = width / 2.0;

    let min_x = (from.x.min(to.x) - radius).floor().max(0.0) as u32;
    let min_y = (from.y.min(to.y) - radius).floor().max(0.0) as u32;
    let max_x = (from.x.max(to.x) + radius).ceil().min(w as f64 - 1.0);
    let max_y = (from.y.max(to.y) + radius).ceil().min(h as f64 - 1.0);
    if max_x < 0.0 || max_y < 0.0 {
        return 0;
    }
    let (max_x, max_y) = (max_x as u32, max_y as u32);

    let radius_sq = radius * radius;
    let mut painted = 0;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
            if distance_sq_to_segment(center, from, to) <= radius_sq {
                let pixel = raster.get_pixel_mut(x, y);
                if *pixel != MASK_COLOR {
                    *pixel = MASK_COLOR;
                    painted += 1;
                }
            }
        }
    }
    painted
}

fn distance_sq_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let len_sq = abx * abx + aby * aby;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.x + t * abx, a.y + t * aby);
    (p.x - cx).powi(2) + (p.y - cy).powi(2)
}
