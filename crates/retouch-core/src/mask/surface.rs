//! The drawable mask raster.

use image::RgbaImage;
use log::debug;

use super::brush::{paint_segment, stroke_width};
use super::MaskOverlay;
use crate::encode::{encode_png_rgba, EncodeError};
use crate::geometry::{fit_contain, screen_to_natural, Point, Rect, Size};

#[derive(Debug, Clone, Copy)]
struct ActiveStroke {
    width: f64,
    start: Point,
    last: Point,
    moved: bool,
}

/// A freehand mask raster kept at the displayed image's natural resolution.
///
/// The raster never follows the on-screen size: pointer positions are mapped
/// from client space through the on-screen box (`display_rect`) into natural
/// pixels, so a stroke lands on the same image pixels whatever the window size.
#[derive(Debug, Clone)]
pub struct MaskSurface {
    raster: RgbaImage,
    display_rect: Rect,
    stroke: Option<ActiveStroke>,
    has_content: bool,
}

impl Default for MaskSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl MaskSurface {
    /// An unsized surface. Strokes are ignored until [`resize`](Self::resize) runs.
    pub fn new() -> Self {
        Self {
            raster: RgbaImage::new(0, 0),
            display_rect: Rect::default(),
            stroke: None,
            has_content: false,
        }
    }

    /// Sync the surface with the image and its container.
    ///
    /// The raster is reallocated (and therefore cleared) only when the natural
    /// size changes. The on-screen box is always recomputed: the image is
    /// fitted into `container` and centered.
    pub fn resize(&mut self, natural_width: u32, natural_height: u32, container: Rect) {
        if self.raster.dimensions() != (natural_width, natural_height) {
            debug!(
                "mask raster resized {:?} -> {}x{}",
                self.raster.dimensions(),
                natural_width,
                natural_height
            );
            self.raster = RgbaImage::new(natural_width, natural_height);
            self.stroke = None;
            self.has_content = false;
        }

        let fitted = fit_contain(container.size(), self.natural_size());
        self.display_rect = container.centered(fitted);
    }

    /// Natural pixel dimensions of the raster.
    pub fn dimensions(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    fn natural_size(&self) -> Size {
        let (w, h) = self.raster.dimensions();
        Size::from_pixels(w, h)
    }

    /// On-screen box of the raster in client space.
    pub fn display_rect(&self) -> Rect {
        self.display_rect
    }

    /// True once a stroke has been completed since the last clear.
    pub fn has_content(&self) -> bool {
        self.has_content
    }

    pub fn is_drawing(&self) -> bool {
        self.stroke.is_some()
    }

    /// Raw RGBA pixels, for rendering the overlay.
    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    /// Map a client-space point into natural pixels.
    pub fn to_natural(&self, client: Point) -> Option<Point> {
        screen_to_natural(client, self.display_rect, self.natural_size())
    }

    /// Start a stroke at `client`. Returns false if the surface is not sized.
    ///
    /// `brush_percent` is the user-facing brush size (1-100); the actual line
    /// width scales with the image width.
    pub fn begin_stroke(&mut self, client: Point, brush_percent: f64) -> bool {
        let Some(start) = self.to_natural(client) else {
            return false;
        };
        self.stroke = Some(ActiveStroke {
            width: stroke_width(self.raster.width(), brush_percent),
            start,
            last: start,
            moved: false,
        });
        true
    }

    /// Extend the active stroke to `client`. No-op without an active stroke.
    pub fn continue_stroke(&mut self, client: Point) {
        let Some(point) = self.to_natural(client) else {
            return;
        };
        if let Some(stroke) = self.stroke.as_mut() {
            paint_segment(&mut self.raster, stroke.last, point, stroke.width);
            stroke.last = point;
            stroke.moved = true;
        }
    }

    /// Finish the active stroke. A stroke that never moved leaves a dot.
    pub fn end_stroke(&mut self) {
        if let Some(stroke) = self.stroke.take() {
            if !stroke.moved {
                paint_segment(&mut self.raster, stroke.start, stroke.start, stroke.width);
            }
            self.has_content = true;
        }
    }

    /// Erase everything and drop any active stroke.
    pub fn clear(&mut self) {
        self.raster.pixels_mut().for_each(|p| p.0 = [0; 4]);
        self.stroke = None;
        self.has_content = false;
    }

    /// Export the raster as a lossless RGBA PNG at natural resolution.
    pub fn serialize(&self) -> Result<MaskOverlay, EncodeError> {
        let (width, height) = self.raster.dimensions();
        let png = encode_png_rgba(self.raster.as_raw(), width, height)?;
        Ok(MaskOverlay::new(png, width, height))
    }
}
