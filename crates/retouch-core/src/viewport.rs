//! Interactive viewport: zoom, pan, compare slider and mask drawing.
//!
//! The controller is a small state machine over [`ViewMode`]. Comparing,
//! Zoomed and Masking are mutually exclusive; requesting one forces the
//! active one off first, running its exit behavior (zoom exit resets the
//! transform, mask exit clears the overlay).
//!
//! Pointer input is routed to exactly one interaction at a time, chosen by
//! the mode when the pointer goes down:
//!
//! | Mode                    | Interaction |
//! |-------------------------|-------------|
//! | Zoomed                  | Pan         |
//! | Comparing (with result) | Slider drag |
//! | Masking                 | Draw        |
//!
//! Zoom anchors and translate are in viewport space: offsets from the center
//! of the container, which is the transform origin.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::asset::AssetId;
use crate::encode::EncodeError;
use crate::geometry::{
    fit_contain, slider_percent, zoom_anchored, Point, Rect, Size, WHEEL_ZOOM_STEP, ZOOM_IN_SCALE,
};
use crate::mask::{MaskOverlay, MaskSurface, DEFAULT_BRUSH_PERCENT};

/// Default compare slider position, in percent.
pub const DEFAULT_SLIDER_POSITION: f64 = 50.0;

const SCALE_EPSILON: f64 = 1e-6;

/// Exclusive display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Normal,
    Comparing,
    Zoomed,
    Masking,
}

/// Zoom transform applied about the container center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    pub scale: f64,
    pub translate: Point,
}

impl ViewportTransform {
    pub const IDENTITY: ViewportTransform = ViewportTransform {
        scale: 1.0,
        translate: Point::ORIGIN,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The image currently shown in the viewport.
///
/// `width`/`height` are the natural dimensions of what is on screen: the
/// result for a completed asset, the source otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayedImage {
    pub asset: AssetId,
    pub width: u32,
    pub height: u32,
    pub has_result: bool,
}

/// Which interaction a pointer-down started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Pan,
    Slider,
    Draw,
}

#[derive(Debug, Clone, Copy)]
enum Interaction {
    Pan { last: Point },
    Slider,
    Draw,
}

impl Interaction {
    fn kind(&self) -> InteractionKind {
        match self {
            Interaction::Pan { .. } => InteractionKind::Pan,
            Interaction::Slider => InteractionKind::Slider,
            Interaction::Draw => InteractionKind::Draw,
        }
    }
}

/// Owns the view state for one displayed image and its mask overlay.
#[derive(Debug, Clone)]
pub struct ViewportController {
    mode: ViewMode,
    transform: ViewportTransform,
    slider: f64,
    container: Rect,
    displayed: Option<DisplayedImage>,
    mask: MaskSurface,
    brush_percent: f64,
    interaction: Option<Interaction>,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportController {
    pub fn new() -> Self {
        Self {
            mode: ViewMode::Normal,
            transform: ViewportTransform::IDENTITY,
            slider: DEFAULT_SLIDER_POSITION,
            container: Rect::default(),
            displayed: None,
            mask: MaskSurface::new(),
            brush_percent: DEFAULT_BRUSH_PERCENT,
            interaction: None,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn transform(&self) -> ViewportTransform {
        self.transform
    }

    /// Compare slider position in `[0, 100]`.
    pub fn slider_position(&self) -> f64 {
        self.slider
    }

    pub fn container(&self) -> Rect {
        self.container
    }

    pub fn displayed(&self) -> Option<DisplayedImage> {
        self.displayed
    }

    pub fn brush_percent(&self) -> f64 {
        self.brush_percent
    }

    /// Set the brush size in percent, clamped to `[1, 100]`.
    pub fn set_brush_percent(&mut self, percent: f64) {
        if percent.is_finite() {
            self.brush_percent = percent.clamp(1.0, 100.0);
        }
    }

    /// The interaction in progress, if a pointer is down.
    pub fn active_interaction(&self) -> Option<InteractionKind> {
        self.interaction.map(|i| i.kind())
    }

    pub fn mask(&self) -> &MaskSurface {
        &self.mask
    }

    /// True when the user has drawn something that can be submitted.
    pub fn has_mask(&self) -> bool {
        self.mode == ViewMode::Masking && self.mask.has_content()
    }

    /// Update the container box (client space). The mask keeps its content
    /// and only its on-screen box is recomputed.
    pub fn set_layout(&mut self, container: Rect) {
        self.container = container;
        self.sync_mask();
    }

    /// Change the image on screen.
    ///
    /// Any change resets the transform, leaves zoom, ends the current
    /// interaction and clears the mask. Setting the same image again only
    /// re-syncs the mask box.
    pub fn set_displayed(&mut self, displayed: Option<DisplayedImage>) {
        if self.displayed == displayed {
            self.sync_mask();
            return;
        }
        debug!("viewport displayed image {:?} -> {:?}", self.displayed, displayed);

        self.displayed = displayed;
        self.interaction = None;
        self.transform = ViewportTransform::IDENTITY;
        if self.mode == ViewMode::Zoomed {
            self.mode = ViewMode::Normal;
        }
        self.mask.clear();
        self.sync_mask();
    }

    fn sync_mask(&mut self) {
        if let Some(image) = self.displayed {
            self.mask.resize(image.width, image.height, self.container);
        }
    }

    /// Box the image occupies on screen after fitting and the zoom transform.
    pub fn image_display_rect(&self) -> Option<Rect> {
        let image = self.displayed?;
        let fitted = fit_contain(
            self.container.size(),
            Size::from_pixels(image.width, image.height),
        );
        if fitted.is_empty() {
            return None;
        }
        let base = self.container.centered(fitted);
        Some(base.transformed_about(
            self.container.center(),
            self.transform.scale,
            self.transform.translate,
        ))
    }

    /// Slider split to render: `Some(position)` while comparing an image that
    /// has a result, `None` otherwise.
    pub fn compare_split(&self) -> Option<f64> {
        match (self.mode, self.displayed) {
            (ViewMode::Comparing, Some(image)) if image.has_result => Some(self.slider),
            _ => None,
        }
    }

    /// Leave the current exclusive mode, applying its exit semantics.
    fn exit_mode(&mut self) {
        match self.mode {
            ViewMode::Zoomed => self.transform = ViewportTransform::IDENTITY,
            ViewMode::Masking => self.mask.clear(),
            ViewMode::Comparing | ViewMode::Normal => {}
        }
        self.interaction = None;
        self.mode = ViewMode::Normal;
    }

    fn enter_zoom(&mut self, anchor: Point) {
        let step = zoom_anchored(1.0, ZOOM_IN_SCALE, Point::ORIGIN, anchor);
        self.transform = ViewportTransform {
            scale: step.scale,
            translate: step.translate,
        };
        self.mode = ViewMode::Zoomed;
    }

    /// Toggle zoom anchored at the viewport center.
    pub fn toggle_zoom(&mut self) {
        let zoomed = self.mode == ViewMode::Zoomed;
        self.exit_mode();
        if !zoomed {
            self.enter_zoom(Point::ORIGIN);
        }
    }

    /// Toggle the before/after comparison.
    pub fn toggle_compare(&mut self) {
        let comparing = self.mode == ViewMode::Comparing;
        self.exit_mode();
        if !comparing {
            self.mode = ViewMode::Comparing;
        }
    }

    /// Toggle mask drawing. Entering starts from an empty overlay sized to the
    /// displayed image.
    pub fn toggle_masking(&mut self) {
        let masking = self.mode == ViewMode::Masking;
        self.exit_mode();
        if !masking {
            self.mask.clear();
            self.sync_mask();
            self.mode = ViewMode::Masking;
        }
    }

    /// Erase the overlay without leaving masking mode.
    pub fn clear_mask(&mut self) {
        if matches!(self.interaction, Some(Interaction::Draw)) {
            self.interaction = None;
        }
        self.mask.clear();
    }

    /// Serialize the overlay. `Ok(None)` when there is nothing to submit.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError` if PNG encoding fails.
    pub fn serialize_mask(&self) -> Result<Option<MaskOverlay>, EncodeError> {
        if !self.has_mask() {
            return Ok(None);
        }
        self.mask.serialize().map(Some)
    }

    /// Handle a wheel gesture at `pointer` (client space).
    ///
    /// From Normal a zoom-in gesture enters zoom at scale 2 anchored at the
    /// pointer. While zoomed each gesture steps the scale by
    /// [`WHEEL_ZOOM_STEP`]; reaching 1 exits zoom. Ignored in other modes.
    pub fn wheel(&mut self, delta_y: f64, pointer: Point) {
        if delta_y == 0.0 || !delta_y.is_finite() {
            return;
        }
        let anchor = self.to_viewport_space(pointer);
        match self.mode {
            ViewMode::Normal if delta_y < 0.0 => self.enter_zoom(anchor),
            ViewMode::Zoomed => {
                let mut target = self.transform.scale - delta_y.signum() * WHEEL_ZOOM_STEP;
                // Repeated 0.2 steps accumulate rounding error around 1.0
                if target < 1.0 + SCALE_EPSILON {
                    target = 1.0;
                }
                let step =
                    zoom_anchored(self.transform.scale, target, self.transform.translate, anchor);
                if step.exited {
                    self.exit_mode();
                } else {
                    self.transform = ViewportTransform {
                        scale: step.scale,
                        translate: step.translate,
                    };
                }
            }
            _ => {}
        }
    }

    fn to_viewport_space(&self, client: Point) -> Point {
        let center = self.container.center();
        Point::new(client.x - center.x, client.y - center.y)
    }

    /// Start an interaction. Returns which one, or `None` if the pointer is
    /// outside the image or the mode has no pointer interaction.
    pub fn pointer_down(&mut self, client: Point) -> Option<InteractionKind> {
        let rect = self.image_display_rect()?;
        if !rect.contains(client) {
            return None;
        }

        let interaction = match self.mode {
            ViewMode::Zoomed => Interaction::Pan { last: client },
            ViewMode::Comparing if self.compare_split().is_some() => {
                self.slider = slider_percent(client.x, rect);
                Interaction::Slider
            }
            ViewMode::Masking if self.mask.begin_stroke(client, self.brush_percent) => {
                Interaction::Draw
            }
            _ => return None,
        };
        self.interaction = Some(interaction);
        Some(interaction.kind())
    }

    pub fn pointer_move(&mut self, client: Point) {
        match self.interaction {
            Some(Interaction::Pan { last }) => {
                self.transform.translate.x += client.x - last.x;
                self.transform.translate.y += client.y - last.y;
                self.interaction = Some(Interaction::Pan { last: client });
            }
            Some(Interaction::Slider) => {
                if let Some(rect) = self.image_display_rect() {
                    self.slider = slider_percent(client.x, rect);
                }
            }
            Some(Interaction::Draw) => self.mask.continue_stroke(client),
            None => {}
        }
    }

    pub fn pointer_up(&mut self) {
        if let Some(Interaction::Draw) = self.interaction.take() {
            self.mask.end_stroke();
        }
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
