//! Viewport geometry: fit-to-contain sizing, zoom-anchored scaling and
//! screen to natural-pixel mapping.
//!
//! # Coordinate Systems
//!
//! - **Client space**: pointer coordinates in CSS pixels, origin at the
//!   top-left of the page. Rects describing on-screen boxes live here.
//! - **Natural space**: pixel coordinates of the image at its natural
//!   (decoded, orientation-corrected) resolution. Masks are drawn here.
//! - **Viewport space**: offsets relative to the center of the viewport.
//!   Zoom translate and zoom anchors live here, because the zoom transform
//!   scales about the viewport center.
//!
//! All functions are pure. Degenerate inputs (zero-sized rects or images)
//! never panic; they produce empty sizes or `None`.

use serde::{Deserialize, Serialize};

/// Upper bound for the zoom scale.
pub const MAX_ZOOM: f64 = 10.0;

/// Scale applied when entering zoom mode.
pub const ZOOM_IN_SCALE: f64 = 2.0;

/// Scale change per wheel notch while zoomed.
pub const WHEEL_ZOOM_STEP: f64 = 0.2;

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size of an image given integer pixel dimensions.
    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(width as f64, height as f64)
    }

    /// True when either dimension is zero, negative or not finite.
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite())
    }

    /// Width divided by height. Returns `None` for empty sizes.
    pub fn aspect(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.width / self.height)
        }
    }
}

/// An axis-aligned rectangle in client space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }

    /// A rect of `size` centered inside `self`.
    pub fn centered(&self, size: Size) -> Rect {
        let center = self.center();
        Rect::new(
            center.x - size.width / 2.0,
            center.y - size.height / 2.0,
            size.width,
            size.height,
        )
    }

    /// Apply a `translate(t) scale(s)` transform whose origin is `origin`.
    ///
    /// This mirrors how the zoomed image wrapper is rendered: every point
    /// `p` lands on `origin + (p - origin) * scale + translate`.
    pub fn transformed_about(&self, origin: Point, scale: f64, translate: Point) -> Rect {
        Rect::new(
            origin.x + (self.left - origin.x) * scale + translate.x,
            origin.y + (self.top - origin.y) * scale + translate.y,
            self.width * scale,
            self.height * scale,
        )
    }
}

/// Scale `content` to the largest size that fits entirely within `container`
/// while preserving its aspect ratio.
///
/// When the aspect ratios match the result is exactly the container. The
/// constrained dimension always equals the container's dimension exactly, and
/// the other never exceeds it.
///
/// # Example
/// ```ignore
/// let fitted = fit_contain(Size::new(800.0, 600.0), Size::new(4000.0, 2000.0));
/// assert_eq!(fitted, Size::new(800.0, 400.0));
/// ```
pub fn fit_contain(container: Size, content: Size) -> Size {
    let (Some(container_aspect), Some(content_aspect)) = (container.aspect(), content.aspect())
    else {
        return Size::ZERO;
    };

    if (container_aspect - content_aspect).abs() <= f64::EPSILON * container_aspect.max(1.0) {
        return container;
    }

    if container_aspect > content_aspect {
        // Container is wider: height is the constraint
        let width = (container.height * content_aspect).min(container.width);
        Size::new(width, container.height)
    } else {
        // Container is taller: width is the constraint
        let height = (container.width / content_aspect).min(container.height);
        Size::new(container.width, height)
    }
}

/// Map a client-space point onto the natural pixel grid of an image displayed
/// in `display_rect`.
///
/// `display_rect` must be the box the image actually occupies on screen, after
/// fitting and any zoom/pan transform, so that the mapped point is exactly the
/// pixel the user targeted. Returns `None` when the rect or the natural size
/// is empty.
pub fn screen_to_natural(point: Point, display_rect: Rect, natural: Size) -> Option<Point> {
    if display_rect.size().is_empty() || natural.is_empty() {
        return None;
    }
    let scale_x = natural.width / display_rect.width;
    let scale_y = natural.height / display_rect.height;
    Some(Point::new(
        (point.x - display_rect.left) * scale_x,
        (point.y - display_rect.top) * scale_y,
    ))
}

/// Inverse of [`screen_to_natural`].
pub fn natural_to_screen(point: Point, display_rect: Rect, natural: Size) -> Option<Point> {
    if display_rect.size().is_empty() || natural.is_empty() {
        return None;
    }
    Some(Point::new(
        display_rect.left + point.x * display_rect.width / natural.width,
        display_rect.top + point.y * display_rect.height / natural.height,
    ))
}

/// Result of a zoom step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomStep {
    /// Clamped scale, in `[1, MAX_ZOOM]`.
    pub scale: f64,
    /// New translate (viewport space).
    pub translate: Point,
    /// True when the clamped scale reached 1: the caller must leave zoom mode.
    pub exited: bool,
}

/// Recompute the translate so the content under `anchor` stays put while the
/// scale changes from `old_scale` to `new_scale`.
///
/// `anchor` and `translate` are both in viewport space (relative to the
/// viewport center, which is the transform origin):
///
/// `translate' = anchor - (anchor - translate) * (new_scale / old_scale)`
///
/// `new_scale` is clamped to `[1, MAX_ZOOM]`. Reaching 1 resets translate to
/// the origin and flags the step as an exit.
pub fn zoom_anchored(old_scale: f64, new_scale: f64, translate: Point, anchor: Point) -> ZoomStep {
    let scale = if new_scale.is_nan() {
        1.0
    } else {
        new_scale.clamp(1.0, MAX_ZOOM)
    };

    if scale <= 1.0 {
        return ZoomStep {
            scale: 1.0,
            translate: Point::ORIGIN,
            exited: true,
        };
    }

    let ratio = scale / old_scale.max(1.0);
    ZoomStep {
        scale,
        translate: Point::new(
            anchor.x - (anchor.x - translate.x) * ratio,
            anchor.y - (anchor.y - translate.y) * ratio,
        ),
        exited: false,
    }
}

/// Horizontal pointer position as a percentage of `rect`'s width, clamped to
/// `[0, 100]`.
pub fn slider_percent(client_x: f64, rect: Rect) -> f64 {
    if rect.width <= 0.0 {
        return 0.0;
    }
    let x = (client_x - rect.left).clamp(0.0, rect.width);
    x / rect.width * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_fit_contain_wide_content() {
        let fitted = fit_contain(Size::new(800.0, 600.0), Size::new(4000.0, 2000.0));
        assert_eq!(fitted, Size::new(800.0, 400.0));
    }

    #[test]
    fn test_fit_contain_tall_content() {
        let fitted = fit_contain(Size::new(800.0, 600.0), Size::new(1000.0, 2000.0));
        assert_eq!(fitted, Size::new(300.0, 600.0));
    }

    #[test]
    fn test_fit_contain_matching_aspect_fills_container() {
        let fitted = fit_contain(Size::new(640.0, 480.0), Size::new(4000.0, 3000.0));
        assert_eq!(fitted, Size::new(640.0, 480.0));
    }

    #[test]
    fn test_fit_contain_upscales_small_content() {
        let fitted = fit_contain(Size::new(1000.0, 1000.0), Size::new(10.0, 5.0));
        assert_eq!(fitted, Size::new(1000.0, 500.0));
    }

    #[test]
    fn test_fit_contain_degenerate() {
        assert_eq!(fit_contain(Size::ZERO, Size::new(10.0, 10.0)), Size::ZERO);
        assert_eq!(fit_contain(Size::new(10.0, 10.0), Size::new(0.0, 5.0)), Size::ZERO);
    }

    #[test]
    fn test_screen_to_natural_basic() {
        // 4000x3000 image shown at 400x300, offset by (100, 50)
        let rect = Rect::new(100.0, 50.0, 400.0, 300.0);
        let natural = Size::new(4000.0, 3000.0);
        let p = screen_to_natural(Point::new(300.0, 200.0), rect, natural).unwrap();
        assert!((p.x - 2000.0).abs() < EPS);
        assert!((p.y - 1500.0).abs() < EPS);
    }

    #[test]
    fn test_screen_to_natural_corners() {
        let rect = Rect::new(10.0, 20.0, 200.0, 100.0);
        let natural = Size::new(1000.0, 500.0);
        let top_left = screen_to_natural(Point::new(10.0, 20.0), rect, natural).unwrap();
        let bottom_right = screen_to_natural(Point::new(210.0, 120.0), rect, natural).unwrap();
        assert_eq!(top_left, Point::ORIGIN);
        assert!((bottom_right.x - 1000.0).abs() < EPS);
        assert!((bottom_right.y - 500.0).abs() < EPS);
    }

    #[test]
    fn test_screen_to_natural_degenerate_rect() {
        let rect = Rect::new(0.0, 0.0, 0.0, 100.0);
        assert!(screen_to_natural(Point::ORIGIN, rect, Size::new(10.0, 10.0)).is_none());
    }

    #[test]
    fn test_zoom_anchored_keeps_anchor_fixed() {
        // Content point under the anchor: q = (anchor - translate) / scale
        let anchor = Point::new(120.0, -40.0);
        let translate = Point::new(30.0, 10.0);
        let step = zoom_anchored(2.0, 3.0, translate, anchor);

        let before = Point::new((anchor.x - translate.x) / 2.0, (anchor.y - translate.y) / 2.0);
        let after = Point::new(
            (anchor.x - step.translate.x) / step.scale,
            (anchor.y - step.translate.y) / step.scale,
        );
        assert!((before.x - after.x).abs() < EPS);
        assert!((before.y - after.y).abs() < EPS);
        assert!(!step.exited);
    }

    #[test]
    fn test_zoom_anchored_clamps_upper_bound() {
        let step = zoom_anchored(9.9, 25.0, Point::ORIGIN, Point::ORIGIN);
        assert_eq!(step.scale, MAX_ZOOM);
        assert!(!step.exited);
    }

    #[test]
    fn test_zoom_anchored_exit_resets_translate() {
        let step = zoom_anchored(1.2, 1.0, Point::new(55.0, -12.0), Point::new(10.0, 10.0));
        assert_eq!(step.scale, 1.0);
        assert_eq!(step.translate, Point::ORIGIN);
        assert!(step.exited);

        let below = zoom_anchored(1.2, 0.4, Point::new(55.0, -12.0), Point::ORIGIN);
        assert!(below.exited);
        assert_eq!(below.translate, Point::ORIGIN);
    }

    #[test]
    fn test_rect_transformed_about_center() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let zoomed = rect.transformed_about(rect.center(), 2.0, Point::new(10.0, 0.0));
        assert_eq!(zoomed, Rect::new(-40.0, -25.0, 200.0, 100.0));
    }

    #[test]
    fn test_slider_percent_clamps() {
        let rect = Rect::new(100.0, 0.0, 200.0, 100.0);
        assert_eq!(slider_percent(50.0, rect), 0.0);
        assert_eq!(slider_percent(200.0, rect), 50.0);
        assert_eq!(slider_percent(900.0, rect), 100.0);
        assert_eq!(slider_percent(10.0, Rect::default()), 0.0);
    }

    #[test]
    fn test_rect_contains_is_inclusive() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains(Point::new(10.0, 10.0)));
        assert!(!rect.contains(Point::new(10.1, 5.0)));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        1.0f64..=8000.0
    }

    /// Lay out an image of `natural` size in a container the way the viewport does.
    fn layout(container: Rect, natural: Size) -> Rect {
        container.centered(fit_contain(container.size(), natural))
    }

    proptest! {
        /// Property: the fitted size never exceeds the container.
        #[test]
        fn prop_fit_within_container(
            cw in dimension(), ch in dimension(), iw in dimension(), ih in dimension(),
        ) {
            let fitted = fit_contain(Size::new(cw, ch), Size::new(iw, ih));
            prop_assert!(fitted.width <= cw);
            prop_assert!(fitted.height <= ch);
        }

        /// Property: at least one dimension matches the container exactly.
        #[test]
        fn prop_fit_touches_container(
            cw in dimension(), ch in dimension(), iw in dimension(), ih in dimension(),
        ) {
            let fitted = fit_contain(Size::new(cw, ch), Size::new(iw, ih));
            prop_assert!(fitted.width == cw || fitted.height == ch);
        }

        /// Property: fitting preserves the content aspect ratio.
        #[test]
        fn prop_fit_preserves_aspect(
            cw in dimension(), ch in dimension(), iw in dimension(), ih in dimension(),
        ) {
            let fitted = fit_contain(Size::new(cw, ch), Size::new(iw, ih));
            let expected = iw / ih;
            let actual = fitted.width / fitted.height;
            prop_assert!((expected - actual).abs() / expected < 1e-9);
        }

        /// Property: any zoom sequence ending at scale 1 leaves the translate at the origin.
        #[test]
        fn prop_zoom_to_identity_resets_translate(
            steps in prop::collection::vec((0.0f64..12.0, -500.0f64..500.0, -500.0f64..500.0), 1..12),
        ) {
            let mut scale = ZOOM_IN_SCALE;
            let mut translate = Point::ORIGIN;
            for (target, ax, ay) in steps {
                let step = zoom_anchored(scale, target, translate, Point::new(ax, ay));
                scale = step.scale;
                translate = step.translate;
            }
            let last = zoom_anchored(scale, 1.0, translate, Point::new(3.0, 4.0));
            prop_assert_eq!(last.scale, 1.0);
            prop_assert_eq!(last.translate, Point::ORIGIN);
            prop_assert!(last.exited);
        }

        /// Property: the content point under the anchor is unchanged by a zoom step.
        #[test]
        fn prop_zoom_anchor_stationary(
            old in 1.0f64..MAX_ZOOM, new in 1.01f64..MAX_ZOOM,
            tx in -400.0f64..400.0, ty in -400.0f64..400.0,
            ax in -400.0f64..400.0, ay in -400.0f64..400.0,
        ) {
            let step = zoom_anchored(old, new, Point::new(tx, ty), Point::new(ax, ay));
            let before_x = (ax - tx) / old;
            let after_x = (ax - step.translate.x) / step.scale;
            let before_y = (ay - ty) / old;
            let after_y = (ay - step.translate.y) / step.scale;
            prop_assert!((before_x - after_x).abs() < 1e-6);
            prop_assert!((before_y - after_y).abs() < 1e-6);
        }

        /// Property: a natural coordinate survives a container resize.
        ///
        /// Mapping a natural point to the screen under one layout and back under a
        /// re-run layout for a different container yields the same natural point.
        #[test]
        fn prop_natural_point_stable_under_resize(
            iw in 16u32..6000, ih in 16u32..6000,
            (c1w, c1h) in (50.0f64..3000.0, 50.0f64..3000.0),
            (c2w, c2h) in (50.0f64..3000.0, 50.0f64..3000.0),
            fx in 0.0f64..=1.0, fy in 0.0f64..=1.0,
        ) {
            let natural = Size::from_pixels(iw, ih);
            let target = Point::new(fx * natural.width, fy * natural.height);

            for container in [Rect::new(0.0, 0.0, c1w, c1h), Rect::new(37.0, 12.0, c2w, c2h)] {
                let rect = layout(container, natural);
                let screen = natural_to_screen(target, rect, natural).unwrap();
                let back = screen_to_natural(screen, rect, natural).unwrap();
                prop_assert!((back.x - target.x).abs() < 1e-6 * natural.width.max(1.0));
                prop_assert!((back.y - target.y).abs() < 1e-6 * natural.height.max(1.0));
            }
        }

        /// Property: slider percentage is always within [0, 100].
        #[test]
        fn prop_slider_percent_bounded(x in -5000.0f64..5000.0, left in -100.0f64..100.0, w in 1.0f64..2000.0) {
            let pct = slider_percent(x, Rect::new(left, 0.0, w, 10.0));
            prop_assert!((0.0..=100.0).contains(&pct));
        }
    }
}
