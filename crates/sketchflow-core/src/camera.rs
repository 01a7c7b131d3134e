//! Camera module for pan/zoom transforms.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Zoom limits.
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 20.0;

/// Camera manages the view transform for the canvas.
///
/// Zoom is centred on the viewport: `scale_offset` is half the growth of the
/// scaled viewport and is recomputed whenever the zoom or the viewport changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Pan offset, in world units.
    pub translate: Vec2,
    /// Zoom factor (1.0 = 100%).
    pub scale: f64,
    /// Centre-zoom correction, in screen pixels.
    pub scale_offset: Vec2,
    /// Size of the drawing surface in screen pixels.
    viewport: Size,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            scale: 1.0,
            scale_offset: Vec2::ZERO,
            viewport: Size::ZERO,
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the affine transform for rendering (world to screen).
    pub fn transform(&self) -> Affine {
        Affine::translate(self.translate * self.scale - self.scale_offset) * Affine::scale(self.scale)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        Point::new(
            (screen_point.x - self.translate.x * self.scale + self.scale_offset.x) / self.scale,
            (screen_point.y - self.translate.y * self.scale + self.scale_offset.y) / self.scale,
        )
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Resize the drawing surface.
    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
        self.update_scale_offset();
    }

    /// Pan the camera by a delta in world units.
    pub fn pan(&mut self, delta: Vec2) {
        self.translate += delta;
    }

    /// Change the zoom by `delta`, clamped to `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn zoom_by(&mut self, delta: f64) {
        self.set_zoom(self.scale + delta);
    }

    pub fn set_zoom(&mut self, scale: f64) {
        self.scale = scale.clamp(MIN_ZOOM, MAX_ZOOM);
        self.update_scale_offset();
    }

    /// Reset zoom to 100%, keeping the pan offset.
    pub fn reset_zoom(&mut self) {
        self.set_zoom(1.0);
    }

    /// Half-size of resize handles in world units, so they keep a steady
    /// on-screen size.
    pub fn handle_padding(&self) -> f64 {
        (10.0 / self.scale).clamp(0.5, 50.0)
    }

    fn update_scale_offset(&mut self) {
        self.scale_offset = Vec2::new(
            (self.viewport.width * self.scale - self.viewport.width) / 2.0,
            (self.viewport.height * self.scale - self.viewport.height) / 2.0,
        );
    }
}
