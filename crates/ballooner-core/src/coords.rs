//! Coordinate transformation between screen and PDF coordinate systems
//!
//! Device space is viewport pixels (top-left origin, Y down). Scene space is
//! the displayed, possibly rotated page in points (top-left origin, Y down);
//! the viewport applies zoom and pan on top of it. Document space is the
//! un-rotated page in points with the origin at the MediaBox lower-left.

use crate::balloon::DocPoint;
use crate::error::BalloonError;

pub const POINTS_PER_INCH: f64 = 72.0;
pub const BASE_DPI: f64 = 150.0;

/// A point in scene or device space (Y down).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pixels per point when rasterizing at `dpi`
pub fn render_scale(dpi: f64) -> f64 {
    dpi / POINTS_PER_INCH
}

/// Convert a document-space point (origin bottom-left, Y up) to scene space (origin top-left, Y down)
pub fn doc_to_scene(p: DocPoint, page_height: f64) -> ScreenPoint {
    ScreenPoint::new(p.x, page_height - p.y)
}

/// Inverse of [`doc_to_scene`]
pub fn scene_to_doc(p: ScreenPoint, page_height: f64) -> DocPoint {
    DocPoint::new(p.x, page_height - p.y)
}

/// Fold any multiple of 90 into 0, 90, 180 or 270
pub fn normalize_rotation(degrees: i32) -> Result<u32, BalloonError> {
    if degrees % 90 != 0 {
        return Err(BalloonError::InvalidRotation(degrees));
    }
    Ok(degrees.rem_euclid(360) as u32)
}

/// Size of the page as displayed under `rotation`
pub fn rotated_size(width: f64, height: f64, rotation: u32) -> (f64, f64) {
    match rotation {
        90 | 270 => (height, width),
        _ => (width, height),
    }
}

/// Map a point from the rotated (displayed) page back to the un-rotated page.
///
/// `width` and `height` are the un-rotated page dimensions. Rotation is
/// clockwise, matching the PDF `/Rotate` convention.
pub fn unrotate(p: DocPoint, rotation: u32, width: f64, height: f64) -> DocPoint {
    match rotation {
        90 => DocPoint::new(width - p.y, p.x),
        180 => DocPoint::new(width - p.x, height - p.y),
        270 => DocPoint::new(p.y, height - p.x),
        _ => p,
    }
}

/// Inverse of [`unrotate`]
pub fn rotate(p: DocPoint, rotation: u32, width: f64, height: f64) -> DocPoint {
    match rotation {
        90 => DocPoint::new(p.y, width - p.x),
        180 => DocPoint::new(width - p.x, height - p.y),
        270 => DocPoint::new(height - p.y, p.x),
        _ => p,
    }
}

/// Zoom and pan state of the on-screen page view.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    zoom: f64,
    /// Scroll offset in device pixels
    pan: ScreenPoint,
    /// Visible area in device pixels
    size: (f64, f64),
    min_zoom: f64,
    max_zoom: f64,
    zoom_step: f64,
    wheel_step: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: ScreenPoint::default(),
            size: (800.0, 600.0),
            min_zoom: 0.05,
            max_zoom: 20.0,
            zoom_step: 1.25,
            wheel_step: 1.15,
        }
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: (width, height),
            ..Self::default()
        }
    }

    /// Limits that are not finite and positive are ignored. Swapped bounds
    /// are put back in order.
    pub fn with_limits(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        let usable = |z: f64| z.is_finite() && z > 0.0;
        if usable(min_zoom) && usable(max_zoom) {
            self.min_zoom = min_zoom.min(max_zoom);
            self.max_zoom = min_zoom.max(max_zoom);
            self.zoom = self.zoom.clamp(self.min_zoom, self.max_zoom);
        }
        self
    }

    pub fn with_steps(mut self, zoom_step: f64, wheel_step: f64) -> Self {
        self.zoom_step = zoom_step;
        self.wheel_step = wheel_step;
        self
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> ScreenPoint {
        self.pan
    }

    pub fn size(&self) -> (f64, f64) {
        self.size
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.size = (width, height);
    }

    pub fn set_pan(&mut self, pan: ScreenPoint) {
        self.pan = pan;
    }

    /// Set the zoom factor, clamped to the configured limits. Returns the applied value.
    /// A non-finite zoom leaves the current one in place.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
        self.zoom
    }

    pub fn scene_to_device(&self, p: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(p.x * self.zoom - self.pan.x, p.y * self.zoom - self.pan.y)
    }

    pub fn device_to_scene(&self, p: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new((p.x + self.pan.x) / self.zoom, (p.y + self.pan.y) / self.zoom)
    }

    pub fn zoom_in(&mut self) -> f64 {
        let anchor = self.center();
        self.zoom_around(self.zoom * self.zoom_step, anchor)
    }

    pub fn zoom_out(&mut self) -> f64 {
        let anchor = self.center();
        self.zoom_around(self.zoom / self.zoom_step, anchor)
    }

    /// One wheel notch; positive deltas zoom in. The scene point under
    /// `anchor` stays put.
    pub fn wheel(&mut self, delta: f64, anchor: ScreenPoint) -> f64 {
        let factor = if delta > 0.0 {
            self.wheel_step
        } else {
            1.0 / self.wheel_step
        };
        self.zoom_around(self.zoom * factor, anchor)
    }

    /// Change zoom while keeping the scene point under device point `anchor` fixed.
    pub fn zoom_around(&mut self, zoom: f64, anchor: ScreenPoint) -> f64 {
        let scene = self.device_to_scene(anchor);
        self.set_zoom(zoom);
        self.pan = ScreenPoint::new(scene.x * self.zoom - anchor.x, scene.y * self.zoom - anchor.y);
        self.zoom
    }

    /// Middle-button drag: content follows the pointer.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan.x -= dx;
        self.pan.y -= dy;
    }

    /// Scroll so `scene` lands in the middle of the viewport.
    pub fn center_on(&mut self, scene: ScreenPoint) {
        let (w, h) = self.size;
        self.pan = ScreenPoint::new(scene.x * self.zoom - w / 2.0, scene.y * self.zoom - h / 2.0);
    }

    /// Largest zoom that shows the whole page, centred.
    pub fn fit_to_page(&mut self, page_width: f64, page_height: f64) -> f64 {
        let (w, h) = self.size;
        let sx = if page_width > 0.0 { w / page_width } else { 1.0 };
        let sy = if page_height > 0.0 { h / page_height } else { 1.0 };
        self.set_zoom(sx.min(sy));
        self.center_on(ScreenPoint::new(page_width / 2.0, page_height / 2.0));
        self.zoom
    }

    /// Zoom so the page width fills the viewport, scrolled to the top.
    pub fn fit_to_width(&mut self, page_width: f64) -> f64 {
        let scale = if page_width > 0.0 {
            self.size.0 / page_width
        } else {
            1.0
        };
        self.set_zoom(scale);
        self.pan = ScreenPoint::new(0.0, 0.0);
        self.zoom
    }

    fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.size.0 / 2.0, self.size.1 / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_y_axis_flip() {
        // PDF origin is bottom-left, scene origin is top-left
        let scene = doc_to_scene(DocPoint::new(0.0, 100.0), 792.0);
        assert_eq!(scene.y, 692.0);
        let back = scene_to_doc(scene, 792.0);
        assert_eq!(back, DocPoint::new(0.0, 100.0));
    }

    #[test]
    fn test_render_scale_base_dpi() {
        assert!((render_scale(BASE_DPI) - 150.0 / 72.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(0).unwrap(), 0);
        assert_eq!(normalize_rotation(-90).unwrap(), 270);
        assert_eq!(normalize_rotation(450).unwrap(), 90);
        assert!(normalize_rotation(45).is_err());
    }

    #[test]
    fn test_unrotate_corners_at_90() {
        // Letter page shown rotated clockwise: displayed page is 792 x 612
        let (w, h) = (612.0, 792.0);
        // Original top-left (0, h) appears at displayed top-right (h, w)
        assert_eq!(unrotate(DocPoint::new(h, w), 90, w, h), DocPoint::new(0.0, h));
        // Original bottom-left appears at displayed top-left
        assert_eq!(unrotate(DocPoint::new(0.0, w), 90, w, h), DocPoint::new(0.0, 0.0));
    }

    #[test]
    fn test_rotated_size_swaps_for_quarter_turns() {
        assert_eq!(rotated_size(612.0, 792.0, 90), (792.0, 612.0));
        assert_eq!(rotated_size(612.0, 792.0, 180), (612.0, 792.0));
    }

    #[test]
    fn test_zoom_clamped() {
        let mut vp = Viewport::new(800.0, 600.0);
        assert_eq!(vp.set_zoom(100.0), 20.0);
        assert_eq!(vp.set_zoom(0.0), 0.05);
        assert_eq!(vp.set_zoom(f64::NAN), 0.05);
    }

    #[test]
    fn test_limits_ordered_and_non_finite_ignored() {
        let mut vp = Viewport::new(800.0, 600.0).with_limits(4.0, 0.5);
        assert_eq!(vp.set_zoom(10.0), 4.0);
        assert_eq!(vp.set_zoom(0.1), 0.5);

        let mut vp = Viewport::new(800.0, 600.0).with_limits(0.5, f64::NAN);
        assert_eq!(vp.zoom(), 1.0);
        assert_eq!(vp.set_zoom(100.0), 20.0);
        let mut vp = Viewport::new(800.0, 600.0).with_limits(-1.0, 2.0);
        assert_eq!(vp.set_zoom(0.01), 0.05);
    }

    #[test]
    fn test_wheel_keeps_anchor_fixed() {
        let mut vp = Viewport::new(800.0, 600.0);
        vp.set_pan(ScreenPoint::new(37.0, 12.0));
        let anchor = ScreenPoint::new(250.0, 175.0);
        let before = vp.device_to_scene(anchor);
        vp.wheel(120.0, anchor);
        assert!((vp.zoom() - 1.15).abs() < 1e-12);
        let after = vp.device_to_scene(anchor);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_in_out_steps() {
        let mut vp = Viewport::new(800.0, 600.0);
        assert!((vp.zoom_in() - 1.25).abs() < 1e-12);
        assert!((vp.zoom_out() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_to_page_centres_page() {
        let mut vp = Viewport::new(800.0, 600.0);
        let zoom = vp.fit_to_page(612.0, 792.0);
        assert!((zoom - 600.0 / 792.0).abs() < 1e-12);
        let mid = vp.scene_to_device(ScreenPoint::new(306.0, 396.0));
        assert!((mid.x - 400.0).abs() < 1e-9);
        assert!((mid.y - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_to_width() {
        let mut vp = Viewport::new(918.0, 600.0);
        assert!((vp.fit_to_width(612.0) - 1.5).abs() < 1e-12);
        assert_eq!(vp.pan(), ScreenPoint::new(0.0, 0.0));
    }

    #[test]
    fn test_pan_moves_content_with_pointer() {
        let mut vp = Viewport::new(800.0, 600.0);
        let p = ScreenPoint::new(100.0, 100.0);
        let before = vp.scene_to_device(p);
        vp.pan_by(20.0, -10.0);
        let after = vp.scene_to_device(p);
        assert_eq!(after.x - before.x, 20.0);
        assert_eq!(after.y - before.y, -10.0);
    }
}
