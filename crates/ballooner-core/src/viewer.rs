//! Headless view state: current page, interaction mode, rotation and zoom/pan
//!
//! A GUI front end forwards raw pointer input here and gets back document
//! space coordinates. Rendering stays with the front end; this module only
//! decides where things are.

use crate::balloon::{Balloon, DocPoint};
use crate::coords::{doc_to_scene, rotate, scene_to_doc, unrotate, ScreenPoint, Viewport};
use crate::pdf::PageGeometry;
use std::collections::BTreeMap;
use uuid::Uuid;

/// On-screen balloon radius in device pixels; constant at every zoom.
pub const BALLOON_VISUAL_RADIUS_PX: f64 = 18.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Navigate,
    Balloon,
    Move,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerEvent {
    /// Left click in balloon mode
    BalloonRequested { page: u32, target: DocPoint },
    /// A balloon dragged in move mode was dropped; the leader target stays put
    BalloonMoved {
        uid: Uuid,
        center: DocPoint,
        target: DocPoint,
    },
}

/// Balloon held by a left drag in move mode
#[derive(Debug, Clone, Copy, PartialEq)]
struct Grab {
    uid: Uuid,
    /// Centre minus the document point under the pointer at press time
    offset: (f64, f64),
    start: DocPoint,
    center: DocPoint,
    target: DocPoint,
}

#[derive(Debug, Clone)]
pub struct Viewer {
    pages: Vec<PageGeometry>,
    current: u32,
    mode: ViewMode,
    /// Rotation added by the user on top of each page's own `/Rotate`
    user_rotations: BTreeMap<u32, u32>,
    viewport: Viewport,
    pan_last: Option<ScreenPoint>,
    pan_button: Option<PointerButton>,
    grab: Option<Grab>,
    balloon_radius_px: f64,
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl Viewer {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            pages: Vec::new(),
            current: 0,
            mode: ViewMode::Navigate,
            user_rotations: BTreeMap::new(),
            viewport,
            pan_last: None,
            pan_button: None,
            grab: None,
            balloon_radius_px: BALLOON_VISUAL_RADIUS_PX,
        }
    }

    pub fn with_balloon_radius(mut self, radius_px: f64) -> Self {
        self.balloon_radius_px = radius_px;
        self
    }

    /// Show a new document from its first page at 100%.
    pub fn load(&mut self, pages: Vec<PageGeometry>) {
        self.pages = pages;
        self.current = 0;
        self.user_rotations.clear();
        self.pan_last = None;
        self.pan_button = None;
        self.grab = None;
        self.viewport.set_zoom(1.0);
        self.viewport.set_pan(ScreenPoint::default());
        tracing::debug!(pages = self.pages.len(), "viewer loaded document");
    }

    pub fn is_loaded(&self) -> bool {
        !self.pages.is_empty()
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn current_page(&self) -> u32 {
        self.current
    }

    pub fn page(&self) -> Option<&PageGeometry> {
        self.pages.get(self.current as usize)
    }

    /// Jump to `page`, clamped into range. Returns the page actually shown.
    pub fn set_page(&mut self, page: u32) -> u32 {
        if let Some(last) = self.page_count().checked_sub(1) {
            self.current = page.min(last);
        }
        self.current
    }

    pub fn next_page(&mut self) -> u32 {
        self.set_page(self.current.saturating_add(1))
    }

    pub fn prev_page(&mut self) -> u32 {
        self.set_page(self.current.saturating_sub(1))
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        self.mode = mode;
        self.grab = None;
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn rotate_cw(&mut self) -> u32 {
        self.rotate_current(90)
    }

    pub fn rotate_ccw(&mut self) -> u32 {
        self.rotate_current(270)
    }

    fn rotate_current(&mut self, delta: u32) -> u32 {
        let rotation = (self.user_rotation(self.current) + delta) % 360;
        if rotation == 0 {
            self.user_rotations.remove(&self.current);
        } else {
            self.user_rotations.insert(self.current, rotation);
        }
        rotation
    }

    pub fn user_rotation(&self, page: u32) -> u32 {
        self.user_rotations.get(&page).copied().unwrap_or(0)
    }

    pub fn user_rotations(&self) -> &BTreeMap<u32, u32> {
        &self.user_rotations
    }

    pub fn set_user_rotations(&mut self, rotations: BTreeMap<u32, u32>) {
        self.user_rotations = rotations
            .into_iter()
            .map(|(page, r)| (page, r % 360))
            .filter(|&(_, r)| r != 0)
            .collect();
    }

    /// Total rotation of the current page as displayed
    pub fn displayed_rotation(&self) -> u32 {
        self.page()
            .map(|g| g.displayed_rotation(self.user_rotation(self.current)))
            .unwrap_or(0)
    }

    /// Size of the current page in scene units (points)
    pub fn displayed_size(&self) -> (f64, f64) {
        self.page()
            .map(|g| g.displayed_size(self.user_rotation(self.current)))
            .unwrap_or((0.0, 0.0))
    }

    /// Map a device pixel on the current page to document space.
    pub fn device_to_doc(&self, p: ScreenPoint) -> DocPoint {
        let geom = self.page().copied().unwrap_or_default();
        let (_, displayed_h) = self.displayed_size();
        let scene = self.viewport.device_to_scene(p);
        let view_doc = scene_to_doc(scene, displayed_h);
        unrotate(view_doc, self.displayed_rotation(), geom.width(), geom.height())
    }

    /// Map a document-space point on the current page to device pixels.
    pub fn doc_to_device(&self, p: DocPoint) -> ScreenPoint {
        self.viewport.scene_to_device(self.doc_to_scene(p))
    }

    fn doc_to_scene(&self, p: DocPoint) -> ScreenPoint {
        let geom = self.page().copied().unwrap_or_default();
        let (_, displayed_h) = self.displayed_size();
        let view_doc = rotate(p, self.displayed_rotation(), geom.width(), geom.height());
        doc_to_scene(view_doc, displayed_h)
    }

    /// Middle button pans in every mode. The left button places a balloon in
    /// balloon mode, picks one up in move mode and pans in navigate mode.
    pub fn press<'a>(
        &mut self,
        button: PointerButton,
        at: ScreenPoint,
        balloons: impl IntoIterator<Item = &'a Balloon>,
    ) -> Option<ViewerEvent> {
        match (button, self.mode) {
            (PointerButton::Middle, _) | (PointerButton::Left, ViewMode::Navigate) => {
                self.pan_last = Some(at);
                self.pan_button = Some(button);
                None
            }
            (PointerButton::Left, ViewMode::Balloon) if self.is_loaded() => {
                Some(ViewerEvent::BalloonRequested {
                    page: self.current,
                    target: self.device_to_doc(at),
                })
            }
            (PointerButton::Left, ViewMode::Move) if self.is_loaded() => {
                let balloons: Vec<&Balloon> = balloons.into_iter().collect();
                let uid = self.balloon_at(at, balloons.iter().copied())?;
                let held = balloons.into_iter().rev().find(|b| b.uid == uid)?;
                let under = self.device_to_doc(at);
                let center = held.balloon_center;
                self.grab = Some(Grab {
                    uid,
                    offset: (center.x - under.x, center.y - under.y),
                    start: center,
                    center,
                    target: held.target_point,
                });
                None
            }
            _ => None,
        }
    }

    /// Pans while a pan button is held, or carries the grabbed balloon.
    pub fn drag(&mut self, to: ScreenPoint) {
        if let Some(last) = self.pan_last {
            self.viewport.pan_by(to.x - last.x, to.y - last.y);
            self.pan_last = Some(to);
        } else if let Some(grab) = self.grab {
            let under = self.device_to_doc(to);
            let center = under.offset(grab.offset.0, grab.offset.1);
            self.grab = Some(Grab { center, ..grab });
        }
    }

    /// Ends a pan or drops the grabbed balloon. A drop that changed the
    /// centre is reported for the sheet to record as a move.
    pub fn release(&mut self, button: PointerButton) -> Option<ViewerEvent> {
        if self.pan_button == Some(button) {
            self.pan_last = None;
            self.pan_button = None;
            return None;
        }
        if button != PointerButton::Left {
            return None;
        }
        let grab = self.grab.take()?;
        (grab.center != grab.start).then_some(ViewerEvent::BalloonMoved {
            uid: grab.uid,
            center: grab.center,
            target: grab.target,
        })
    }

    /// Centre of the balloon being dragged, for live feedback
    pub fn dragged_center(&self) -> Option<(Uuid, DocPoint)> {
        self.grab.map(|g| (g.uid, g.center))
    }

    pub fn is_panning(&self) -> bool {
        self.pan_last.is_some()
    }

    /// Ctrl+wheel zooms around the pointer. Returns the new zoom when it changed.
    pub fn wheel(&mut self, delta: f64, at: ScreenPoint, ctrl: bool) -> Option<f64> {
        if !ctrl || delta == 0.0 {
            return None;
        }
        Some(self.viewport.wheel(delta, at))
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.viewport.zoom_in()
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.viewport.zoom_out()
    }

    pub fn fit_to_page(&mut self) -> f64 {
        let (w, h) = self.displayed_size();
        self.viewport.fit_to_page(w, h)
    }

    pub fn fit_to_width(&mut self) -> f64 {
        let (w, _) = self.displayed_size();
        self.viewport.fit_to_width(w)
    }

    /// Topmost balloon on the current page whose circle covers `at`.
    pub fn balloon_at<'a>(
        &self,
        at: ScreenPoint,
        balloons: impl IntoIterator<Item = &'a Balloon>,
    ) -> Option<Uuid> {
        balloons
            .into_iter()
            .filter(|b| b.page == self.current)
            .filter(|b| {
                let c = self.doc_to_device(b.balloon_center);
                (c.x - at.x).hypot(c.y - at.y) <= self.balloon_radius_px
            })
            .last()
            .map(|b| b.uid)
    }

    /// Switch to the balloon's page and centre it in the viewport.
    pub fn scroll_to(&mut self, balloon: &Balloon) {
        self.set_page(balloon.page);
        let scene = self.doc_to_scene(balloon.balloon_center);
        self.viewport.center_on(scene);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_BALLOONS: &[Balloon] = &[];

    fn letter() -> PageGeometry {
        PageGeometry {
            media_box: [0.0, 0.0, 612.0, 792.0],
            rotation: 0,
        }
    }

    fn viewer_with_pages(n: usize) -> Viewer {
        let mut viewer = Viewer::new(Viewport::new(800.0, 600.0));
        viewer.load(vec![letter(); n]);
        viewer
    }

    fn close(a: DocPoint, b: DocPoint) -> bool {
        (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
    }

    #[test]
    fn test_click_at_origin_maps_to_top_left_of_page() {
        let mut viewer = viewer_with_pages(1);
        viewer.set_mode(ViewMode::Balloon);
        let event = viewer.press(PointerButton::Left, ScreenPoint::new(0.0, 0.0), NO_BALLOONS);
        assert_eq!(
            event,
            Some(ViewerEvent::BalloonRequested {
                page: 0,
                target: DocPoint::new(0.0, 792.0),
            })
        );
    }

    #[test]
    fn test_click_ignored_outside_balloon_mode() {
        let mut viewer = viewer_with_pages(1);
        assert!(viewer.press(PointerButton::Left, ScreenPoint::new(10.0, 10.0), NO_BALLOONS).is_none());
        viewer.set_mode(ViewMode::Move);
        assert!(viewer.press(PointerButton::Left, ScreenPoint::new(10.0, 10.0), NO_BALLOONS).is_none());
        assert!(viewer.release(PointerButton::Left).is_none());
    }

    #[test]
    fn test_click_with_zoom_and_pan() {
        let mut viewer = viewer_with_pages(1);
        viewer.set_mode(ViewMode::Balloon);
        viewer.viewport_mut().set_zoom(2.0);
        viewer.viewport_mut().set_pan(ScreenPoint::new(100.0, 50.0));
        let Some(ViewerEvent::BalloonRequested { target, .. }) =
            viewer.press(PointerButton::Left, ScreenPoint::new(300.0, 250.0), NO_BALLOONS)
        else {
            panic!("expected a balloon request");
        };
        // scene = ((300 + 100) / 2, (250 + 50) / 2) = (200, 150)
        assert!(close(target, DocPoint::new(200.0, 642.0)));
    }

    #[test]
    fn test_rotated_page_maps_back_to_document_space() {
        let mut viewer = viewer_with_pages(1);
        viewer.rotate_cw();
        assert_eq!(viewer.displayed_size(), (792.0, 612.0));
        // Displayed top-left of a clockwise-rotated page is the original bottom-left
        assert!(close(
            viewer.device_to_doc(ScreenPoint::new(0.0, 0.0)),
            DocPoint::new(0.0, 0.0)
        ));
        // Displayed top-right is the original top-left
        assert!(close(
            viewer.device_to_doc(ScreenPoint::new(792.0, 0.0)),
            DocPoint::new(0.0, 792.0)
        ));
    }

    #[test]
    fn test_rotation_combines_with_intrinsic_rotate() {
        let mut viewer = Viewer::default();
        viewer.load(vec![PageGeometry {
            media_box: [0.0, 0.0, 612.0, 792.0],
            rotation: 90,
        }]);
        assert_eq!(viewer.displayed_rotation(), 90);
        viewer.rotate_ccw();
        assert_eq!(viewer.displayed_rotation(), 0);
        assert!(viewer.user_rotations().contains_key(&0));
        viewer.rotate_cw();
        assert!(viewer.user_rotations().is_empty());
    }

    #[test]
    fn test_doc_device_roundtrip_every_rotation() {
        let mut viewer = viewer_with_pages(1);
        viewer.viewport_mut().set_zoom(1.7);
        viewer.viewport_mut().set_pan(ScreenPoint::new(-40.0, 25.0));
        let p = DocPoint::new(123.5, 456.25);
        for _ in 0..4 {
            let back = viewer.device_to_doc(viewer.doc_to_device(p));
            assert!(close(back, p), "rotation {}", viewer.displayed_rotation());
            viewer.rotate_cw();
        }
    }

    #[test]
    fn test_page_navigation_clamps() {
        let mut viewer = viewer_with_pages(3);
        assert_eq!(viewer.prev_page(), 0);
        assert_eq!(viewer.set_page(10), 2);
        assert_eq!(viewer.next_page(), 2);
        assert_eq!(viewer.prev_page(), 1);
    }

    #[test]
    fn test_middle_drag_pans() {
        let mut viewer = viewer_with_pages(1);
        let p = DocPoint::new(100.0, 100.0);
        let before = viewer.doc_to_device(p);
        viewer.set_mode(ViewMode::Balloon);
        viewer.press(PointerButton::Middle, ScreenPoint::new(10.0, 10.0), NO_BALLOONS);
        assert!(viewer.is_panning());
        viewer.drag(ScreenPoint::new(30.0, 5.0));
        assert!(viewer.release(PointerButton::Middle).is_none());
        assert!(!viewer.is_panning());
        let after = viewer.doc_to_device(p);
        assert!((after.x - before.x - 20.0).abs() < 1e-9);
        assert!((after.y - before.y + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_left_drag_pans_in_navigate_mode() {
        let mut viewer = viewer_with_pages(1);
        assert_eq!(viewer.mode(), ViewMode::Navigate);
        let p = DocPoint::new(100.0, 100.0);
        let before = viewer.doc_to_device(p);
        viewer.press(PointerButton::Left, ScreenPoint::new(50.0, 50.0), NO_BALLOONS);
        assert!(viewer.is_panning());
        viewer.drag(ScreenPoint::new(40.0, 70.0));
        // Another button's release does not end the pan
        viewer.release(PointerButton::Middle);
        assert!(viewer.is_panning());
        viewer.release(PointerButton::Left);
        assert!(!viewer.is_panning());
        let after = viewer.doc_to_device(p);
        assert!((after.x - before.x + 10.0).abs() < 1e-9);
        assert!((after.y - before.y - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_move_mode_drags_balloon_centre() {
        let mut viewer = viewer_with_pages(1);
        viewer.set_mode(ViewMode::Move);
        viewer.viewport_mut().set_zoom(2.0);
        // Centre (100, 692) is at scene (100, 100), device (200, 200)
        let b = Balloon::new(1, 0, DocPoint::new(10.0, 10.0), DocPoint::new(100.0, 692.0));
        let balloons = vec![b.clone()];

        // Grab 6 px right of the centre, then move 40 px right and 20 px down
        assert!(viewer.press(PointerButton::Left, ScreenPoint::new(206.0, 200.0), &balloons).is_none());
        assert!(!viewer.is_panning());
        viewer.drag(ScreenPoint::new(246.0, 220.0));
        let (uid, live) = viewer.dragged_center().unwrap();
        assert_eq!(uid, b.uid);
        assert!(close(live, DocPoint::new(120.0, 682.0)));

        let event = viewer.release(PointerButton::Left);
        let Some(ViewerEvent::BalloonMoved { uid, center, target }) = event else {
            panic!("expected a move, got {:?}", event);
        };
        assert_eq!(uid, b.uid);
        assert!(close(center, DocPoint::new(120.0, 682.0)));
        assert_eq!(target, b.target_point);
        assert!(viewer.dragged_center().is_none());
    }

    #[test]
    fn test_move_mode_without_motion_or_hit_reports_nothing() {
        let mut viewer = viewer_with_pages(1);
        viewer.set_mode(ViewMode::Move);
        let balloons = vec![Balloon::new(1, 0, DocPoint::new(10.0, 10.0), DocPoint::new(100.0, 692.0))];

        viewer.press(PointerButton::Left, ScreenPoint::new(100.0, 100.0), &balloons);
        assert!(viewer.release(PointerButton::Left).is_none());

        viewer.press(PointerButton::Left, ScreenPoint::new(300.0, 300.0), &balloons);
        viewer.drag(ScreenPoint::new(350.0, 350.0));
        assert!(viewer.release(PointerButton::Left).is_none());
        assert!(!viewer.is_panning());
    }

    #[test]
    fn test_wheel_requires_ctrl() {
        let mut viewer = viewer_with_pages(1);
        assert!(viewer.wheel(120.0, ScreenPoint::new(0.0, 0.0), false).is_none());
        let zoom = viewer.wheel(-120.0, ScreenPoint::new(0.0, 0.0), true).unwrap();
        assert!((zoom - 1.0 / 1.15).abs() < 1e-12);
    }

    #[test]
    fn test_balloon_hit_test_uses_screen_radius() {
        let mut viewer = viewer_with_pages(2);
        let b = Balloon::new(1, 0, DocPoint::new(10.0, 10.0), DocPoint::new(100.0, 692.0));
        let other_page = Balloon::new(2, 1, DocPoint::new(10.0, 10.0), DocPoint::new(100.0, 692.0));
        let balloons = vec![b.clone(), other_page];

        // Centre (100, 692) is at scene (100, 100)
        assert_eq!(viewer.balloon_at(ScreenPoint::new(110.0, 110.0), &balloons), Some(b.uid));
        assert_eq!(viewer.balloon_at(ScreenPoint::new(120.0, 120.0), &balloons), None);

        // Radius stays 18 px when zoomed in
        viewer.viewport_mut().set_zoom(4.0);
        assert_eq!(viewer.balloon_at(ScreenPoint::new(415.0, 400.0), &balloons), Some(b.uid));
    }

    #[test]
    fn test_scroll_to_switches_page_and_centres() {
        let mut viewer = viewer_with_pages(2);
        let b = Balloon::new(1, 1, DocPoint::new(0.0, 0.0), DocPoint::new(306.0, 396.0));
        viewer.scroll_to(&b);
        assert_eq!(viewer.current_page(), 1);
        let device = viewer.doc_to_device(b.balloon_center);
        assert!((device.x - 400.0).abs() < 1e-9);
        assert!((device.y - 300.0).abs() < 1e-9);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn quarter_turn() -> impl Strategy<Value = u32> {
        prop_oneof![Just(0u32), Just(90u32), Just(180u32), Just(270u32)]
    }

    proptest! {
        /// Device -> document -> device through the whole viewer stack
        #[test]
        fn device_doc_roundtrip(
            x0 in -500.0f64..500.0,
            y0 in -500.0f64..500.0,
            w in 50.0f64..3000.0,
            h in 50.0f64..3000.0,
            intrinsic in quarter_turn(),
            user in quarter_turn(),
            zoom in 0.05f64..20.0,
            pan_x in -5000.0f64..5000.0,
            pan_y in -5000.0f64..5000.0,
            x in -200.0f64..2000.0,
            y in -200.0f64..2000.0,
        ) {
            let mut viewer = Viewer::new(Viewport::new(1280.0, 900.0));
            viewer.load(vec![PageGeometry {
                media_box: [x0, y0, x0 + w, y0 + h],
                rotation: intrinsic,
            }]);
            viewer.set_user_rotations(BTreeMap::from([(0, user)]));
            viewer.viewport_mut().set_zoom(zoom);
            viewer.viewport_mut().set_pan(ScreenPoint::new(pan_x, pan_y));

            let device = ScreenPoint::new(x, y);
            let back = viewer.doc_to_device(viewer.device_to_doc(device));
            prop_assert!((back.x - x).abs() < 1e-6);
            prop_assert!((back.y - y).abs() < 1e-6);
        }

        /// Document -> device -> document, so stored balloons never drift
        #[test]
        fn doc_device_roundtrip(
            w in 50.0f64..3000.0,
            h in 50.0f64..3000.0,
            user in quarter_turn(),
            zoom in 0.05f64..20.0,
            pan_x in -5000.0f64..5000.0,
            pan_y in -5000.0f64..5000.0,
            x_pct in 0.0f64..=1.0,
            y_pct in 0.0f64..=1.0,
        ) {
            let mut viewer = Viewer::new(Viewport::new(1280.0, 900.0));
            viewer.load(vec![PageGeometry {
                media_box: [0.0, 0.0, w, h],
                rotation: 0,
            }]);
            viewer.set_user_rotations(BTreeMap::from([(0, user)]));
            viewer.viewport_mut().set_zoom(zoom);
            viewer.viewport_mut().set_pan(ScreenPoint::new(pan_x, pan_y));

            let p = DocPoint::new(x_pct * w, y_pct * h);
            let back = viewer.device_to_doc(viewer.doc_to_device(p));
            prop_assert!((back.x - p.x).abs() < 1e-6);
            prop_assert!((back.y - p.y).abs() < 1e-6);
        }
    }
}
