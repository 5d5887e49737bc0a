//! Balloon records and the geometry derived from them
//!
//! A balloon is a flat record: a number, a page, two points and a few
//! display settings. Both points live in document space (points, origin at
//! the bottom-left of the page's MediaBox, Y up), so nothing here depends on
//! how the page happens to be zoomed, panned or rotated on screen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default diameter for balloons read from session files that omit it.
pub const DEFAULT_DIAMETER: f64 = 20.0;

/// Helvetica-Bold advance width of every digit, in em.
const DIGIT_ADVANCE_EM: f64 = 0.556;

/// A point in document space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct DocPoint {
    pub x: f64,
    pub y: f64,
}

impl DocPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance_to(self, other: DocPoint) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

impl From<[f64; 2]> for DocPoint {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<DocPoint> for [f64; 2] {
    fn from(p: DocPoint) -> Self {
        [p.x, p.y]
    }
}

/// RGB colour with components in 0..=1, as PDF operators expect them.
pub type Rgb = (f32, f32, f32);

const LEADER_RED: Rgb = (0.8, 0.0, 0.0);
const BLACK: Rgb = (0.0, 0.0, 0.0);
const WHITE: Rgb = (1.0, 1.0, 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalloonStyle {
    /// White disc, black outline, black number, red leader
    #[default]
    Default,
    /// Red disc with a white number
    Red,
    /// Unfilled circle
    Outline,
    /// No leader; red outline and number on white, centred on the target
    NoArrow,
}

/// Resolved colours for one style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub leader: Rgb,
    pub circle_stroke: Rgb,
    pub circle_fill: Option<Rgb>,
    pub text: Rgb,
    pub draw_leader: bool,
}

impl BalloonStyle {
    pub const ALL: [BalloonStyle; 4] = [
        BalloonStyle::Default,
        BalloonStyle::Red,
        BalloonStyle::Outline,
        BalloonStyle::NoArrow,
    ];

    pub fn palette(self) -> Palette {
        match self {
            BalloonStyle::Default => Palette {
                leader: LEADER_RED,
                circle_stroke: BLACK,
                circle_fill: Some(WHITE),
                text: BLACK,
                draw_leader: true,
            },
            BalloonStyle::Red => Palette {
                leader: LEADER_RED,
                circle_stroke: BLACK,
                circle_fill: Some((1.0, 0.0, 0.0)),
                text: WHITE,
                draw_leader: true,
            },
            BalloonStyle::Outline => Palette {
                leader: LEADER_RED,
                circle_stroke: BLACK,
                circle_fill: None,
                text: BLACK,
                draw_leader: true,
            },
            BalloonStyle::NoArrow => Palette {
                leader: LEADER_RED,
                circle_stroke: LEADER_RED,
                circle_fill: Some(WHITE),
                text: LEADER_RED,
                draw_leader: false,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BalloonStyle::Default => "default",
            BalloonStyle::Red => "red",
            BalloonStyle::Outline => "outline",
            BalloonStyle::NoArrow => "no_arrow",
        }
    }
}

impl std::str::FromStr for BalloonStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BalloonStyle::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown balloon style: {}", s))
    }
}

fn default_diameter() -> f64 {
    DEFAULT_DIAMETER
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balloon {
    pub number: u32,
    /// 0-indexed page
    pub page: u32,
    /// Where the arrow tip points
    pub target_point: DocPoint,
    /// Centre of the circle
    pub balloon_center: DocPoint,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_diameter")]
    pub diameter: f64,
    #[serde(default)]
    pub style: BalloonStyle,
    /// 0 selects the automatic size
    #[serde(default)]
    pub font_size_override: f64,
    pub uid: Uuid,
}

impl Balloon {
    pub fn new(number: u32, page: u32, target_point: DocPoint, balloon_center: DocPoint) -> Self {
        Self {
            number,
            page,
            target_point,
            balloon_center,
            description: String::new(),
            diameter: DEFAULT_DIAMETER,
            style: BalloonStyle::Default,
            font_size_override: 0.0,
            uid: Uuid::new_v4(),
        }
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    pub fn font_size(&self) -> f64 {
        if self.font_size_override > 0.0 {
            self.font_size_override
        } else {
            (self.radius() * 1.1).max(4.0)
        }
    }

    pub fn label(&self) -> String {
        self.number.to_string()
    }

    /// Leader segment from the circle edge to the target, if one is drawn.
    pub fn leader(&self) -> Option<Leader> {
        if !self.style.palette().draw_leader {
            return None;
        }
        Leader::between(self.balloon_center, self.target_point, self.radius())
    }

    /// Lower-left baseline origin that centres the number in the circle.
    pub fn label_origin(&self) -> DocPoint {
        let font_size = self.font_size();
        let width = DIGIT_ADVANCE_EM * font_size * self.label().chars().count() as f64;
        DocPoint::new(
            self.balloon_center.x - width / 2.0,
            self.balloon_center.y - font_size * 0.35,
        )
    }
}

/// Straight leader line with its arrowhead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leader {
    pub start: DocPoint,
    pub end: DocPoint,
}

impl Leader {
    /// Returns `None` when the target sits inside the circle, where the line
    /// would be hidden or meaningless.
    pub fn between(center: DocPoint, target: DocPoint, radius: f64) -> Option<Self> {
        let dist = center.distance_to(target);
        if dist <= radius {
            return None;
        }
        let ux = (target.x - center.x) / dist;
        let uy = (target.y - center.y) / dist;
        Some(Self {
            start: center.offset(ux * radius, uy * radius),
            end: target,
        })
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(self.end)
    }

    /// Triangle `[tip, left, right]` pointing at `end`.
    pub fn arrowhead(&self, size: f64) -> Option<[DocPoint; 3]> {
        let length = self.length();
        if length < 1.0 {
            return None;
        }
        let ux = (self.end.x - self.start.x) / length;
        let uy = (self.end.y - self.start.y) / length;
        let (px, py) = (-uy, ux);
        let half = size * 0.45;
        let base_x = self.end.x - size * ux;
        let base_y = self.end.y - size * uy;
        Some([
            self.end,
            DocPoint::new(base_x + half * px, base_y + half * py),
            DocPoint::new(base_x - half * px, base_y - half * py),
        ])
    }
}
