//! GD&T, dimension and surface-finish description strings
//!
//! These only produce text. The result is stored in a balloon's
//! description and exported with it, so the format is part of the
//! CSV/Excel output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Geometric characteristic of a feature control frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Characteristic {
    TruePosition,
    Straightness,
    Flatness,
    Circularity,
    Cylindricity,
    ProfileOfLine,
    ProfileOfSurface,
    Perpendicularity,
    Angularity,
    Parallelism,
    Concentricity,
    Symmetry,
    CircularRunout,
    TotalRunout,
}

impl Characteristic {
    pub const ALL: [Characteristic; 14] = [
        Characteristic::TruePosition,
        Characteristic::Straightness,
        Characteristic::Flatness,
        Characteristic::Circularity,
        Characteristic::Cylindricity,
        Characteristic::ProfileOfLine,
        Characteristic::ProfileOfSurface,
        Characteristic::Perpendicularity,
        Characteristic::Angularity,
        Characteristic::Parallelism,
        Characteristic::Concentricity,
        Characteristic::Symmetry,
        Characteristic::CircularRunout,
        Characteristic::TotalRunout,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Characteristic::TruePosition => "⊕",
            Characteristic::Straightness => "⏤",
            Characteristic::Flatness => "⏥",
            Characteristic::Circularity => "○",
            Characteristic::Cylindricity => "⌭",
            Characteristic::ProfileOfLine => "⌒",
            Characteristic::ProfileOfSurface => "⌓",
            Characteristic::Perpendicularity => "⊥",
            Characteristic::Angularity => "∠",
            Characteristic::Parallelism => "∥",
            Characteristic::Concentricity => "◎",
            Characteristic::Symmetry => "⌯",
            Characteristic::CircularRunout => "↗",
            Characteristic::TotalRunout => "⇗",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Characteristic::TruePosition => "True Position",
            Characteristic::Straightness => "Straightness",
            Characteristic::Flatness => "Flatness",
            Characteristic::Circularity => "Circularity",
            Characteristic::Cylindricity => "Cylindricity",
            Characteristic::ProfileOfLine => "Profile of a Line",
            Characteristic::ProfileOfSurface => "Profile of a Surface",
            Characteristic::Perpendicularity => "Perpendicularity",
            Characteristic::Angularity => "Angularity",
            Characteristic::Parallelism => "Parallelism",
            Characteristic::Concentricity => "Concentricity",
            Characteristic::Symmetry => "Symmetry",
            Characteristic::CircularRunout => "Circular Runout",
            Characteristic::TotalRunout => "Total Runout",
        }
    }
}

/// Accepts the snake_case key, the display name (any case) or the symbol.
impl FromStr for Characteristic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = |text: &str| text.trim().to_lowercase().replace(['-', ' '], "_").replace("_a_", "_");
        let wanted = key(s);
        Characteristic::ALL
            .into_iter()
            .find(|c| c.symbol() == s.trim() || key(c.name()) == wanted)
            .ok_or_else(|| format!("unknown GD&T characteristic: {}", s))
    }
}

/// Material condition modifier; at most one applies to a tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialCondition {
    Mmc,
    Lmc,
    Rfs,
}

impl MaterialCondition {
    pub fn symbol(self) -> &'static str {
        match self {
            MaterialCondition::Mmc => "Ⓜ",
            MaterialCondition::Lmc => "Ⓛ",
            MaterialCondition::Rfs => "Ⓢ",
        }
    }
}

impl FromStr for MaterialCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "mmc" | "ⓜ" => Ok(MaterialCondition::Mmc),
            "l" | "lmc" | "ⓛ" => Ok(MaterialCondition::Lmc),
            "s" | "rfs" | "ⓢ" => Ok(MaterialCondition::Rfs),
            _ => Err(format!("unknown material condition: {}", s)),
        }
    }
}

/// Zone modifiers, written in this order when several are set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneModifiers {
    pub free_state: bool,
    pub tangent_plane: bool,
    pub projected: bool,
    pub statistical: bool,
}

impl fmt::Display for ZoneModifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.free_state, "F"),
            (self.tangent_plane, "T"),
            (self.projected, "P"),
            (self.statistical, "ST"),
        ];
        for (_, key) in flags.iter().filter(|(on, _)| *on) {
            f.write_str(key)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureControlFrame {
    pub characteristic: Characteristic,
    pub tolerance: String,
    pub diameter_zone: bool,
    pub material: Option<MaterialCondition>,
    pub zone: ZoneModifiers,
    datums: Vec<String>,
}

impl FeatureControlFrame {
    pub const MAX_DATUMS: usize = 3;
    pub const MAX_DATUM_LEN: usize = 3;

    pub fn new(characteristic: Characteristic, tolerance: impl Into<String>) -> Self {
        Self {
            characteristic,
            tolerance: tolerance.into(),
            diameter_zone: false,
            material: None,
            zone: ZoneModifiers::default(),
            datums: Vec::new(),
        }
    }

    pub fn diameter(mut self) -> Self {
        self.diameter_zone = true;
        self
    }

    pub fn material(mut self, condition: MaterialCondition) -> Self {
        self.material = Some(condition);
        self
    }

    pub fn zone(mut self, zone: ZoneModifiers) -> Self {
        self.zone = zone;
        self
    }

    /// Upper-cased and truncated; blanks and anything past the third
    /// datum are dropped.
    pub fn datums<I, S>(mut self, datums: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.datums = datums
            .into_iter()
            .map(|d| {
                d.as_ref()
                    .trim()
                    .to_uppercase()
                    .chars()
                    .take(Self::MAX_DATUM_LEN)
                    .collect::<String>()
            })
            .filter(|d| !d.is_empty())
            .take(Self::MAX_DATUMS)
            .collect();
        self
    }

    pub fn datum_refs(&self) -> &[String] {
        &self.datums
    }

    fn tolerance_cell(&self) -> String {
        let zone = self.zone.to_string();
        format!(
            "{}{}{}{}",
            if self.diameter_zone { "⌀" } else { "" },
            self.tolerance.trim(),
            self.material.map_or("", MaterialCondition::symbol),
            if zone.is_empty() {
                String::new()
            } else {
                format!("({})", zone)
            }
        )
    }
}

impl fmt::Display for FeatureControlFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cells = vec![
            self.characteristic.symbol().to_string(),
            self.tolerance_cell(),
        ];
        cells.extend(self.datums.iter().cloned());
        write!(f, "| {} |", cells.join(" | "))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionKind {
    #[default]
    Linear,
    Diameter,
    Radius,
    Square,
    Angular,
}

impl DimensionKind {
    pub fn prefix(self) -> &'static str {
        match self {
            DimensionKind::Linear => "",
            DimensionKind::Diameter => "⌀",
            DimensionKind::Radius => "R",
            DimensionKind::Square => "□",
            DimensionKind::Angular => "∠",
        }
    }
}

impl FromStr for DimensionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" | "" => Ok(DimensionKind::Linear),
            "diameter" | "dia" | "⌀" => Ok(DimensionKind::Diameter),
            "radius" | "r" => Ok(DimensionKind::Radius),
            "square" | "width" | "□" => Ok(DimensionKind::Square),
            "angular" | "angle" | "∠" => Ok(DimensionKind::Angular),
            _ => Err(format!("unknown dimension type: {}", s)),
        }
    }
}

pub const NO_UPPER_TOLERANCE: &str = "+0.000";
pub const NO_LOWER_TOLERANCE: &str = "-0.000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub kind: DimensionKind,
    pub nominal: String,
    pub upper: String,
    pub lower: String,
}

impl Dimension {
    pub fn new(kind: DimensionKind, nominal: impl Into<String>) -> Self {
        Self {
            kind,
            nominal: nominal.into(),
            upper: NO_UPPER_TOLERANCE.to_string(),
            lower: NO_LOWER_TOLERANCE.to_string(),
        }
    }

    pub fn tolerance(mut self, upper: impl Into<String>, lower: impl Into<String>) -> Self {
        self.upper = upper.into();
        self.lower = lower.into();
        self
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let upper = self.upper.trim();
        let lower = self.lower.trim();
        write!(f, "{}{}", self.kind.prefix(), self.nominal.trim())?;
        if upper == NO_UPPER_TOLERANCE && lower == NO_LOWER_TOLERANCE {
            return Ok(());
        }
        let magnitude = upper.trim_start_matches('+');
        if magnitude == lower.trim_start_matches('-') {
            write!(f, " ±{}", magnitude)
        } else {
            write!(f, "  {} / {}", upper, lower)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceProcess {
    #[default]
    Any,
    MachiningRequired,
    NoMachining,
}

impl SurfaceProcess {
    pub fn symbol(self) -> &'static str {
        match self {
            SurfaceProcess::Any => "√",
            SurfaceProcess::MachiningRequired => "√̄",
            SurfaceProcess::NoMachining => "⊙√",
        }
    }
}

impl FromStr for SurfaceProcess {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" => Ok(SurfaceProcess::Any),
            "machined" | "machining_required" | "machining-required" => {
                Ok(SurfaceProcess::MachiningRequired)
            }
            "as_cast" | "as-cast" | "no_machining" | "no-machining" => {
                Ok(SurfaceProcess::NoMachining)
            }
            _ => Err(format!("unknown surface process: {}", s)),
        }
    }
}

/// Roughness parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoughnessParam {
    #[default]
    Ra,
    Rz,
    Rmax,
    Rt,
    Rq,
    Rsk,
    Rku,
}

impl RoughnessParam {
    pub const ALL: [RoughnessParam; 7] = [
        RoughnessParam::Ra,
        RoughnessParam::Rz,
        RoughnessParam::Rmax,
        RoughnessParam::Rt,
        RoughnessParam::Rq,
        RoughnessParam::Rsk,
        RoughnessParam::Rku,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RoughnessParam::Ra => "Ra",
            RoughnessParam::Rz => "Rz",
            RoughnessParam::Rmax => "Rmax",
            RoughnessParam::Rt => "Rt",
            RoughnessParam::Rq => "Rq",
            RoughnessParam::Rsk => "Rsk",
            RoughnessParam::Rku => "Rku",
        }
    }
}

impl FromStr for RoughnessParam {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoughnessParam::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown roughness parameter: {} (expected Ra, Rz, Rmax, Rt, Rq, Rsk or Rku)", s))
    }
}

/// ISO 1302 roughness grades and their Ra values in μm
pub const ROUGHNESS_GRADES: [(&str, &str); 12] = [
    ("N1", "0.025"),
    ("N2", "0.05"),
    ("N3", "0.1"),
    ("N4", "0.2"),
    ("N5", "0.4"),
    ("N6", "0.8"),
    ("N7", "1.6"),
    ("N8", "3.2"),
    ("N9", "6.3"),
    ("N10", "12.5"),
    ("N11", "25"),
    ("N12", "50"),
];

pub fn grade_value(grade: &str) -> Option<&'static str> {
    let grade = grade.trim();
    ROUGHNESS_GRADES
        .iter()
        .find(|(g, _)| g.eq_ignore_ascii_case(grade))
        .map(|(_, v)| *v)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoughnessUnit {
    #[default]
    Micrometre,
    Microinch,
}

impl RoughnessUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            RoughnessUnit::Micrometre => "μm",
            RoughnessUnit::Microinch => "μin",
        }
    }
}

impl FromStr for RoughnessUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "um" | "μm" | "micrometre" | "micron" => Ok(RoughnessUnit::Micrometre),
            "uin" | "μin" | "microinch" => Ok(RoughnessUnit::Microinch),
            _ => Err(format!("unknown roughness unit: {}", s)),
        }
    }
}

/// Direction of the surface lay pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lay {
    Parallel,
    Perpendicular,
    Crossed,
    Multidirectional,
    Circular,
    Radial,
    Particulate,
}

impl Lay {
    pub fn symbol(self) -> &'static str {
        match self {
            Lay::Parallel => "=",
            Lay::Perpendicular => "⊥",
            Lay::Crossed => "X",
            Lay::Multidirectional => "M",
            Lay::Circular => "C",
            Lay::Radial => "R",
            Lay::Particulate => "P",
        }
    }
}

/// Accepts the symbol (letters in any case) or the name.
impl FromStr for Lay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "=" | "parallel" => Ok(Lay::Parallel),
            "⊥" | "perpendicular" => Ok(Lay::Perpendicular),
            "x" | "crossed" => Ok(Lay::Crossed),
            "m" | "multidirectional" => Ok(Lay::Multidirectional),
            "c" | "circular" => Ok(Lay::Circular),
            "r" | "radial" => Ok(Lay::Radial),
            "p" | "particulate" => Ok(Lay::Particulate),
            _ => Err(format!("unknown lay: {} (expected one of = ⊥ X M C R P)", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceFinish {
    pub process: SurfaceProcess,
    pub parameter: RoughnessParam,
    pub value: String,
    pub unit: RoughnessUnit,
    pub lay: Option<Lay>,
    pub method: Option<String>,
}

impl SurfaceFinish {
    pub fn new(parameter: RoughnessParam, value: impl Into<String>) -> Self {
        Self {
            process: SurfaceProcess::default(),
            parameter,
            value: value.into(),
            unit: RoughnessUnit::default(),
            lay: None,
            method: None,
        }
    }

    /// Ra finish taken from an N-grade; `None` for an unknown grade.
    pub fn from_grade(grade: &str) -> Option<Self> {
        grade_value(grade).map(|v| Self::new(RoughnessParam::Ra, v))
    }

    pub fn process(mut self, process: SurfaceProcess) -> Self {
        self.process = process;
        self
    }

    pub fn unit(mut self, unit: RoughnessUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn lay(mut self, lay: Lay) -> Self {
        self.lay = Some(lay);
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into()).filter(|m: &String| !m.trim().is_empty());
        self
    }
}

impl fmt::Display for SurfaceFinish {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![format!(
            "{} {} {} {}",
            self.process.symbol(),
            self.parameter.as_str(),
            self.value.trim(),
            self.unit.as_str()
        )];
        if let Some(lay) = self.lay {
            parts.push(format!("Lay: {}", lay.symbol()));
        }
        if let Some(method) = &self.method {
            parts.push(method.trim().to_string());
        }
        f.write_str(&parts.join("  |  "))
    }
}
