//! Session files: balloons and view state saved next to the PDF
//!
//! The file is plain JSON so it survives hand edits and version control.
//! Unknown optional fields fall back to defaults, which keeps older files
//! loadable.

use crate::balloon::{Balloon, DocPoint};
use crate::coords::normalize_rotation;
use crate::error::BalloonError;
use crate::sheet::Sheet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const SIDECAR_SUFFIX: &str = ".balloons.json";

fn default_gdt_font_size() -> f64 {
    16.0
}

/// Free-standing GD&T symbol placed on a page. Only carried through
/// session files; new work records GD&T text in balloon descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GdtAnnotation {
    pub symbol: String,
    pub page: u32,
    pub position: DocPoint,
    #[serde(default = "default_gdt_font_size")]
    pub font_size: f64,
    pub uid: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Path of the PDF the balloons belong to
    pub pdf: PathBuf,
    pub balloons: Vec<Balloon>,
    /// User rotation per 0-based page, in degrees
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub page_rotations: BTreeMap<u32, u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gdt: Vec<GdtAnnotation>,
}

impl Session {
    pub fn new(pdf: impl Into<PathBuf>) -> Self {
        Self {
            pdf: pdf.into(),
            ..Self::default()
        }
    }

    /// Snapshot the sheet in (page, number) order.
    pub fn from_sheet(pdf: impl Into<PathBuf>, sheet: &Sheet) -> Self {
        Self {
            pdf: pdf.into(),
            balloons: sheet.sorted().into_iter().cloned().collect(),
            ..Self::default()
        }
    }

    pub fn with_rotations(mut self, rotations: &BTreeMap<u32, u32>) -> Self {
        self.page_rotations = rotations.clone();
        self
    }

    /// Load the balloons into `sheet`, replacing its contents and history.
    pub fn apply_to(&self, sheet: &mut Sheet) {
        sheet.load(self.balloons.iter().cloned());
    }

    pub fn to_json(&self) -> Result<String, BalloonError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, BalloonError> {
        let mut session: Session = serde_json::from_str(json)?;
        session.normalize()?;
        Ok(session)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BalloonError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let session = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            balloons = session.balloons.len(),
            "loaded session"
        );
        Ok(session)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BalloonError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(
            path = %path.display(),
            balloons = self.balloons.len(),
            "saved session"
        );
        Ok(())
    }

    fn normalize(&mut self) -> Result<(), BalloonError> {
        let mut rotations = BTreeMap::new();
        for (&page, &deg) in &self.page_rotations {
            let deg = i32::try_from(deg).map_err(|_| BalloonError::InvalidRotation(i32::MAX))?;
            let r = normalize_rotation(deg)?;
            if r != 0 {
                rotations.insert(page, r);
            }
        }
        self.page_rotations = rotations;
        Ok(())
    }
}

/// `drawing.pdf` -> `drawing.balloons.json` in the same directory
pub fn sidecar_path(pdf: impl AsRef<Path>) -> PathBuf {
    let pdf = pdf.as_ref();
    let stem = pdf
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    pdf.with_file_name(format!("{}{}", stem, SIDECAR_SUFFIX))
}
