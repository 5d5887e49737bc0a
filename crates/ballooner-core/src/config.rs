//! TOML configuration for placement defaults, view behaviour and export styling
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration.

use crate::balloon::BalloonStyle;
use crate::coords::{Viewport, BASE_DPI};
use crate::export::pdf::OverlayOptions;
use crate::export::DEFAULT_PDF_SUFFIX;
use crate::sheet::PlacementDefaults;
use crate::viewer::{Viewer, BALLOON_VISUAL_RADIUS_PX};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub placement: PlacementConfig,
    pub view: ViewConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub style: BalloonStyle,
    /// Circle diameter in points
    pub diameter: f64,
    /// Label size in points; 0 picks one from the diameter
    pub font_size: f64,
    /// Circle centre offset from the clicked point, in points
    pub leader_offset: [f64; 2],
    /// Maximum undo depth; 0 keeps everything
    pub undo_limit: usize,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        let defaults = PlacementDefaults::default();
        Self {
            style: defaults.style,
            diameter: defaults.diameter,
            font_size: defaults.font_size,
            leader_offset: [defaults.offset.0, defaults.offset.1],
            undo_limit: 0,
        }
    }
}

impl PlacementConfig {
    pub fn defaults(&self) -> PlacementDefaults {
        PlacementDefaults {
            style: self.style,
            diameter: self.diameter,
            font_size: self.font_size,
            offset: (self.leader_offset[0], self.leader_offset[1]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub base_dpi: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
    pub wheel_step: f64,
    pub balloon_radius_px: f64,
    pub viewport: [f64; 2],
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            base_dpi: BASE_DPI,
            min_zoom: 0.05,
            max_zoom: 20.0,
            zoom_step: 1.25,
            wheel_step: 1.15,
            balloon_radius_px: BALLOON_VISUAL_RADIUS_PX,
            viewport: [1280.0, 900.0],
        }
    }
}

impl ViewConfig {
    pub fn viewer(&self) -> Viewer {
        let viewport = Viewport::new(self.viewport[0], self.viewport[1])
            .with_limits(self.min_zoom, self.max_zoom)
            .with_steps(self.zoom_step, self.wheel_step);
        Viewer::new(viewport).with_balloon_radius(self.balloon_radius_px)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub line_width: f64,
    pub arrow_size: f64,
    /// One of the standard 14 font names
    pub font: String,
    pub compress: bool,
    /// Appended to the PDF stem for the default output name
    pub suffix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        let overlay = OverlayOptions::default();
        Self {
            line_width: overlay.line_width,
            arrow_size: overlay.arrow_size,
            font: overlay.font,
            compress: overlay.compress,
            suffix: DEFAULT_PDF_SUFFIX.to_string(),
        }
    }
}

impl ExportConfig {
    pub fn overlay(&self) -> OverlayOptions {
        OverlayOptions {
            line_width: self.line_width,
            arrow_size: self.arrow_size,
            font: self.font.clone(),
            compress: self.compress,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Every number must be finite; TOML accepts `nan` and `inf`.
    pub fn validate(&self) -> anyhow::Result<()> {
        let placement = &self.placement;
        positive("placement.diameter", placement.diameter)?;
        anyhow::ensure!(
            placement.font_size.is_finite() && placement.font_size >= 0.0,
            "placement.font_size must not be negative, got {}",
            placement.font_size
        );
        anyhow::ensure!(
            placement.leader_offset.iter().all(|v| v.is_finite()),
            "placement.leader_offset must be finite, got {:?}",
            placement.leader_offset
        );

        let view = &self.view;
        positive("view.base_dpi", view.base_dpi)?;
        positive("view.min_zoom", view.min_zoom)?;
        positive("view.max_zoom", view.max_zoom)?;
        anyhow::ensure!(
            view.min_zoom <= view.max_zoom,
            "view.min_zoom ({}) must not exceed view.max_zoom ({})",
            view.min_zoom,
            view.max_zoom
        );
        for (name, step) in [("view.zoom_step", view.zoom_step), ("view.wheel_step", view.wheel_step)] {
            anyhow::ensure!(
                step.is_finite() && step > 1.0,
                "{} must be greater than 1, got {}",
                name,
                step
            );
        }
        positive("view.balloon_radius_px", view.balloon_radius_px)?;
        positive("view.viewport width", view.viewport[0])?;
        positive("view.viewport height", view.viewport[1])?;

        positive("export.line_width", self.export.line_width)?;
        positive("export.arrow_size", self.export.arrow_size)?;
        anyhow::ensure!(!self.export.font.trim().is_empty(), "export.font must not be empty");
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> anyhow::Result<()> {
    anyhow::ensure!(
        value.is_finite() && value > 0.0,
        "{} must be a positive number, got {}",
        name,
        value
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.placement.diameter, 36.0);
        assert_eq!(config.view.base_dpi, 150.0);
        assert_eq!(config.export.suffix, "_ballooned");
        assert_eq!(config.export.suffix, DEFAULT_PDF_SUFFIX);
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [placement]
            style = "red"
            diameter = 24.0
            leader_offset = [30.0, -30.0]

            [export]
            compress = false
        "#;
        let config = Config::from_str(toml).unwrap();
        let defaults = config.placement.defaults();
        assert_eq!(defaults.style, BalloonStyle::Red);
        assert_eq!(defaults.diameter, 24.0);
        assert_eq!(defaults.offset, (30.0, -30.0));
        assert!(!config.export.overlay().compress);
        assert_eq!(config.export.line_width, 1.5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_str("[placement]\ndiameter = 0.0").is_err());
        assert!(Config::from_str("[view]\nmin_zoom = 5.0\nmax_zoom = 1.0").is_err());
        assert!(Config::from_str("[placement]\nstyle = \"dotted\"").is_err());
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        for toml in [
            "[view]\nmax_zoom = nan",
            "[view]\nmin_zoom = nan",
            "[view]\nmax_zoom = inf",
            "[view]\nwheel_step = nan",
            "[view]\nviewport = [nan, 900.0]",
            "[view]\nbase_dpi = -inf",
            "[placement]\ndiameter = nan",
            "[placement]\nfont_size = nan",
            "[placement]\nleader_offset = [inf, 0.0]",
            "[export]\nline_width = nan",
            "[export]\narrow_size = 0.0",
        ] {
            let err = Config::from_str(toml).unwrap_err();
            assert!(format!("{:#}", err).contains("must"), "{}: {:#}", toml, err);
        }

        // A view config that skipped validation still builds a usable viewer
        let view = ViewConfig {
            max_zoom: f64::NAN,
            ..ViewConfig::default()
        };
        let mut viewer = view.viewer();
        assert_eq!(viewer.viewport().zoom(), 1.0);
        assert_eq!(viewer.viewport_mut().set_zoom(100.0), 20.0);
    }

    #[test]
    fn test_view_config_builds_viewer() {
        let config = Config::from_str("[view]\nmax_zoom = 4.0").unwrap();
        let mut viewer = config.view.viewer();
        assert_eq!(viewer.viewport_mut().set_zoom(10.0), 4.0);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ballooner.toml");
        std::fs::write(&path, "[placement]\nfont_size = 9.0\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.placement.font_size, 9.0);

        let missing = Config::from_file(dir.path().join("nope.toml")).unwrap_err();
        assert!(missing.to_string().contains("Failed to read config file"));
    }
}
