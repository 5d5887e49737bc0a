//! Balloon callouts for PDF drawings
//!
//! This crate holds everything except the pixels: the balloon model, the
//! mapping between screen and PDF coordinates, undo/redo, session files
//! and the exporters. Page rasterization is left to whatever front end
//! embeds it.
//!
//! Balloon positions are always stored in document space (PDF points,
//! origin at the MediaBox lower-left, Y up, page unrotated). Zoom, pan and
//! view rotation only exist in [`viewer::Viewer`].

pub mod balloon;
pub mod config;
pub mod coords;
pub mod error;
pub mod export;
pub mod gdt;
pub mod history;
pub mod pdf;
pub mod session;
pub mod sheet;
pub mod table;
pub mod viewer;

pub use balloon::{Balloon, BalloonStyle, DocPoint, Leader};
pub use config::Config;
pub use coords::{ScreenPoint, Viewport};
pub use error::BalloonError;
pub use export::{ExportFormat, OverlayOptions};
pub use history::{Edit, History};
pub use pdf::{inspect, page_count, PageGeometry};
pub use session::{sidecar_path, Session};
pub use sheet::{PlacementDefaults, Sheet};
pub use viewer::{ViewMode, Viewer, ViewerEvent};
