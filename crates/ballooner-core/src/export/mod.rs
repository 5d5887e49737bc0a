//! Export targets: annotated PDF, CSV list and Excel inspection sheet

pub mod csv;
pub mod pdf;
pub mod xlsx;

pub use self::csv::{export_csv, write_csv};
pub use self::pdf::{export_pdf, export_pdf_bytes, ExportSummary, OverlayOptions};
pub use self::xlsx::{export_xlsx, inspection_workbook};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_PDF_SUFFIX: &str = "_ballooned";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    /// Default output next to `pdf`. Only the PDF gets `pdf_suffix`
    /// appended to its stem, so it never collides with the source.
    pub fn default_path(self, pdf: &Path, pdf_suffix: &str) -> PathBuf {
        let stem = drawing_name(pdf);
        let name = match self {
            ExportFormat::Pdf => format!("{}{}.pdf", stem, pdf_suffix),
            other => format!("{}.{}", stem, other.extension()),
        };
        pdf.with_file_name(name)
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            _ => Err(format!("unknown export format: {}", s)),
        }
    }
}

/// File stem of the PDF, shown as the drawing name on the inspection sheet
pub fn drawing_name(pdf: &Path) -> String {
    pdf.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
