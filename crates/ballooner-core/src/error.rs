use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum BalloonError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("No balloon with id {0}")]
    UnknownBalloon(Uuid),

    #[error("Page {page} is out of range (document has {count} pages)")]
    InvalidPage { page: u32, count: u32 },

    #[error("Rotation must be a multiple of 90 degrees, got {0}")]
    InvalidRotation(i32),

    #[error("Cannot overwrite the original PDF ({0}). Choose a different output path.")]
    OverwriteSource(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl From<lopdf::Error> for BalloonError {
    fn from(e: lopdf::Error) -> Self {
        BalloonError::ParseError(e.to_string())
    }
}

impl From<serde_json::Error> for BalloonError {
    fn from(e: serde_json::Error) -> Self {
        BalloonError::SerializationError(e.to_string())
    }
}
