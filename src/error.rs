//! Error types for reslice library.

use std::io;
use thiserror::Error;

/// Result type alias for reslice operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while capturing and exporting a document.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed layout snapshot, resume, or preference JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The capture root does not exist in the current layout tree.
    #[error("Element not found: #{0}")]
    ElementNotFound(String),

    /// The rasterizer produced an empty bitmap (hidden or collapsed element).
    #[error(
        "Captured element has no visible area ({width}x{height} px); make sure the preview is shown before exporting"
    )]
    ZeroDimensionCapture {
        /// Bitmap width in pixels
        width: u32,
        /// Bitmap height in pixels
        height: u32,
    },

    /// Geometry or option values that cannot produce a page.
    #[error("Invalid export configuration: {0}")]
    InvalidConfiguration(String),

    /// The output medium rejected a single link annotation.
    #[error("Link annotation could not be placed: {0}")]
    AnnotationPlacement(String),

    /// The final artifact could not be serialized.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A cross-origin image was drawn without CORS approval, so the bitmap
    /// may not be read back.
    #[error("Security error: the canvas has been tainted by cross-origin data")]
    TaintedCanvas,

    /// Another export is already running on this exporter.
    #[error("An export is already in progress")]
    ExportInProgress,

    /// The artifact bytes are not a recognized export format.
    #[error("Unknown artifact format")]
    UnknownFormat,
}

impl Error {
    /// Whether this error aborts an export.
    ///
    /// Annotation placement failures are skipped per link and never
    /// surface from an export call.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::AnnotationPlacement(_))
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::Encoding(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::Io(e),
            _ => Error::Encoding(err.to_string()),
        }
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io(err.error)
    }
}
