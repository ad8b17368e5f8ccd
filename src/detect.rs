//! Artifact format detection from magic bytes.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Kind of an exported artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Paginated PDF document
    Pdf,
    /// PNG image
    Png,
    /// JPEG image
    Jpeg,
    /// HTML or Word-compatible markup
    Markup,
}

impl ArtifactKind {
    /// Conventional extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Pdf => "pdf",
            ArtifactKind::Png => "png",
            ArtifactKind::Jpeg => "jpg",
            ArtifactKind::Markup => "html",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArtifactKind::Pdf => "PDF document",
            ArtifactKind::Png => "PNG image",
            ArtifactKind::Jpeg => "JPEG image",
            ArtifactKind::Markup => "HTML markup",
        };
        f.write_str(name)
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";
const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Detect the artifact kind from its leading bytes.
///
/// # Arguments
/// * `data` - Byte slice containing at least the first 16 bytes of the file
///
/// # Returns
/// * `Ok(ArtifactKind)` for a recognized header
/// * `Err(Error::UnknownFormat)` otherwise
pub fn detect_kind_from_bytes(data: &[u8]) -> Result<ArtifactKind> {
    if data.starts_with(PDF_MAGIC) {
        return Ok(ArtifactKind::Pdf);
    }
    if data.starts_with(PNG_MAGIC) {
        return Ok(ArtifactKind::Png);
    }
    if data.starts_with(JPEG_MAGIC) {
        return Ok(ArtifactKind::Jpeg);
    }

    let head = String::from_utf8_lossy(&data[..data.len().min(64)]).to_ascii_lowercase();
    let head = head.trim_start();
    if head.starts_with("<!doctype html") || head.starts_with("<html") {
        return Ok(ArtifactKind::Markup);
    }

    Err(Error::UnknownFormat)
}

/// Detect the artifact kind of a file.
pub fn detect_kind_from_path<P: AsRef<Path>>(path: P) -> Result<ArtifactKind> {
    let file = File::open(path)?;
    let mut header = Vec::with_capacity(64);
    BufReader::new(file).take(64).read_to_end(&mut header)?;
    detect_kind_from_bytes(&header)
}
