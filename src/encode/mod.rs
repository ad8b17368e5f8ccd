//! Output encoders and artifact naming.

mod markup;
mod pdf;
mod raster;

pub use markup::{escape_html, to_markup, MarkupFlavor};
pub use pdf::{PdfInfo, PdfWriter};
pub use raster::{encode_bitmap, jpeg_quality};

use regex::Regex;
use std::sync::OnceLock;

/// Base name used when the resume has no usable name.
pub const DEFAULT_FILE_STEM: &str = "resume";

/// Extension of paginated document artifacts.
pub const DOCUMENT_EXTENSION: &str = "pdf";

/// MIME type of paginated document artifacts.
pub const DOCUMENT_MIME_TYPE: &str = "application/pdf";

fn hostile_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[\\/:*?"<>|\x00-\x1f]+"#).expect("valid regex"))
}

/// `<name or "resume">.<extension>`, safe to use as a file name.
pub fn artifact_file_name(name: Option<&str>, extension: &str) -> String {
    let stem = name
        .map(|n| hostile_chars().replace_all(n.trim(), "_").into_owned())
        .map(|n| n.trim_matches(|c: char| c == '.' || c.is_whitespace()).to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_STEM.to_string());
    format!("{}.{}", stem, extension)
}
