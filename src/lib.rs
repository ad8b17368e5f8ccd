//! # reslice
//!
//! Capture-and-paginate export for rendered resumes.
//!
//! This library takes a laid-out document (a rendered resume template),
//! rasterizes it, slices it into fixed-size pages and re-projects its
//! clickable links onto the right page. It also exports the flat image and
//! a semantic HTML/Word rendition of the resume data.
//!
//! ## Quick Start
//!
//! ```no_run
//! use reslice::{export_pdf, DocumentOptions, LiveDom, Margins};
//!
//! fn main() -> reslice::Result<()> {
//!     let mut dom = LiveDom::load("layout.json")?;
//!
//!     let options = DocumentOptions::new()
//!         .with_page_format("a4")
//!         .with_margins(Margins::uniform(7.0));
//!     let artifact = export_pdf(&mut dom, "resume-preview", options)?;
//!     artifact.save_in("exports")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Pagination**: content width fills the page, height spans as many pages as needed
//! - **Clickable links**: anchors become PDF link annotations on the page they land on
//! - **Resolution independence**: link placement never depends on the capture scale
//! - **Multiple outputs**: PDF, PNG/JPEG, HTML and Word-compatible markup
//! - **Parallel painting**: the software rasterizer paints rows with Rayon

pub mod capture;
pub mod compose;
pub mod config;
pub mod detect;
pub mod dom;
pub mod encode;
pub mod error;
pub mod export;
pub mod geometry;
pub mod links;
pub mod resume;

// Re-export commonly used types
pub use capture::{Bitmap, CapturedContent, Rasterizer, SoftwareRasterizer};
pub use compose::{ImagePlacement, PageSink, PageSlice};
pub use config::{
    CaptureOptions, CrossOriginPolicy, DocumentOptions, ExportConfig, ImageEncoding,
    ImageOptions, OutputMode,
};
pub use detect::{detect_kind_from_bytes, detect_kind_from_path, ArtifactKind};
pub use dom::{Element, LiveDom, Rect};
pub use encode::MarkupFlavor;
pub use error::{Error, Result};
pub use export::{Artifact, ExportPhase, ExportStats, Exporter};
pub use geometry::{Margins, Orientation, PageFormat, PageLayout, SizeMm};
pub use links::{LinkRegion, ProjectedLink};
pub use resume::ResumeDocument;

/// Export an element as a paginated PDF with default capture options.
///
/// # Arguments
///
/// * `dom` - The live layout tree
/// * `element_id` - Id of the element to capture
/// * `options` - Page and link options
///
/// # Example
///
/// ```no_run
/// use reslice::{export_pdf, DocumentOptions, LiveDom};
///
/// let mut dom = LiveDom::load("layout.json").unwrap();
/// let artifact = export_pdf(&mut dom, "resume-preview", DocumentOptions::new()).unwrap();
/// println!("{} pages", artifact.stats.page_count);
/// ```
pub fn export_pdf(
    dom: &mut LiveDom,
    element_id: &str,
    options: DocumentOptions,
) -> Result<Artifact> {
    Exporter::new().export(dom, element_id, &ExportConfig::document(options))
}

/// Export an element as a single PNG or JPEG image.
///
/// # Example
///
/// ```no_run
/// use reslice::{export_image, ImageEncoding, LiveDom};
///
/// let mut dom = LiveDom::load("layout.json").unwrap();
/// let artifact = export_image(&mut dom, "resume-preview", ImageEncoding::Png).unwrap();
/// std::fs::write(&artifact.file_name, &artifact.bytes).unwrap();
/// ```
pub fn export_image(
    dom: &mut LiveDom,
    element_id: &str,
    encoding: ImageEncoding,
) -> Result<Artifact> {
    Exporter::new().export(dom, element_id, &ExportConfig::image(encoding))
}

/// Render resume data as HTML or Word-compatible markup.
///
/// # Example
///
/// ```no_run
/// use reslice::{export_markup, MarkupFlavor, ResumeDocument};
///
/// let resume = ResumeDocument::load("resume.json").unwrap();
/// let artifact = export_markup(&resume, MarkupFlavor::Word).unwrap();
/// artifact.save_in(".").unwrap();
/// ```
pub fn export_markup(resume: &ResumeDocument, flavor: MarkupFlavor) -> Result<Artifact> {
    Exporter::new().export_markup(resume, flavor)
}
