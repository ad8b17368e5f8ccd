//! The export operation: capture, paginate, encode.
//!
//! One call runs `Idle → Capturing → ExtractingLinks → Rasterizing →
//! ComputingGeometry → Compositing → Encoding → Done`, or ends in `Failed`
//! from any step. Nothing is written on failure.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capture::{Bitmap, CapturedContent, Rasterizer, SoftwareRasterizer};
use crate::compose::{compose, PageSlice};
use crate::config::{DocumentOptions, ExportConfig, ImageOptions, OutputMode};
use crate::dom::{Element, LiveDom};
use crate::encode::{
    artifact_file_name, encode_bitmap, to_markup, MarkupFlavor, PdfInfo, PdfWriter,
    DOCUMENT_EXTENSION, DOCUMENT_MIME_TYPE,
};
use crate::error::{Error, Result};
use crate::geometry::PageLayout;
use crate::links::{extract_links, reproject_all, LinkRegion, LinkScale, Reprojection};
use crate::resume::ResumeDocument;

/// Steps of one export call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportPhase {
    /// Not started
    Idle,
    /// Hosting the element off-screen
    Capturing,
    /// Measuring link regions
    ExtractingLinks,
    /// Painting the bitmap
    Rasterizing,
    /// Resolving page geometry
    ComputingGeometry,
    /// Placing pages and links
    Compositing,
    /// Serializing the artifact
    Encoding,
    /// Finished successfully
    Done,
    /// Aborted
    Failed,
}

/// Statistics collected during an export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStats {
    /// Phases entered, in order
    pub phases: Vec<ExportPhase>,
    /// Captured bitmap width
    pub pixel_width: u32,
    /// Captured bitmap height
    pub pixel_height: u32,
    /// Output pages (1 for image and markup exports)
    pub page_count: u32,
    /// Links found in the captured element
    pub links_extracted: u32,
    /// Links attached to pages
    pub links_placed: u32,
    /// Links dropped for crossing a page boundary
    pub links_dropped: u32,
    /// Links the output medium rejected
    pub links_rejected: u32,
    /// Per-page placements (paginated exports only)
    pub pages: Vec<PageSlice>,
}

impl ExportStats {
    fn enter(&mut self, phase: ExportPhase) {
        log::debug!("Export phase: {:?}", phase);
        self.phases.push(phase);
    }

    /// The phase the export ended in.
    pub fn last_phase(&self) -> ExportPhase {
        self.phases.last().copied().unwrap_or(ExportPhase::Idle)
    }
}

/// A finished export, ready to hand to the user.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Download file name
    pub file_name: String,
    /// MIME type
    pub mime_type: &'static str,
    /// File content
    pub bytes: Vec<u8>,
    /// Export statistics
    pub stats: ExportStats,
}

impl Artifact {
    /// Content length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the artifact is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the artifact into `dir` under its file name.
    ///
    /// The file appears atomically; a failed write leaves nothing behind.
    pub fn save_in<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        use std::io::Write;

        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let target = dir.join(&self.file_name);

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&self.bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target)?;

        log::info!("Saved {} ({} bytes)", target.display(), self.bytes.len());
        Ok(target)
    }
}

/// Resets the in-flight flag when an export ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::ExportInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs exports of a rendered layout.
///
/// # Example
///
/// ```no_run
/// use reslice::{ExportConfig, Exporter, LiveDom};
///
/// let mut dom = LiveDom::load("layout.json")?;
/// let artifact = Exporter::new()
///     .with_resume_name("Ada Lovelace")
///     .export(&mut dom, "resume-preview", &ExportConfig::default())?;
/// artifact.save_in("out")?;
/// # Ok::<(), reslice::Error>(())
/// ```
pub struct Exporter {
    rasterizer: Arc<dyn Rasterizer>,
    resume_name: Option<String>,
    in_flight: AtomicBool,
}

impl Exporter {
    /// Create an exporter using the software rasterizer.
    pub fn new() -> Self {
        Self {
            rasterizer: Arc::new(SoftwareRasterizer::new()),
            resume_name: None,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Use a different rasterizer.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Set the resume name used for the artifact file name.
    pub fn with_resume_name(mut self, name: impl Into<String>) -> Self {
        self.resume_name = Some(name.into());
        self
    }

    /// Whether an export is currently running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Capture `element_id` and export it per `config`.
    pub fn export(
        &self,
        dom: &mut LiveDom,
        element_id: &str,
        config: &ExportConfig,
    ) -> Result<Artifact> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        let mut stats = ExportStats::default();
        stats.enter(ExportPhase::Idle);

        let result = self.run(dom, element_id, config, &mut stats);
        self.finish(result, stats)
    }

    /// Render the resume model as HTML or Word markup.
    pub fn export_markup(
        &self,
        resume: &ResumeDocument,
        flavor: MarkupFlavor,
    ) -> Result<Artifact> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        let mut stats = ExportStats::default();
        stats.enter(ExportPhase::Idle);
        stats.enter(ExportPhase::Encoding);

        let bytes = to_markup(resume, flavor).into_bytes();
        stats.page_count = 1;
        stats.enter(ExportPhase::Done);

        let name = self
            .resume_name
            .as_deref()
            .or(Some(resume.personal.full_name.as_str()));
        Ok(Artifact {
            file_name: artifact_file_name(name, flavor.extension()),
            mime_type: flavor.mime_type(),
            bytes,
            stats,
        })
    }

    fn finish(
        &self,
        result: Result<(Vec<u8>, &'static str, String)>,
        mut stats: ExportStats,
    ) -> Result<Artifact> {
        match result {
            Ok((bytes, mime_type, extension)) => {
                stats.enter(ExportPhase::Done);
                Ok(Artifact {
                    file_name: artifact_file_name(self.resume_name.as_deref(), &extension),
                    mime_type,
                    bytes,
                    stats,
                })
            }
            Err(e) => {
                stats.enter(ExportPhase::Failed);
                log::warn!("Export failed after {:?}: {}", stats.phases, e);
                Err(e)
            }
        }
    }

    fn run(
        &self,
        dom: &mut LiveDom,
        element_id: &str,
        config: &ExportConfig,
        stats: &mut ExportStats,
    ) -> Result<(Vec<u8>, &'static str, String)> {
        config.validate()?;
        let element = dom.find(element_id)?.clone();

        let delay = config.capture.settle_delay();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let captured = {
            stats.enter(ExportPhase::Capturing);
            let container = dom.mount_offscreen(&element);
            let origin = container.origin().map(str::to_string);
            self.capture(&container, origin.as_deref(), config, stats)?
        };

        self.encode(captured, config, stats)
    }

    /// Measure links and rasterize the hosted clone.
    fn capture(
        &self,
        element: &Element,
        origin: Option<&str>,
        config: &ExportConfig,
        stats: &mut ExportStats,
    ) -> Result<CapturedContent> {
        let bounds = element.bounding_rect();

        stats.enter(ExportPhase::ExtractingLinks);
        let links = if config.links_enabled() {
            extract_links(element)
        } else {
            Vec::new()
        };
        stats.links_extracted = links.len() as u32;

        stats.enter(ExportPhase::Rasterizing);
        log::debug!("Rasterizing with {} rasterizer", self.rasterizer.name());
        let bitmap = self.rasterizer.rasterize(element, origin, &config.capture)?;

        captured_content(bitmap, bounds.width, bounds.height, config, links, stats)
    }

    fn encode(
        &self,
        captured: CapturedContent,
        config: &ExportConfig,
        stats: &mut ExportStats,
    ) -> Result<(Vec<u8>, &'static str, String)> {
        let background = config.capture.background_rgba()?;
        match &config.mode {
            OutputMode::PaginatedDocument(options) => {
                let bytes = encode_document(&captured, options, background, stats)?;
                Ok((bytes, DOCUMENT_MIME_TYPE, DOCUMENT_EXTENSION.to_string()))
            }
            OutputMode::SingleImage(ImageOptions { encoding }) => {
                stats.enter(ExportPhase::Encoding);
                stats.page_count = 1;
                let bytes = encode_bitmap(&captured.bitmap, encoding, background)?;
                Ok((bytes, encoding.mime_type(), encoding.extension().to_string()))
            }
        }
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

fn captured_content(
    bitmap: Bitmap,
    element_width_px: f64,
    element_height_px: f64,
    config: &ExportConfig,
    links: Vec<LinkRegion>,
    stats: &mut ExportStats,
) -> Result<CapturedContent> {
    let (width, height) = (bitmap.width(), bitmap.height());
    if width == 0 || height == 0 {
        return Err(Error::ZeroDimensionCapture { width, height });
    }
    stats.pixel_width = width;
    stats.pixel_height = height;

    Ok(CapturedContent {
        bitmap,
        element_width_px,
        element_height_px,
        capture_scale: config.capture.capture_scale,
        links,
    })
}

/// Paginate `captured` into a PDF.
fn encode_document(
    captured: &CapturedContent,
    options: &DocumentOptions,
    background: [u8; 4],
    stats: &mut ExportStats,
) -> Result<Vec<u8>> {
    stats.enter(ExportPhase::ComputingGeometry);
    let layout = PageLayout::compute(
        &options.format()?,
        options.orientation,
        options.margins,
        captured.pixel_width(),
        captured.pixel_height(),
    )?;
    stats.page_count = layout.page_count;

    let links = if options.links_enabled {
        let scale = LinkScale::resolve(
            layout.image,
            (captured.element_width_px, captured.element_height_px),
            (captured.pixel_width(), captured.pixel_height()),
            captured.capture_scale,
        );
        reproject_all(&captured.links, scale, &layout)
    } else {
        Reprojection::default()
    };
    stats.links_dropped = links.dropped.len() as u32;

    stats.enter(ExportPhase::Compositing);
    let mut writer = PdfWriter::new(layout, &captured.bitmap, &options.image_encoding, background)?;
    let composition = compose(&layout, &links, &mut writer)?;
    stats.links_placed = composition.link_count() as u32;
    stats.links_rejected = composition.rejected_links;
    stats.pages = composition.pages;

    stats.enter(ExportPhase::Encoding);
    writer.finish(&PdfInfo {
        title: options.title.clone(),
        creation_date: options.creation_date,
    })
}

#[cfg(feature = "async")]
impl Exporter {
    /// Async variant of [`Exporter::export`].
    ///
    /// The settling delay is awaited instead of slept, and painting runs on
    /// the blocking pool.
    pub async fn export_async(
        &self,
        dom: &mut LiveDom,
        element_id: &str,
        config: &ExportConfig,
    ) -> Result<Artifact> {
        let _guard = InFlight::acquire(&self.in_flight)?;
        let mut stats = ExportStats::default();
        stats.enter(ExportPhase::Idle);

        let result = self.run_async(dom, element_id, config, &mut stats).await;
        self.finish(result, stats)
    }

    async fn run_async(
        &self,
        dom: &mut LiveDom,
        element_id: &str,
        config: &ExportConfig,
        stats: &mut ExportStats,
    ) -> Result<(Vec<u8>, &'static str, String)> {
        config.validate()?;
        let element = dom.find(element_id)?.clone();
        tokio::time::sleep(config.capture.settle_delay()).await;

        stats.enter(ExportPhase::Capturing);
        // The container stays mounted until the blocking paint resolves.
        let container = dom.mount_offscreen(&element);
        let origin = container.origin().map(str::to_string);
        let bounds = container.bounding_rect();

        stats.enter(ExportPhase::ExtractingLinks);
        let links = if config.links_enabled() {
            extract_links(&container)
        } else {
            Vec::new()
        };
        stats.links_extracted = links.len() as u32;

        stats.enter(ExportPhase::Rasterizing);
        let rasterizer = Arc::clone(&self.rasterizer);
        let capture = config.capture.clone();
        let hosted = container.element().clone();
        let painted = tokio::task::spawn_blocking(move || {
            rasterizer.rasterize(&hosted, origin.as_deref(), &capture)
        })
        .await;
        drop(container);

        let bitmap = painted
            .map_err(|e| Error::Encoding(format!("rasterizer task failed: {}", e)))??;
        let captured =
            captured_content(bitmap, bounds.width, bounds.height, config, links, stats)?;
        self.encode(captured, config, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CaptureOptions, ImageEncoding};
    use crate::dom::Rect;
    use crate::geometry::Margins;

    fn dom() -> LiveDom {
        LiveDom::new(
            Element::new("body", Rect::new(0.0, 0.0, 1000.0, 3000.0)).with_child(
                Element::new("div", Rect::new(100.0, 0.0, 400.0, 1000.0))
                    .with_id("resume-preview")
                    .with_background("#fafafa")
                    .with_child(Element::anchor(
                        "https://example.com",
                        Rect::new(120.0, 20.0, 100.0, 10.0),
                    )),
            ),
        )
    }

    fn quick(config: ExportConfig) -> ExportConfig {
        config.with_capture(CaptureOptions::new().with_scale(1.0).with_settle_delay(
            std::time::Duration::ZERO,
        ))
    }

    #[test]
    fn test_phase_sequence_for_document() {
        let mut dom = dom();
        let artifact = Exporter::new()
            .export(&mut dom, "resume-preview", &quick(ExportConfig::default()))
            .unwrap();
        assert_eq!(
            artifact.stats.phases,
            vec![
                ExportPhase::Idle,
                ExportPhase::Capturing,
                ExportPhase::ExtractingLinks,
                ExportPhase::Rasterizing,
                ExportPhase::ComputingGeometry,
                ExportPhase::Compositing,
                ExportPhase::Encoding,
                ExportPhase::Done,
            ]
        );
        assert_eq!(artifact.file_name, "resume.pdf");
        assert_eq!(artifact.mime_type, "application/pdf");
    }

    #[test]
    fn test_failure_ends_in_failed_phase_and_releases_guard() {
        let mut dom = dom();
        let exporter = Exporter::new();
        let result = exporter.export(&mut dom, "nope", &quick(ExportConfig::default()));
        assert!(matches!(result, Err(Error::ElementNotFound(_))));
        assert!(!exporter.is_busy());
    }

    #[test]
    fn test_in_flight_guard_rejects_overlap() {
        let exporter = Exporter::new();
        let _held = InFlight::acquire(&exporter.in_flight).unwrap();
        let mut dom = dom();
        let result = exporter.export(&mut dom, "resume-preview", &ExportConfig::default());
        assert!(matches!(result, Err(Error::ExportInProgress)));
    }

    #[test]
    fn test_invalid_configuration_fails_before_capture() {
        let mut dom = dom();
        let config = quick(ExportConfig::document(
            DocumentOptions::new().with_margins(Margins::uniform(200.0)),
        ));
        let result = Exporter::new().export(&mut dom, "resume-preview", &config);
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
        assert_eq!(dom.offscreen_count(), 0);
    }

    #[test]
    fn test_image_export_names_by_encoding() {
        let mut dom = dom();
        let artifact = Exporter::new()
            .with_resume_name("Ada")
            .export(
                &mut dom,
                "resume-preview",
                &quick(ExportConfig::image(ImageEncoding::Png)),
            )
            .unwrap();
        assert_eq!(artifact.file_name, "Ada.png");
        assert_eq!(artifact.stats.links_extracted, 0);
        assert!(!artifact.stats.phases.contains(&ExportPhase::Compositing));
    }

    #[test]
    fn test_markup_export_uses_resume_name() {
        let mut resume = ResumeDocument::default();
        resume.personal.full_name = "Grace Hopper".into();
        let artifact = Exporter::new()
            .export_markup(&resume, MarkupFlavor::Word)
            .unwrap();
        assert_eq!(artifact.file_name, "Grace Hopper.doc");
        assert_eq!(artifact.mime_type, "application/msword");
    }
}
