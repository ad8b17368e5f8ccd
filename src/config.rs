//! Export configuration.
//!
//! Options shared by every export live in [`CaptureOptions`]. What only
//! makes sense for one output mode lives in that mode's variant of
//! [`OutputMode`], so an image export never carries page settings it would
//! ignore.

use crate::error::{Error, Result};
use crate::geometry::{Margins, Orientation, PageFormat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest accepted capture scale.
pub const MAX_CAPTURE_SCALE: f32 = 8.0;

/// How the rasterizer treats images served from another origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CrossOriginPolicy {
    /// Load cross-origin images without a CORS request
    #[default]
    NoCors,
    /// Request cross-origin images anonymously with CORS
    Anonymous,
}

/// Encoding of the captured bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ImageEncoding {
    /// Lossy JPEG with a quality fraction in [0, 1]
    Jpeg {
        /// Quality fraction
        quality: f32,
    },
    /// Lossless PNG
    Png,
}

impl ImageEncoding {
    /// JPEG at the given quality fraction.
    pub fn jpeg(quality: f32) -> Self {
        ImageEncoding::Jpeg { quality }
    }

    /// File extension for standalone images.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg { .. } => "jpg",
            ImageEncoding::Png => "png",
        }
    }

    /// MIME type for standalone images.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg { .. } => "image/jpeg",
            ImageEncoding::Png => "image/png",
        }
    }

    fn validate(&self) -> Result<()> {
        if let ImageEncoding::Jpeg { quality } = self {
            if !(0.0..=1.0).contains(quality) {
                return Err(Error::InvalidConfiguration(format!(
                    "JPEG quality must be within [0, 1], got {}",
                    quality
                )));
            }
        }
        Ok(())
    }
}

impl Default for ImageEncoding {
    fn default() -> Self {
        ImageEncoding::Jpeg { quality: 0.95 }
    }
}

/// Options every capture uses regardless of output mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureOptions {
    /// Pixel density multiplier applied by the rasterizer (>= 1)
    pub capture_scale: f32,

    /// Fill color behind transparent regions (CSS color)
    pub background_color: String,

    /// Cross-origin image policy
    pub cross_origin_policy: CrossOriginPolicy,

    /// Draw cross-origin images without CORS approval (taints the bitmap)
    pub allow_tainted_canvas: bool,

    /// Upper bound for loading a single embedded image, in milliseconds
    pub image_timeout_ms: u64,

    /// Delay before measuring, letting layout settle, in milliseconds
    pub settle_delay_ms: u64,
}

impl CaptureOptions {
    /// Create new capture options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the capture scale.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.capture_scale = scale;
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background_color = color.into();
        self
    }

    /// Set the cross-origin policy.
    pub fn with_cross_origin(mut self, policy: CrossOriginPolicy) -> Self {
        self.cross_origin_policy = policy;
        self
    }

    /// Allow or forbid tainting the bitmap.
    pub fn with_tainted_canvas(mut self, allow: bool) -> Self {
        self.allow_tainted_canvas = allow;
        self
    }

    /// Set the image load timeout.
    pub fn with_image_timeout(mut self, timeout: Duration) -> Self {
        self.image_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the settling delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Image load timeout.
    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }

    /// Settling delay.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Parsed background color as RGBA bytes.
    pub fn background_rgba(&self) -> Result<[u8; 4]> {
        parse_color(&self.background_color)
    }

    /// Check the capture options.
    pub fn validate(&self) -> Result<()> {
        if !(1.0..=MAX_CAPTURE_SCALE).contains(&self.capture_scale) {
            return Err(Error::InvalidConfiguration(format!(
                "capture scale must be between 1 and {}, got {}",
                MAX_CAPTURE_SCALE, self.capture_scale
            )));
        }
        self.background_rgba()?;
        Ok(())
    }
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            capture_scale: 2.0,
            background_color: "#ffffff".to_string(),
            cross_origin_policy: CrossOriginPolicy::NoCors,
            allow_tainted_canvas: false,
            image_timeout_ms: 15_000,
            settle_delay_ms: 100,
        }
    }
}

/// Parse a CSS color string into RGBA bytes.
pub fn parse_color(color: &str) -> Result<[u8; 4]> {
    csscolorparser::parse(color)
        .map(|c| c.to_rgba8())
        .map_err(|e| Error::InvalidConfiguration(format!("invalid color {:?}: {}", color, e)))
}

/// Options for paginated document output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentOptions {
    /// Page format name from the registry
    pub page_format: String,

    /// Page orientation
    pub orientation: Orientation,

    /// Page margins in millimeters
    pub margins: Margins,

    /// Encoding of the embedded page image
    pub image_encoding: ImageEncoding,

    /// Attach clickable link annotations
    pub links_enabled: bool,

    /// Document title written to the metadata
    pub title: Option<String>,

    /// Creation date written to the metadata; omitted when unset
    pub creation_date: Option<DateTime<Utc>>,
}

impl DocumentOptions {
    /// Create new document options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page format by name.
    pub fn with_page_format(mut self, name: impl Into<String>) -> Self {
        self.page_format = name.into();
        self
    }

    /// Set the orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set all margins.
    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    /// Set the embedded image encoding.
    pub fn with_image_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.image_encoding = encoding;
        self
    }

    /// Enable or disable link annotations.
    pub fn with_links(mut self, enabled: bool) -> Self {
        self.links_enabled = enabled;
        self
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the creation date.
    pub fn with_creation_date(mut self, date: DateTime<Utc>) -> Self {
        self.creation_date = Some(date);
        self
    }

    /// Resolve the page format.
    pub fn format(&self) -> Result<PageFormat> {
        PageFormat::by_name(&self.page_format).ok_or_else(|| {
            Error::InvalidConfiguration(format!("unknown page format: {}", self.page_format))
        })
    }

    /// Check the document options, including that margins leave room for content.
    pub fn validate(&self) -> Result<()> {
        let format = self.format()?;
        self.margins.validate()?;
        let page = crate::geometry::effective_page_size(&format, self.orientation);
        crate::geometry::content_area(page, &self.margins)?;
        self.image_encoding.validate()
    }
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            page_format: PageFormat::DEFAULT.name.to_string(),
            orientation: Orientation::Portrait,
            margins: Margins::default(),
            image_encoding: ImageEncoding::default(),
            links_enabled: true,
            title: None,
            creation_date: None,
        }
    }
}

/// Options for single image output.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageOptions {
    /// Image encoding
    pub encoding: ImageEncoding,
}

impl ImageOptions {
    /// Create image options with the given encoding.
    pub fn new(encoding: ImageEncoding) -> Self {
        Self { encoding }
    }
}

/// What kind of artifact an export produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outputMode", rename_all = "camelCase")]
pub enum OutputMode {
    /// Multi-page document with link annotations
    PaginatedDocument(DocumentOptions),
    /// One flat raster image
    SingleImage(ImageOptions),
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::PaginatedDocument(DocumentOptions::default())
    }
}

/// The full set of options for one export.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportConfig {
    /// Capture options
    pub capture: CaptureOptions,

    /// Output mode and its options
    pub mode: OutputMode,
}

impl ExportConfig {
    /// Create a new configuration with defaults (A4 paginated document).
    pub fn new() -> Self {
        Self::default()
    }

    /// Paginated document export.
    pub fn document(options: DocumentOptions) -> Self {
        Self {
            capture: CaptureOptions::default(),
            mode: OutputMode::PaginatedDocument(options),
        }
    }

    /// Single image export.
    pub fn image(encoding: ImageEncoding) -> Self {
        Self {
            capture: CaptureOptions::default(),
            mode: OutputMode::SingleImage(ImageOptions::new(encoding)),
        }
    }

    /// Set capture options.
    pub fn with_capture(mut self, capture: CaptureOptions) -> Self {
        self.capture = capture;
        self
    }

    /// Whether links are extracted for this export.
    pub fn links_enabled(&self) -> bool {
        matches!(&self.mode, OutputMode::PaginatedDocument(doc) if doc.links_enabled)
    }

    /// Check the whole configuration before any capture work.
    pub fn validate(&self) -> Result<()> {
        self.capture.validate()?;
        match &self.mode {
            OutputMode::PaginatedDocument(doc) => doc.validate(),
            OutputMode::SingleImage(image) => image.encoding.validate(),
        }
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save to a configuration file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
