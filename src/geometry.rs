//! Page formats and the millimeter/pixel geometry used for pagination.
//!
//! All functions here are pure. Sizes are in millimeters unless the name
//! says otherwise; pixel values always refer to the original (unscaled)
//! layout size.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Millimeters per PDF point (1 pt = 1/72 inch).
pub const MM_PER_PT: f64 = 25.4 / 72.0;

/// Slack applied to page-count division so float noise on an exact fit
/// does not spill an empty page.
const PAGE_FIT_EPSILON: f64 = 1e-9;

/// A named physical page size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFormat {
    /// Registry name (lowercase)
    pub name: &'static str,
    /// Portrait width in millimeters
    pub width_mm: f64,
    /// Portrait height in millimeters
    pub height_mm: f64,
}

/// The fixed page format registry.
pub const PAGE_FORMATS: &[PageFormat] = &[
    PageFormat {
        name: "a3",
        width_mm: 297.0,
        height_mm: 420.0,
    },
    PageFormat {
        name: "a4",
        width_mm: 210.0,
        height_mm: 297.0,
    },
    PageFormat {
        name: "a5",
        width_mm: 148.0,
        height_mm: 210.0,
    },
    PageFormat {
        name: "letter",
        width_mm: 215.9,
        height_mm: 279.4,
    },
    PageFormat {
        name: "legal",
        width_mm: 215.9,
        height_mm: 355.6,
    },
    PageFormat {
        name: "tabloid",
        width_mm: 279.4,
        height_mm: 431.8,
    },
];

impl PageFormat {
    /// The default format (A4).
    pub const DEFAULT: PageFormat = PageFormat {
        name: "a4",
        width_mm: 210.0,
        height_mm: 297.0,
    };

    /// Look up a format by name, case-insensitively.
    pub fn by_name(name: &str) -> Option<PageFormat> {
        let name = name.trim();
        PAGE_FORMATS
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .copied()
    }

    /// All registered formats.
    pub fn all() -> &'static [PageFormat] {
        PAGE_FORMATS
    }
}

impl Default for PageFormat {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    /// Height is the long edge
    #[default]
    Portrait,
    /// Width is the long edge
    Landscape,
}

/// Page margins in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Margins {
    /// Top margin
    pub top: f64,
    /// Bottom margin
    pub bottom: f64,
    /// Left margin
    pub left: f64,
    /// Right margin
    pub right: f64,
}

impl Margins {
    /// Same margin on every side.
    pub fn uniform(mm: f64) -> Self {
        Self {
            top: mm,
            bottom: mm,
            left: mm,
            right: mm,
        }
    }

    /// Check every side is finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        for (side, value) in [
            ("top", self.top),
            ("bottom", self.bottom),
            ("left", self.left),
            ("right", self.right),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfiguration(format!(
                    "{} margin must be a non-negative number, got {}",
                    side, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(10.0)
    }
}

/// A width/height pair in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeMm {
    /// Width in millimeters
    pub width_mm: f64,
    /// Height in millimeters
    pub height_mm: f64,
}

impl SizeMm {
    /// Create a new size.
    pub fn new(width_mm: f64, height_mm: f64) -> Self {
        Self {
            width_mm,
            height_mm,
        }
    }
}

/// Page size after applying orientation.
pub fn effective_page_size(format: &PageFormat, orientation: Orientation) -> SizeMm {
    match orientation {
        Orientation::Portrait => SizeMm::new(format.width_mm, format.height_mm),
        Orientation::Landscape => SizeMm::new(format.height_mm, format.width_mm),
    }
}

/// The addressable content rectangle left after subtracting margins.
pub fn content_area(page: SizeMm, margins: &Margins) -> Result<SizeMm> {
    let width = page.width_mm - margins.left - margins.right;
    let height = page.height_mm - margins.top - margins.bottom;

    if width <= 0.0 || height <= 0.0 {
        return Err(Error::InvalidConfiguration(format!(
            "margins leave no content area on a {:.1}x{:.1} mm page ({:.1}x{:.1} mm)",
            page.width_mm, page.height_mm, width, height
        )));
    }

    Ok(SizeMm::new(width, height))
}

/// Scale an image to fill the content width, keeping its aspect ratio.
///
/// Height may exceed one page; pagination takes care of that.
pub fn scaled_image_size(pixel_width: u32, pixel_height: u32, content_width_mm: f64) -> SizeMm {
    if pixel_width == 0 {
        return SizeMm::new(content_width_mm, 0.0);
    }
    let height = pixel_height as f64 * content_width_mm / pixel_width as f64;
    SizeMm::new(content_width_mm, height)
}

/// Number of pages needed to show an image of the given height. Always at least 1.
pub fn page_count(total_image_height_mm: f64, content_height_mm: f64) -> u32 {
    if content_height_mm <= 0.0 || total_image_height_mm <= content_height_mm {
        return 1;
    }
    let pages = (total_image_height_mm / content_height_mm - PAGE_FIT_EPSILON).ceil();
    (pages as u32).max(1)
}

/// Vertical distance consumed by the pages before `page_index`.
pub fn page_offset_mm(page_index: u32, content_height_mm: f64) -> f64 {
    page_index as f64 * content_height_mm
}

/// Resolved pagination geometry for one export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    /// Page size after orientation
    pub page: SizeMm,
    /// Margins in effect
    pub margins: Margins,
    /// Content rectangle size
    pub content: SizeMm,
    /// Full (unpaginated) image size once scaled to the content width
    pub image: SizeMm,
    /// Number of output pages
    pub page_count: u32,
}

impl PageLayout {
    /// Resolve the layout for a bitmap of the given size.
    pub fn compute(
        format: &PageFormat,
        orientation: Orientation,
        margins: Margins,
        pixel_width: u32,
        pixel_height: u32,
    ) -> Result<Self> {
        margins.validate()?;
        let page = effective_page_size(format, orientation);
        let content = content_area(page, &margins)?;
        let image = scaled_image_size(pixel_width, pixel_height, content.width_mm);
        let page_count = page_count(image.height_mm, content.height_mm);

        Ok(Self {
            page,
            margins,
            content,
            image,
            page_count,
        })
    }

    /// Offset consumed by prior pages.
    pub fn offset_mm(&self, page_index: u32) -> f64 {
        page_offset_mm(page_index, self.content.height_mm)
    }

    /// Y position of the full image's top edge on the given page.
    ///
    /// Negative for every page after the first; the medium clips what falls
    /// outside the content rectangle.
    pub fn image_y_mm(&self, page_index: u32) -> f64 {
        self.margins.top - self.offset_mm(page_index)
    }

    /// Image height actually visible on the given page.
    pub fn visible_height_mm(&self, page_index: u32) -> f64 {
        let remaining = self.image.height_mm - self.offset_mm(page_index);
        remaining.clamp(0.0, self.content.height_mm)
    }
}
