//! Page composition: one image placement plus that page's links per page.

use crate::error::{Error, Result};
use crate::geometry::PageLayout;
use crate::links::{ProjectedLink, Reprojection};
use serde::{Deserialize, Serialize};

/// Where the full scaled image goes on one page, in page millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePlacement {
    /// Left edge
    pub x_mm: f64,
    /// Top edge; negative after the first page
    pub y_mm: f64,
    /// Full image width
    pub width_mm: f64,
    /// Full image height
    pub height_mm: f64,
}

/// One output page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSlice {
    /// Page number (0-based)
    pub page_index: u32,
    /// Vertical distance already shown by prior pages
    pub vertical_offset_mm: f64,
    /// Image placement on this page
    pub placement: ImagePlacement,
    /// Links attached to this page
    pub link_annotations: Vec<ProjectedLink>,
}

/// An output medium that receives pages.
///
/// The medium starts with one blank page; `add_page` appends another and
/// makes it current.
pub trait PageSink {
    /// Start a new blank page.
    fn add_page(&mut self) -> Result<()>;

    /// Draw the shared image on the current page.
    fn place_image(&mut self, placement: &ImagePlacement) -> Result<()>;

    /// Attach a link annotation to the current page.
    ///
    /// May fail with [`Error::AnnotationPlacement`]; the compositor skips
    /// that link and carries on.
    fn add_link(&mut self, link: &ProjectedLink) -> Result<()>;
}

/// Summary of one composition run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composition {
    /// Pages in output order
    pub pages: Vec<PageSlice>,
    /// Links the medium rejected
    pub rejected_links: u32,
}

impl Composition {
    /// Total links attached across pages.
    pub fn link_count(&self) -> usize {
        self.pages.iter().map(|p| p.link_annotations.len()).sum()
    }
}

/// Lay out every page on `sink`.
pub fn compose(
    layout: &PageLayout,
    links: &Reprojection,
    sink: &mut dyn PageSink,
) -> Result<Composition> {
    let mut composition = Composition::default();

    for page_index in 0..layout.page_count {
        if page_index > 0 {
            sink.add_page()?;
        }

        let placement = ImagePlacement {
            x_mm: layout.margins.left,
            y_mm: layout.image_y_mm(page_index),
            width_mm: layout.image.width_mm,
            height_mm: layout.image.height_mm,
        };
        sink.place_image(&placement)?;

        let mut attached = Vec::new();
        for link in links.on_page(page_index) {
            match sink.add_link(link) {
                Ok(()) => attached.push(link.clone()),
                Err(Error::AnnotationPlacement(reason)) => {
                    log::warn!(
                        "Skipping link to {} on page {}: {}",
                        link.target_url,
                        page_index + 1,
                        reason
                    );
                    composition.rejected_links += 1;
                }
                Err(e) => return Err(e),
            }
        }

        composition.pages.push(PageSlice {
            page_index,
            vertical_offset_mm: layout.offset_mm(page_index),
            placement,
            link_annotations: attached,
        });
    }

    Ok(composition)
}
