//! Link extraction and re-projection onto output pages.
//!
//! Links are measured in original layout pixels relative to the captured
//! element, then mapped to millimeters through "mm per original pixel". The
//! rasterizer's internal capture scale never enters this math.

use crate::dom::Element;
use crate::geometry::{PageLayout, SizeMm};
use serde::{Deserialize, Serialize};

/// Tolerance, in bitmap pixels, for rounding in the rasterizer's output size.
const SCALE_TOLERANCE_PX: f64 = 1.0;

/// Slack for float noise in the page-bounds check, in millimeters.
const BOUNDS_EPSILON_MM: f64 = 1e-6;

/// A clickable region of the captured element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRegion {
    /// Left edge relative to the captured element
    pub x_px: f64,
    /// Top edge relative to the captured element
    pub y_px: f64,
    /// Width in original pixels
    pub width_px: f64,
    /// Height in original pixels
    pub height_px: f64,
    /// Link destination
    pub target_url: String,
}

/// Collect every visible anchor with a destination and a non-empty box.
///
/// The root box and the anchor boxes are read in the same pass so they
/// describe the same layout.
pub fn extract_links(root: &Element) -> Vec<LinkRegion> {
    let origin = root.bounding_rect();
    let mut links = Vec::new();

    root.walk_visible(&mut |el| {
        if !el.is_anchor() {
            return;
        }
        let Some(target) = el.href.as_deref().and_then(resolvable_target) else {
            return;
        };
        let rect = el.bounding_rect();
        if !rect.has_area() {
            log::debug!("Skipping zero-size link to {}", target);
            return;
        }
        let rel = rect.relative_to(&origin);
        links.push(LinkRegion {
            x_px: rel.x,
            y_px: rel.y,
            width_px: rel.width,
            height_px: rel.height,
            target_url: target.to_string(),
        });
    });

    links
}

/// A destination usable outside the page, or `None` for empty and in-page
/// fragment targets.
fn resolvable_target(href: &str) -> Option<&str> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        None
    } else {
        Some(href)
    }
}

/// Millimeters per original layout pixel, per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkScale {
    /// Horizontal mm per original pixel
    pub x: f64,
    /// Vertical mm per original pixel
    pub y: f64,
}

impl LinkScale {
    /// Resolve the scale from the scaled image size and the original element size.
    ///
    /// The bitmap size is only checked against `capture_scale`; a mismatch
    /// (a rasterizer clamping oversized canvases, say) is logged and the
    /// element size stays authoritative.
    pub fn resolve(
        image: SizeMm,
        element_px: (f64, f64),
        bitmap_px: (u32, u32),
        capture_scale: f32,
    ) -> Self {
        let (element_w, element_h) = element_px;
        let expected_w = element_w * capture_scale as f64;
        let expected_h = element_h * capture_scale as f64;
        if (bitmap_px.0 as f64 - expected_w).abs() > SCALE_TOLERANCE_PX
            || (bitmap_px.1 as f64 - expected_h).abs() > SCALE_TOLERANCE_PX
        {
            log::warn!(
                "Bitmap is {}x{} px but {:.0}x{:.0} was expected at scale {}; placing links from layout size",
                bitmap_px.0,
                bitmap_px.1,
                expected_w,
                expected_h,
                capture_scale
            );
        }

        Self {
            x: if element_w > 0.0 {
                image.width_mm / element_w
            } else {
                0.0
            },
            y: if element_h > 0.0 {
                image.height_mm / element_h
            } else {
                0.0
            },
        }
    }
}

/// A link placed on one output page, in page millimeters from the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedLink {
    /// Output page (0-based)
    pub page_index: u32,
    /// Left edge including the left margin
    pub x_mm: f64,
    /// Top edge including the top margin
    pub y_mm: f64,
    /// Width
    pub width_mm: f64,
    /// Height
    pub height_mm: f64,
    /// Link destination
    pub target_url: String,
}

/// Map one link onto its page, or `None` when it does not fit entirely
/// inside that page's content area.
///
/// Links straddling a page break are dropped, never split.
pub fn reproject(link: &LinkRegion, scale: LinkScale, layout: &PageLayout) -> Option<ProjectedLink> {
    let content = layout.content;
    let margins = layout.margins;

    let abs_x = link.x_px * scale.x;
    let abs_y = link.y_px * scale.y;
    let width = link.width_px * scale.x;
    let height = link.height_px * scale.y;

    if !(abs_x.is_finite() && abs_y.is_finite() && width.is_finite() && height.is_finite())
        || abs_y < 0.0
    {
        return None;
    }

    let page_index = (abs_y / content.height_mm).floor() as u32;
    if page_index >= layout.page_count {
        return None;
    }
    let local_y = abs_y - layout.offset_mm(page_index);

    let x = margins.left + abs_x;
    let y = margins.top + local_y;

    let fits = x >= margins.left - BOUNDS_EPSILON_MM
        && x + width <= margins.left + content.width_mm + BOUNDS_EPSILON_MM
        && y >= margins.top - BOUNDS_EPSILON_MM
        && y + height <= margins.top + content.height_mm + BOUNDS_EPSILON_MM;

    if !fits {
        return None;
    }

    Some(ProjectedLink {
        page_index,
        x_mm: x,
        y_mm: y,
        width_mm: width,
        height_mm: height,
        target_url: link.target_url.clone(),
    })
}

/// Outcome of re-projecting every extracted link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reprojection {
    /// Links that fit on a page
    pub placed: Vec<ProjectedLink>,
    /// Links dropped for crossing a page or content boundary
    pub dropped: Vec<LinkRegion>,
}

impl Reprojection {
    /// Links placed on the given page.
    pub fn on_page(&self, page_index: u32) -> impl Iterator<Item = &ProjectedLink> {
        self.placed
            .iter()
            .filter(move |link| link.page_index == page_index)
    }
}

/// Re-project every link, separating placed from dropped ones.
pub fn reproject_all(links: &[LinkRegion], scale: LinkScale, layout: &PageLayout) -> Reprojection {
    let mut result = Reprojection::default();

    for link in links {
        match reproject(link, scale, layout) {
            Some(projected) => result.placed.push(projected),
            None => {
                log::debug!(
                    "Dropping link to {} at ({:.1}, {:.1}) px: does not fit a single page",
                    link.target_url,
                    link.x_px,
                    link.y_px
                );
                result.dropped.push(link.clone());
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Rect;
    use crate::geometry::{Margins, Orientation, PageFormat};

    fn layout_1600x4000() -> PageLayout {
        // 800x2000 layout px captured at scale 2
        PageLayout::compute(
            &PageFormat::DEFAULT,
            Orientation::Portrait,
            Margins::uniform(7.0),
            1600,
            4000,
        )
        .unwrap()
    }

    fn scale_for(layout: &PageLayout) -> LinkScale {
        LinkScale::resolve(layout.image, (800.0, 2000.0), (1600, 4000), 2.0)
    }

    fn link(x: f64, y: f64, w: f64, h: f64) -> LinkRegion {
        LinkRegion {
            x_px: x,
            y_px: y,
            width_px: w,
            height_px: h,
            target_url: "https://example.com".into(),
        }
    }

    // ==================== Extraction ====================

    #[test]
    fn test_extract_relative_to_root() {
        let root = Element::new("div", Rect::new(100.0, 200.0, 800.0, 2000.0))
            .with_child(Element::anchor("https://a.example", Rect::new(150.0, 260.0, 80.0, 12.0)));
        let links = extract_links(&root);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].x_px, 50.0);
        assert_eq!(links[0].y_px, 60.0);
        assert_eq!(links[0].target_url, "https://a.example");
    }

    #[test]
    fn test_extract_skips_hidden_empty_and_fragment_links() {
        let root = Element::new("div", Rect::new(0.0, 0.0, 800.0, 2000.0))
            .with_child(Element::anchor("https://zero.example", Rect::new(0.0, 0.0, 0.0, 10.0)))
            .with_child(
                Element::anchor("https://hidden.example", Rect::new(0.0, 0.0, 10.0, 10.0))
                    .hidden(),
            )
            .with_child(Element::anchor("#section", Rect::new(0.0, 0.0, 10.0, 10.0)))
            .with_child(Element::new("a", Rect::new(0.0, 0.0, 10.0, 10.0)))
            .with_child(
                Element::new("div", Rect::new(0.0, 0.0, 10.0, 10.0))
                    .with_href("https://not-an-anchor.example"),
            );
        assert!(extract_links(&root).is_empty());
    }

    #[test]
    fn test_extract_nested_anchor_under_hidden_parent() {
        let root = Element::new("div", Rect::new(0.0, 0.0, 800.0, 2000.0)).with_child(
            Element::new("section", Rect::new(0.0, 0.0, 800.0, 100.0))
                .hidden()
                .with_child(Element::anchor("https://x.example", Rect::new(0.0, 0.0, 10.0, 10.0))),
        );
        assert!(extract_links(&root).is_empty());
    }

    // ==================== Scale ====================

    #[test]
    fn test_scale_uses_original_pixels() {
        let layout = layout_1600x4000();
        let scale = scale_for(&layout);
        assert!((scale.x - 196.0 / 800.0).abs() < 1e-12);
        assert!((scale.y - 490.0 / 2000.0).abs() < 1e-12);
    }

    #[test]
    fn test_scale_invariant_to_capture_scale() {
        let at_1 = PageLayout::compute(
            &PageFormat::DEFAULT,
            Orientation::Portrait,
            Margins::uniform(7.0),
            800,
            2000,
        )
        .unwrap();
        let at_2 = layout_1600x4000();
        let s1 = LinkScale::resolve(at_1.image, (800.0, 2000.0), (800, 2000), 1.0);
        let s2 = LinkScale::resolve(at_2.image, (800.0, 2000.0), (1600, 4000), 2.0);
        assert!((s1.x - s2.x).abs() < 1e-12);
        assert!((s1.y - s2.y).abs() < 1e-12);
    }

    // ==================== Re-projection ====================

    #[test]
    fn test_link_on_first_page() {
        let layout = layout_1600x4000();
        let projected = reproject(&link(40.0, 100.0, 200.0, 20.0), scale_for(&layout), &layout)
            .expect("link should fit");
        assert_eq!(projected.page_index, 0);
        assert!(projected.y_mm >= 7.0 && projected.y_mm <= 7.0 + 283.0);
        assert!((projected.x_mm - (7.0 + 40.0 * 0.245)).abs() < 1e-9);
        assert!((projected.y_mm - (7.0 + 100.0 * 0.245)).abs() < 1e-9);
    }

    #[test]
    fn test_link_on_second_page_is_page_local() {
        let layout = layout_1600x4000();
        // 1500 px * 0.245 = 367.5 mm -> page 1, local 84.5 mm
        let projected = reproject(&link(0.0, 1500.0, 100.0, 20.0), scale_for(&layout), &layout)
            .expect("link should fit");
        assert_eq!(projected.page_index, 1);
        assert!((projected.y_mm - (7.0 + 367.5 - 283.0)).abs() < 1e-9);
    }

    #[test]
    fn test_straddling_link_dropped() {
        let layout = layout_1600x4000();
        // page break at 283 mm = 1155.1 px; link spans 1150..1170 px
        let result = reproject_all(&[link(0.0, 1150.0, 100.0, 20.0)], scale_for(&layout), &layout);
        assert!(result.placed.is_empty());
        assert_eq!(result.dropped.len(), 1);
        assert_eq!(result.on_page(0).count(), 0);
        assert_eq!(result.on_page(1).count(), 0);
    }

    #[test]
    fn test_link_past_right_edge_dropped() {
        let layout = layout_1600x4000();
        assert!(reproject(&link(790.0, 10.0, 50.0, 10.0), scale_for(&layout), &layout).is_none());
    }

    #[test]
    fn test_link_touching_content_edges_kept() {
        let layout = layout_1600x4000();
        assert!(reproject(&link(0.0, 0.0, 800.0, 10.0), scale_for(&layout), &layout).is_some());
    }

    #[test]
    fn test_negative_position_dropped() {
        let layout = layout_1600x4000();
        assert!(reproject(&link(10.0, -5.0, 10.0, 10.0), scale_for(&layout), &layout).is_none());
    }

    #[test]
    fn test_reproject_all_groups_by_page() {
        let layout = layout_1600x4000();
        let links = vec![
            link(0.0, 10.0, 50.0, 10.0),
            link(0.0, 30.0, 50.0, 10.0),
            link(0.0, 1600.0, 50.0, 10.0),
        ];
        let result = reproject_all(&links, scale_for(&layout), &layout);
        assert_eq!(result.on_page(0).count(), 2);
        assert_eq!(result.on_page(1).count(), 1);
        assert!(result.dropped.is_empty());
    }
}
