//! Integration tests for page geometry, link re-projection and composition.

use reslice::compose::{compose, ImagePlacement, PageSink};
use reslice::geometry::{
    content_area, effective_page_size, page_count, page_offset_mm, scaled_image_size,
};
use reslice::links::{extract_links, reproject, reproject_all, LinkScale};
use reslice::{
    Element, Error, LinkRegion, Margins, Orientation, PageFormat, PageLayout, ProjectedLink, Rect,
    SizeMm,
};

fn a4() -> PageFormat {
    PageFormat::by_name("a4").unwrap()
}

fn link(y_px: f64, height_px: f64) -> LinkRegion {
    LinkRegion {
        x_px: 10.0,
        y_px,
        width_px: 50.0,
        height_px,
        target_url: "https://example.com".to_string(),
    }
}

/// A4, 7 mm margins, 1600x4000 px bitmap of a 1600x4000 px element.
fn scenario_layout() -> (PageLayout, LinkScale) {
    let layout =
        PageLayout::compute(&a4(), Orientation::Portrait, Margins::uniform(7.0), 1600, 4000)
            .unwrap();
    let scale = LinkScale::resolve(layout.image, (1600.0, 4000.0), (1600, 4000), 1.0);
    (layout, scale)
}

// ==================== Geometry ====================

#[test]
fn test_a4_seven_mm_scenario() {
    let page = effective_page_size(&a4(), Orientation::Portrait);
    let content = content_area(page, &Margins::uniform(7.0)).unwrap();
    assert!((content.width_mm - 196.0).abs() < 1e-9);
    assert!((content.height_mm - 283.0).abs() < 1e-9);

    let image = scaled_image_size(1600, 4000, content.width_mm);
    assert!((image.height_mm - 490.0).abs() < 1e-9);
    assert_eq!(page_count(image.height_mm, content.height_mm), 2);
}

#[test]
fn test_page_count_examples() {
    assert_eq!(page_count(700.0, 280.0), 3);
    assert_eq!(page_count(280.0, 280.0), 1);
    assert_eq!(page_count(0.0, 280.0), 1);
    assert_eq!(page_count(560.0, 280.0), 2);
    assert_eq!(page_count(560.1, 280.0), 3);
}

#[test]
fn test_page_count_monotonic() {
    let content = 283.0;
    let mut previous = page_count(0.0, content);
    let mut height = 0.0;
    while height < 3000.0 {
        let pages = page_count(height, content);
        assert!(pages >= previous, "page count fell at {} mm", height);
        if height <= content {
            assert_eq!(pages, 1);
        }
        previous = pages;
        height += 0.7;
    }
}

#[test]
fn test_offsets_reconstruct_image_height() {
    let (layout, _) = scenario_layout();
    assert_eq!(page_offset_mm(0, layout.content.height_mm), 0.0);

    let shown: f64 = (0..layout.page_count)
        .map(|i| layout.visible_height_mm(i))
        .sum();
    assert!((shown - layout.image.height_mm).abs() < 1e-9);

    let last = layout.page_count - 1;
    assert!(layout.offset_mm(last) < layout.image.height_mm);
    assert!(layout.offset_mm(last) + layout.content.height_mm >= layout.image.height_mm);
}

#[test]
fn test_landscape_swaps_dimensions() {
    let page = effective_page_size(&a4(), Orientation::Landscape);
    assert_eq!(page, SizeMm::new(297.0, 210.0));
}

#[test]
fn test_oversized_margins_rejected() {
    let result = PageLayout::compute(
        &PageFormat::by_name("a5").unwrap(),
        Orientation::Portrait,
        Margins::uniform(80.0),
        100,
        100,
    );
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
}

// ==================== Link re-projection ====================

#[test]
fn test_link_on_first_page_within_content() {
    let (layout, scale) = scenario_layout();
    let projected = reproject(&link(100.0, 20.0), scale, &layout).unwrap();

    assert_eq!(projected.page_index, 0);
    assert!(projected.y_mm >= layout.margins.top);
    assert!(projected.y_mm + projected.height_mm <= layout.margins.top + layout.content.height_mm);
    // 196 mm / 1600 px = 0.1225 mm per px
    assert!((projected.x_mm - (7.0 + 10.0 * 0.1225)).abs() < 1e-9);
    assert!((projected.y_mm - (7.0 + 100.0 * 0.1225)).abs() < 1e-9);
}

#[test]
fn test_straddling_link_dropped_from_both_pages() {
    let (layout, scale) = scenario_layout();
    // page break at 283 mm = 2310.2 px
    let straddling = link(2300.0, 40.0);
    assert!(reproject(&straddling, scale, &layout).is_none());

    let result = reproject_all(
        &[link(100.0, 20.0), straddling.clone(), link(2400.0, 20.0)],
        scale,
        &layout,
    );
    assert_eq!(result.placed.len(), 2);
    assert_eq!(result.dropped, vec![straddling]);
    assert_eq!(result.on_page(0).count(), 1);
    assert_eq!(result.on_page(1).count(), 1);
}

#[test]
fn test_link_on_second_page_uses_local_offset() {
    let (layout, scale) = scenario_layout();
    let projected = reproject(&link(2400.0, 20.0), scale, &layout).unwrap();
    assert_eq!(projected.page_index, 1);
    let expected = 7.0 + 2400.0 * 0.1225 - 283.0;
    assert!((projected.y_mm - expected).abs() < 1e-9);
}

#[test]
fn test_reprojection_ignores_capture_scale() {
    let layout_1x =
        PageLayout::compute(&a4(), Orientation::Portrait, Margins::default(), 800, 2000).unwrap();
    let layout_3x =
        PageLayout::compute(&a4(), Orientation::Portrait, Margins::default(), 2400, 6000).unwrap();
    let scale_1x = LinkScale::resolve(layout_1x.image, (800.0, 2000.0), (800, 2000), 1.0);
    let scale_3x = LinkScale::resolve(layout_3x.image, (800.0, 2000.0), (2400, 6000), 3.0);

    let a = reproject(&link(1300.0, 15.0), scale_1x, &layout_1x).unwrap();
    let b = reproject(&link(1300.0, 15.0), scale_3x, &layout_3x).unwrap();
    assert_eq!(a.page_index, 1);
    assert_eq!(a.page_index, b.page_index);
    assert!((a.y_mm - b.y_mm).abs() < 1e-9);
    assert!((a.width_mm - b.width_mm).abs() < 1e-9);
}

#[test]
fn test_extractor_skips_hidden_and_fragment_links() {
    let root = Element::new("div", Rect::new(50.0, 50.0, 400.0, 400.0))
        .with_child(Element::anchor("https://a.example", Rect::new(60.0, 60.0, 40.0, 10.0)))
        .with_child(Element::anchor("#section", Rect::new(60.0, 80.0, 40.0, 10.0)))
        .with_child(Element::anchor("https://b.example", Rect::new(60.0, 100.0, 0.0, 10.0)))
        .with_child(
            Element::new("section", Rect::new(50.0, 200.0, 400.0, 100.0))
                .hidden()
                .with_child(Element::anchor(
                    "https://c.example",
                    Rect::new(60.0, 210.0, 40.0, 10.0),
                )),
        );

    let links = extract_links(&root);
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].target_url, "https://a.example");
    assert_eq!((links[0].x_px, links[0].y_px), (10.0, 10.0));
}

// ==================== Composition ====================

/// Accepts pages and rejects links to a given host.
struct PickySink {
    extra_pages: u32,
    placements: Vec<ImagePlacement>,
    accepted: Vec<String>,
    refuse: &'static str,
}

impl PageSink for PickySink {
    fn add_page(&mut self) -> reslice::Result<()> {
        self.extra_pages += 1;
        Ok(())
    }

    fn place_image(&mut self, placement: &ImagePlacement) -> reslice::Result<()> {
        self.placements.push(*placement);
        Ok(())
    }

    fn add_link(&mut self, link: &ProjectedLink) -> reslice::Result<()> {
        if link.target_url.contains(self.refuse) {
            return Err(Error::AnnotationPlacement("refused".into()));
        }
        self.accepted.push(link.target_url.clone());
        Ok(())
    }
}

#[test]
fn test_compose_recovers_from_rejected_link() {
    let (layout, scale) = scenario_layout();
    let mut bad = link(50.0, 20.0);
    bad.target_url = "https://refused.example".into();
    let links = reproject_all(&[link(100.0, 20.0), bad, link(2400.0, 20.0)], scale, &layout);

    let mut sink = PickySink {
        extra_pages: 0,
        placements: Vec::new(),
        accepted: Vec::new(),
        refuse: "refused",
    };
    let composition = compose(&layout, &links, &mut sink).unwrap();

    assert_eq!(sink.extra_pages, 1);
    assert_eq!(composition.pages.len(), 2);
    assert_eq!(composition.rejected_links, 1);
    assert_eq!(composition.link_count(), 2);
    assert_eq!(sink.accepted.len(), 2);

    assert_eq!(sink.placements[0].y_mm, 7.0);
    assert!((sink.placements[1].y_mm - (7.0 - 283.0)).abs() < 1e-9);
    for placement in &sink.placements {
        assert_eq!(placement.x_mm, 7.0);
        assert!((placement.height_mm - 490.0).abs() < 1e-9);
    }
}
