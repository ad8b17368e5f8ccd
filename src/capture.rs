//! Rasterization of a layout subtree into a bitmap.
//!
//! [`Rasterizer`] is the seam to whatever actually paints the element. The
//! bundled [`SoftwareRasterizer`] paints boxes, borders and images from the
//! layout snapshot; hosts with a real renderer plug in their own.

use crate::config::{parse_color, CaptureOptions, CrossOriginPolicy};
use crate::dom::{Element, ImageRef, Rect};
use crate::error::{Error, Result};
use crate::links::LinkRegion;
use crossbeam_channel::Receiver;
use image::imageops::FilterType;
use image::{Rgba, RgbImage, RgbaImage};
use rayon::prelude::*;
use std::time::Instant;

/// A captured bitmap.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pixels: RgbaImage,
    tainted: bool,
}

impl Bitmap {
    /// Wrap raw RGBA pixels.
    pub fn new(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            tainted: false,
        }
    }

    /// Mark the bitmap as tainted by cross-origin data.
    pub fn tainted(mut self, tainted: bool) -> Self {
        self.tainted = tainted;
        self
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Whether a cross-origin image was drawn without CORS approval.
    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    /// Raw pixels.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Opaque RGB pixels with alpha composited over `background`.
    pub fn to_rgb(&self, background: [u8; 4]) -> RgbImage {
        let mut out = RgbImage::new(self.width(), self.height());
        for (dst, src) in out.pixels_mut().zip(self.pixels.pixels()) {
            let mut px = [background[0], background[1], background[2], 255];
            blend(&mut px, src.0);
            dst.0 = [px[0], px[1], px[2]];
        }
        out
    }
}

/// Result of one capture pass.
///
/// Owned by the export that produced it and never reused across exports.
#[derive(Debug, Clone)]
pub struct CapturedContent {
    /// The rasterized element
    pub bitmap: Bitmap,
    /// Element width in original layout pixels
    pub element_width_px: f64,
    /// Element height in original layout pixels
    pub element_height_px: f64,
    /// Scale the rasterizer was asked to apply
    pub capture_scale: f32,
    /// Links measured at capture time (empty when links are disabled)
    pub links: Vec<LinkRegion>,
}

impl CapturedContent {
    /// Bitmap width in pixels.
    pub fn pixel_width(&self) -> u32 {
        self.bitmap.width()
    }

    /// Bitmap height in pixels.
    pub fn pixel_height(&self) -> u32 {
        self.bitmap.height()
    }
}

/// Turns an element subtree into a bitmap.
pub trait Rasterizer: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Paint `element` at `options.capture_scale`.
    ///
    /// `origin` is the owning document's origin, for cross-origin checks.
    fn rasterize(
        &self,
        element: &Element,
        origin: Option<&str>,
        options: &CaptureOptions,
    ) -> Result<Bitmap>;
}

/// How an embedded image may be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageAccess {
    /// Draw without side effects
    Clean,
    /// Draw and taint the bitmap
    Taint,
    /// Leave the image out
    Skip,
}

/// Decide how an image may be drawn under the given options.
pub fn image_access(
    image: &ImageRef,
    document_origin: Option<&str>,
    options: &CaptureOptions,
) -> ImageAccess {
    let cross_origin = match image.origin.as_deref() {
        Some(origin) => Some(origin) != document_origin,
        None => false,
    };
    if !cross_origin {
        return ImageAccess::Clean;
    }
    if options.cross_origin_policy == CrossOriginPolicy::Anonymous && image.cors_allowed {
        ImageAccess::Clean
    } else if options.allow_tainted_canvas {
        ImageAccess::Taint
    } else {
        ImageAccess::Skip
    }
}

/// Scaled device-pixel box, clipped lazily while painting.
#[derive(Debug, Clone, Copy)]
struct DeviceRect {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl DeviceRect {
    fn from_layout(rect: &Rect, origin: &Rect, scale: f64) -> Self {
        let rel = rect.relative_to(origin);
        Self {
            x0: (rel.x * scale).round() as i64,
            y0: (rel.y * scale).round() as i64,
            x1: (rel.right() * scale).round() as i64,
            y1: (rel.bottom() * scale).round() as i64,
        }
    }

    fn width(&self) -> i64 {
        self.x1 - self.x0
    }

    fn height(&self) -> i64 {
        self.y1 - self.y0
    }
}

/// One paint operation.
enum PaintItem {
    Fill { area: DeviceRect, color: [u8; 4] },
    Image { area: DeviceRect, pixels: RgbaImage },
}

impl PaintItem {
    fn area(&self) -> &DeviceRect {
        match self {
            PaintItem::Fill { area, .. } | PaintItem::Image { area, .. } => area,
        }
    }

    fn paint_row(&self, y: i64, row: &mut [u8], width: i64) {
        let area = self.area();
        if y < area.y0 || y >= area.y1 {
            return;
        }
        let x0 = area.x0.max(0);
        let x1 = area.x1.min(width);
        for x in x0..x1 {
            let src = match self {
                PaintItem::Fill { color, .. } => *color,
                PaintItem::Image { pixels, .. } => {
                    pixels.get_pixel((x - area.x0) as u32, (y - area.y0) as u32).0
                }
            };
            let offset = x as usize * 4;
            blend(&mut row[offset..offset + 4], src);
        }
    }
}

/// Source-over blend of `src` onto `dst`.
fn blend(dst: &mut [u8], src: [u8; 4]) {
    let alpha = src[3] as u32;
    if alpha == 255 {
        dst.copy_from_slice(&src);
        return;
    }
    if alpha == 0 {
        return;
    }
    let inv = 255 - alpha;
    for c in 0..3 {
        dst[c] = ((src[c] as u32 * alpha + dst[c] as u32 * inv + 127) / 255) as u8;
    }
    dst[3] = (alpha + dst[3] as u32 * inv / 255).min(255) as u8;
}

/// Paints layout boxes, borders and images.
#[derive(Debug, Clone, Default)]
pub struct SoftwareRasterizer;

impl SoftwareRasterizer {
    /// Create a new software rasterizer.
    pub fn new() -> Self {
        Self
    }

    fn start_image_loads(
        &self,
        element: &Element,
        origin: Option<&str>,
        options: &CaptureOptions,
    ) -> (Vec<Option<PendingImage>>, bool) {
        let mut pending = Vec::new();
        let mut tainted = false;

        element.walk_visible(&mut |el| {
            let Some(image) = &el.image else {
                pending.push(None);
                return;
            };
            match image_access(image, origin, options) {
                ImageAccess::Skip => {
                    log::warn!(
                        "Skipping cross-origin image {} (no CORS approval, tainting disallowed)",
                        image.src
                    );
                    pending.push(None);
                }
                access => {
                    tainted |= access == ImageAccess::Taint;
                    pending.push(Some(PendingImage::spawn(image.src.clone())));
                }
            }
        });

        (pending, tainted)
    }

    fn display_list(
        &self,
        element: &Element,
        scale: f64,
        pending: Vec<Option<PendingImage>>,
        deadline: Instant,
    ) -> Vec<PaintItem> {
        let origin = element.rect;
        let mut items = Vec::new();
        let mut pending = pending.into_iter();

        element.walk_visible(&mut |el| {
            let area = DeviceRect::from_layout(&el.rect, &origin, scale);
            let loader = pending.next().flatten();

            if let Some(color) = el.background.as_deref().and_then(|c| color_or_warn(c)) {
                items.push(PaintItem::Fill { area, color });
            }

            if let Some(loader) = loader {
                if area.width() > 0 && area.height() > 0 {
                    if let Some(decoded) = loader.wait(deadline) {
                        let pixels = image::imageops::resize(
                            &decoded,
                            area.width() as u32,
                            area.height() as u32,
                            FilterType::Triangle,
                        );
                        items.push(PaintItem::Image { area, pixels });
                    }
                }
            }

            if let Some(border) = &el.border {
                if let Some(color) = color_or_warn(&border.color) {
                    let w = (border.width * scale).round().max(0.0) as i64;
                    if w > 0 {
                        for edge in border_edges(&area, w) {
                            items.push(PaintItem::Fill { area: edge, color });
                        }
                    }
                }
            }
        });

        items
    }
}

fn color_or_warn(color: &str) -> Option<[u8; 4]> {
    match parse_color(color) {
        Ok(rgba) => Some(rgba),
        Err(e) => {
            log::warn!("Ignoring unparsable color: {}", e);
            None
        }
    }
}

fn border_edges(area: &DeviceRect, w: i64) -> [DeviceRect; 4] {
    [
        DeviceRect {
            y1: (area.y0 + w).min(area.y1),
            ..*area
        },
        DeviceRect {
            y0: (area.y1 - w).max(area.y0),
            ..*area
        },
        DeviceRect {
            x1: (area.x0 + w).min(area.x1),
            ..*area
        },
        DeviceRect {
            x0: (area.x1 - w).max(area.x0),
            ..*area
        },
    ]
}

/// An image decoding on a loader thread.
struct PendingImage {
    src: String,
    rx: Receiver<image::ImageResult<RgbaImage>>,
}

impl PendingImage {
    fn spawn(src: String) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let path = src.clone();
        std::thread::spawn(move || {
            let _ = tx.send(image::open(&path).map(|img| img.to_rgba8()));
        });
        Self { src, rx }
    }

    fn wait(self, deadline: Instant) -> Option<RgbaImage> {
        match self.rx.recv_deadline(deadline) {
            Ok(Ok(pixels)) => Some(pixels),
            Ok(Err(e)) => {
                log::warn!("Failed to load image {}: {}", self.src, e);
                None
            }
            Err(_) => {
                log::warn!("Timed out loading image {}; capturing without it", self.src);
                None
            }
        }
    }
}

/// Largest canvas side in device pixels.
pub const MAX_CANVAS_SIDE: u32 = 16_384;

/// Largest canvas area in device pixels.
pub const MAX_CANVAS_AREA: u64 = 134_217_728;

/// Device pixel size of a `width` x `height` box painted at `scale`.
fn device_size(width: f64, height: f64, scale: f64) -> Result<(u32, u32)> {
    let w = (width * scale).round().max(0.0);
    let h = (height * scale).round().max(0.0);
    let max = MAX_CANVAS_SIDE as f64;
    if !w.is_finite() || !h.is_finite() || w > max || h > max {
        return Err(Error::InvalidConfiguration(format!(
            "capture of {:.0}x{:.0} px exceeds the {} px canvas limit",
            w, h, MAX_CANVAS_SIDE
        )));
    }

    let (w, h) = (w as u32, h as u32);
    if w as u64 * h as u64 > MAX_CANVAS_AREA {
        return Err(Error::InvalidConfiguration(format!(
            "capture of {}x{} px exceeds the canvas area limit",
            w, h
        )));
    }
    Ok((w, h))
}

impl Rasterizer for SoftwareRasterizer {
    fn name(&self) -> &str {
        "software"
    }

    fn rasterize(
        &self,
        element: &Element,
        origin: Option<&str>,
        options: &CaptureOptions,
    ) -> Result<Bitmap> {
        let background = options.background_rgba()?;
        let scale = options.capture_scale as f64;
        let bounds = element.bounding_rect();
        let (width, height) = device_size(bounds.width, bounds.height, scale)?;

        if width == 0 || height == 0 {
            return Ok(Bitmap::new(RgbaImage::new(width, height)));
        }

        let (pending, tainted) = self.start_image_loads(element, origin, options);
        let deadline = Instant::now() + options.image_timeout();
        let items = self.display_list(element, scale, pending, deadline);
        log::debug!(
            "Painting {}x{} bitmap with {} items (scale {})",
            width,
            height,
            items.len(),
            scale
        );

        let mut canvas = RgbaImage::from_pixel(width, height, Rgba(background));
        let row_len = width as usize * 4;
        canvas
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(y, row)| {
                for item in &items {
                    item.paint_row(y as i64, row, width as i64);
                }
            });

        Ok(Bitmap::new(canvas).tainted(tainted))
    }
}
