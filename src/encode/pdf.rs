//! Paginated PDF encoder built on lopdf.
//!
//! The captured bitmap is embedded once as an image XObject and drawn on
//! every page, shifted up by the page offset and clipped to the content
//! rectangle. Links become `/Link` annotations with `/URI` actions.

use std::io::Write;

use chrono::{DateTime, Utc};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::raster::jpeg_quality;
use crate::capture::Bitmap;
use crate::compose::{ImagePlacement, PageSink};
use crate::config::ImageEncoding;
use crate::error::{Error, Result};
use crate::geometry::{PageLayout, MM_PER_PT};
use crate::links::ProjectedLink;

const IMAGE_NAME: &str = "Im0";
const PRODUCER: &str = concat!("reslice ", env!("CARGO_PKG_VERSION"));

fn pt(mm: f64) -> f64 {
    mm / MM_PER_PT
}

/// PDF text string: a literal when ASCII, UTF-16BE with a byte order mark otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// URI as 7-bit ASCII, with spaces and non-ASCII bytes percent-encoded.
fn uri_string(uri: &str) -> Object {
    let mut encoded = String::with_capacity(uri.len());
    for byte in uri.bytes() {
        if byte.is_ascii_graphic() {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    Object::string_literal(encoded)
}

fn real(value: f64) -> Object {
    Object::Real(value as _)
}

/// Document metadata written to the trailer's `/Info`.
#[derive(Debug, Clone, Default)]
pub struct PdfInfo {
    /// Document title
    pub title: Option<String>,
    /// Creation date; omitted when unset so output stays reproducible
    pub creation_date: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct PageBuffer {
    operations: Vec<Operation>,
    annotations: Vec<Object>,
}

/// Builds a PDF page by page; the output medium for the compositor.
pub struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    image_id: ObjectId,
    layout: PageLayout,
    page_ids: Vec<ObjectId>,
    current: PageBuffer,
}

impl PdfWriter {
    /// Start a document sized for `layout`, embedding `bitmap` once.
    pub fn new(
        layout: PageLayout,
        bitmap: &Bitmap,
        encoding: &ImageEncoding,
        background: [u8; 4],
    ) -> Result<Self> {
        if bitmap.is_tainted() {
            return Err(Error::TaintedCanvas);
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let image_id = doc.add_object(image_xobject(bitmap, encoding, background)?);

        Ok(Self {
            doc,
            pages_id,
            image_id,
            layout,
            page_ids: Vec::new(),
            current: PageBuffer::default(),
        })
    }

    fn page_height_pt(&self) -> f64 {
        pt(self.layout.page.height_mm)
    }

    /// Write the current page's objects and reset the buffer.
    fn flush_page(&mut self) -> Result<()> {
        let buffer = std::mem::take(&mut self.current);
        let content = Content {
            operations: buffer.operations,
        };
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                real(pt(self.layout.page.width_mm)),
                real(self.page_height_pt()),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    IMAGE_NAME => self.image_id,
                },
            },
        };
        if !buffer.annotations.is_empty() {
            page.set("Annots", buffer.annotations);
        }

        let page_id = self.doc.add_object(page);
        self.page_ids.push(page_id);
        Ok(())
    }

    /// Close the last page and serialize the document.
    pub fn finish(mut self, info: &PdfInfo) -> Result<Vec<u8>> {
        self.flush_page()?;

        let count = self.page_ids.len() as i64;
        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(count),
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut info_dict = Dictionary::new();
        info_dict.set("Producer", Object::string_literal(PRODUCER));
        if let Some(title) = &info.title {
            info_dict.set("Title", text_string(title));
        }
        if let Some(date) = &info.creation_date {
            info_dict.set(
                "CreationDate",
                Object::string_literal(format!("D:{}Z", date.format("%Y%m%d%H%M%S"))),
            );
        }
        let info_id = self.doc.add_object(info_dict);
        self.doc.trailer.set("Info", info_id);

        self.doc.compress();
        let mut out = Vec::new();
        self.doc.save_to(&mut out)?;
        log::debug!("Wrote PDF with {} pages ({} bytes)", count, out.len());
        Ok(out)
    }
}

impl PageSink for PdfWriter {
    fn add_page(&mut self) -> Result<()> {
        self.flush_page()
    }

    fn place_image(&mut self, placement: &ImagePlacement) -> Result<()> {
        let page_h = self.page_height_pt();
        let margins = self.layout.margins;
        let content = self.layout.content;

        let clip_x = pt(margins.left);
        let clip_y = page_h - pt(margins.top + content.height_mm);
        let width = pt(placement.width_mm);
        let height = pt(placement.height_mm);
        let x = pt(placement.x_mm);
        let y = page_h - pt(placement.y_mm) - height;

        self.current.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "re",
                vec![
                    real(clip_x),
                    real(clip_y),
                    real(pt(content.width_mm)),
                    real(pt(content.height_mm)),
                ],
            ),
            Operation::new("W", vec![]),
            Operation::new("n", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(width),
                    Object::Integer(0),
                    Object::Integer(0),
                    real(height),
                    real(x),
                    real(y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn add_link(&mut self, link: &ProjectedLink) -> Result<()> {
        let page_w = self.layout.page.width_mm;
        let page_h = self.layout.page.height_mm;
        let values = [link.x_mm, link.y_mm, link.width_mm, link.height_mm];

        if values.iter().any(|v| !v.is_finite()) || link.width_mm <= 0.0 || link.height_mm <= 0.0 {
            return Err(Error::AnnotationPlacement(format!(
                "degenerate rectangle {:?}",
                values
            )));
        }
        if link.x_mm < 0.0
            || link.y_mm < 0.0
            || link.x_mm + link.width_mm > page_w
            || link.y_mm + link.height_mm > page_h
        {
            return Err(Error::AnnotationPlacement(format!(
                "rectangle {:?} lies outside the {}x{} mm page",
                values, page_w, page_h
            )));
        }
        if link.target_url.is_empty() || link.target_url.chars().any(|c| c.is_control()) {
            return Err(Error::AnnotationPlacement(format!(
                "unusable URI {:?}",
                link.target_url
            )));
        }

        let page_h_pt = pt(page_h);
        let x1 = pt(link.x_mm);
        let x2 = pt(link.x_mm + link.width_mm);
        let y_top = page_h_pt - pt(link.y_mm);
        let y_bottom = page_h_pt - pt(link.y_mm + link.height_mm);

        let annotation = self.doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => vec![real(x1), real(y_bottom), real(x2), real(y_top)],
            "Border" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)],
            "A" => dictionary! {
                "S" => "URI",
                "URI" => uri_string(&link.target_url),
            },
        });
        self.current.annotations.push(Object::Reference(annotation));
        Ok(())
    }
}

/// Build the image XObject for the bitmap, alpha flattened onto `background`.
fn image_xobject(bitmap: &Bitmap, encoding: &ImageEncoding, background: [u8; 4]) -> Result<Stream> {
    let rgb = bitmap.to_rgb(background);
    let (width, height) = rgb.dimensions();

    let (filter, data) = match encoding {
        ImageEncoding::Jpeg { quality } => {
            let mut out = Vec::new();
            JpegEncoder::new_with_quality(&mut out, jpeg_quality(*quality)).write_image(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )?;
            ("DCTDecode", out)
        }
        ImageEncoding::Png => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(rgb.as_raw())?;
            ("FlateDecode", encoder.finish()?)
        }
    };

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => Object::Integer(width as i64),
        "Height" => Object::Integer(height as i64),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => Object::Integer(8),
        "Filter" => filter,
    };
    Ok(Stream::new(dict, data).with_compression(false))
}
