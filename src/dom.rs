//! Live layout tree consumed by the capture pipeline.
//!
//! The template renderer hands over a laid-out snapshot: every element
//! carries its absolute border box in CSS pixels. The export core never
//! reflows anything; it only measures, clones and paints these boxes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::path::Path;

/// Horizontal position where off-screen clones are hosted.
pub const OFFSCREEN_LEFT_PX: f64 = -10_000.0;

/// An axis-aligned rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether the rectangle covers any area.
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// This rectangle expressed relative to `origin`'s top-left corner.
    pub fn relative_to(&self, origin: &Rect) -> Rect {
        Rect::new(self.x - origin.x, self.y - origin.y, self.width, self.height)
    }

    /// Shift by the given offset.
    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Border drawn around an element's box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Border {
    /// Border width in CSS pixels
    pub width: f64,
    /// CSS color string
    pub color: String,
}

/// An embedded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    /// Path of the image file
    pub src: String,
    /// Origin the image is served from; `None` means same-origin
    #[serde(default)]
    pub origin: Option<String>,
    /// Whether the serving origin answers CORS requests
    #[serde(default)]
    pub cors_allowed: bool,
}

/// A laid-out element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Element id attribute
    #[serde(default)]
    pub id: Option<String>,

    /// Tag name (lowercase)
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Absolute border box in CSS pixels
    pub rect: Rect,

    /// Link destination for anchors
    #[serde(default)]
    pub href: Option<String>,

    /// Background fill (CSS color)
    #[serde(default)]
    pub background: Option<String>,

    /// Border
    #[serde(default)]
    pub border: Option<Border>,

    /// Replaced image content
    #[serde(default)]
    pub image: Option<ImageRef>,

    /// `display: none` / `visibility: hidden`
    #[serde(default)]
    pub hidden: bool,

    /// Child elements in paint order
    #[serde(default)]
    pub children: Vec<Element>,
}

fn default_tag() -> String {
    "div".to_string()
}

impl Element {
    /// Create a new element with the given tag and box.
    pub fn new(tag: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: None,
            tag: tag.into(),
            rect,
            href: None,
            background: None,
            border: None,
            image: None,
            hidden: false,
            children: Vec::new(),
        }
    }

    /// Create an anchor element.
    pub fn anchor(href: impl Into<String>, rect: Rect) -> Self {
        Self::new("a", rect).with_href(href)
    }

    /// Set the id attribute.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the link destination.
    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background = Some(color.into());
        self
    }

    /// Set the border.
    pub fn with_border(mut self, width: f64, color: impl Into<String>) -> Self {
        self.border = Some(Border {
            width,
            color: color.into(),
        });
        self
    }

    /// Set the image content.
    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.image = Some(image);
        self
    }

    /// Mark as hidden.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Append a child.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Bounding box as the renderer reports it; hidden elements measure as empty.
    pub fn bounding_rect(&self) -> Rect {
        if self.hidden {
            Rect::new(self.rect.x, self.rect.y, 0.0, 0.0)
        } else {
            self.rect
        }
    }

    /// Whether this element is an anchor.
    pub fn is_anchor(&self) -> bool {
        self.tag.eq_ignore_ascii_case("a")
    }

    /// Find a descendant (or self) by id.
    pub fn find(&self, id: &str) -> Option<&Element> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Shift this element and its whole subtree.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.rect = self.rect.translate(dx, dy);
        for child in &mut self.children {
            child.translate(dx, dy);
        }
    }

    /// Depth-first visit of visible elements.
    pub fn walk_visible<'a>(&'a self, visit: &mut impl FnMut(&'a Element)) {
        if self.hidden {
            return;
        }
        visit(self);
        for child in &self.children {
            child.walk_visible(visit);
        }
    }
}

/// Snapshot file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    #[serde(default)]
    origin: Option<String>,
    root: Element,
}

/// The live document: the rendered tree plus transient off-screen containers.
#[derive(Debug, Clone)]
pub struct LiveDom {
    origin: Option<String>,
    root: Element,
    offscreen: Vec<(u64, Element)>,
    next_slot: u64,
}

impl LiveDom {
    /// Create a document from its root element.
    pub fn new(root: Element) -> Self {
        Self {
            origin: None,
            root,
            offscreen: Vec::new(),
            next_slot: 0,
        }
    }

    /// Set the document origin used for cross-origin checks.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Parse a layout snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Ok(Self {
            origin: snapshot.origin,
            root: snapshot.root,
            offscreen: Vec::new(),
            next_slot: 0,
        })
    }

    /// Load a layout snapshot from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Document origin.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// The document root.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Mutable access to the rendered tree.
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Look up an element by id.
    pub fn find(&self, id: &str) -> Result<&Element> {
        self.root
            .find(id)
            .ok_or_else(|| Error::ElementNotFound(id.to_string()))
    }

    /// Number of off-screen containers currently attached.
    pub fn offscreen_count(&self) -> usize {
        self.offscreen.len()
    }

    /// Host a clone of `element` off-screen.
    ///
    /// The clone is detached when the returned guard is dropped.
    pub fn mount_offscreen(&mut self, element: &Element) -> OffscreenContainer<'_> {
        let mut clone = element.clone();
        clone.translate(OFFSCREEN_LEFT_PX - clone.rect.x, 0.0);

        let slot = self.next_slot;
        self.next_slot += 1;
        self.offscreen.push((slot, clone));
        log::debug!("Mounted off-screen container {}", slot);

        OffscreenContainer { dom: self, slot }
    }
}

/// Scoped off-screen container holding a clone of the captured element.
pub struct OffscreenContainer<'a> {
    dom: &'a mut LiveDom,
    slot: u64,
}

impl OffscreenContainer<'_> {
    /// The cloned element.
    pub fn element(&self) -> &Element {
        self.dom
            .offscreen
            .iter()
            .find(|(slot, _)| *slot == self.slot)
            .map(|(_, element)| element)
            .unwrap_or(&self.dom.root)
    }

    /// Origin of the owning document.
    pub fn origin(&self) -> Option<&str> {
        self.dom.origin()
    }
}

impl Deref for OffscreenContainer<'_> {
    type Target = Element;

    fn deref(&self) -> &Element {
        self.element()
    }
}

impl Drop for OffscreenContainer<'_> {
    fn drop(&mut self) {
        let slot = self.slot;
        self.dom.offscreen.retain(|(s, _)| *s != slot);
        log::debug!("Removed off-screen container {}", slot);
    }
}
