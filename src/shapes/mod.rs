//! # Custom Shapes
//!
//! User-placed rectangles, text boxes and images drawn on top of the
//! document. A shape is either fixed to the page or anchored to the items
//! table, in which case its `y` is an offset below the table's resolved
//! bottom (the totals line) and it rides along as rows are added.
//!
//! The collection is stored as a JSON array under the `custom_shapes`
//! settings key. Loading is per entry: a malformed entry is dropped with a
//! warning and the rest of the collection survives.

pub mod handles;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::SettingsError;
use crate::font::{FontContext, FontKey};
use crate::geometry::{Frame, Point};
use crate::layout::ResolvedLayout;
use crate::settings::{keys, SettingsStore};
use crate::units::pt_to_mm;

pub use handles::{handle_at, move_frame, resize_frame, ResizeHandle};

/// Smallest width or height a persisted shape may have, in millimetres.
pub const MIN_SHAPE_SIZE: f64 = 5.0;

/// Stable opaque shape identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(String);

impl ShapeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ShapeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a shape's position is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    #[default]
    Page,
    Table,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RectangleStyle {
    pub border_color: String,
    /// Border width in CSS pixels.
    pub border_width: f64,
    pub fill_color: String,
    pub fill_opacity: f64,
}

impl Default for RectangleStyle {
    fn default() -> Self {
        Self {
            border_color: "#000000".to_string(),
            border_width: 1.0,
            fill_color: "#ffffff".to_string(),
            fill_opacity: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextBoxStyle {
    pub text: String,
    /// Points.
    pub font_size: f64,
    pub font_color: String,
    pub bold: bool,
    pub italic: bool,
    pub background_color: String,
    pub background_opacity: f64,
}

impl Default for TextBoxStyle {
    fn default() -> Self {
        Self {
            text: "Text".to_string(),
            font_size: 10.0,
            font_color: "#000000".to_string(),
            bold: false,
            italic: false,
            background_color: "#ffffff".to_string(),
            background_opacity: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageRef {
    /// Relative filename in the image store.
    pub image_path: String,
    /// `height / width` of the original image.
    pub aspect_ratio: f64,
    /// CSS pixels; zero for no border.
    pub border_width: f64,
    pub border_color: String,
    pub opacity: f64,
}

impl Default for ImageRef {
    fn default() -> Self {
        Self {
            image_path: String::new(),
            aspect_ratio: 1.0,
            border_width: 0.0,
            border_color: "#000000".to_string(),
            opacity: 1.0,
        }
    }
}

/// Inner padding of a text box, in millimetres.
pub const TEXT_BOX_PADDING: f64 = 1.0;
pub const TEXT_BOX_LINE_HEIGHT_FACTOR: f64 = 1.2;

/// One laid-out line of a text box.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f64,
    pub baseline_y: f64,
}

impl TextBoxStyle {
    pub fn font_key(&self) -> FontKey {
        FontKey::new(self.bold, self.italic)
    }

    /// Wrap the text into `frame`. Lines that would run past the bottom
    /// edge are dropped.
    pub fn lines(&self, frame: &Frame, fonts: &FontContext) -> Vec<PlacedLine> {
        let size_mm = pt_to_mm(self.font_size);
        let pitch = size_mm * TEXT_BOX_LINE_HEIGHT_FACTOR;
        let inner_width = (frame.width - 2.0 * TEXT_BOX_PADDING).max(0.0);
        let first_baseline = frame.y + TEXT_BOX_PADDING + size_mm * 0.8;

        fonts
            .wrap(&self.text, self.font_key(), self.font_size, inner_width)
            .into_iter()
            .enumerate()
            .map(|(i, text)| PlacedLine {
                text,
                x: frame.x + TEXT_BOX_PADDING,
                baseline_y: first_baseline + pitch * i as f64,
            })
            .take_while(|line| line.baseline_y <= frame.bottom() - TEXT_BOX_PADDING + 1e-9)
            .filter(|line| !line.text.is_empty())
            .collect()
    }
}

/// The closed set of shape kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeKind {
    Rectangle(RectangleStyle),
    #[serde(rename = "text")]
    TextBox(TextBoxStyle),
    Image(ImageRef),
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle(_) => "rectangle",
            ShapeKind::TextBox(_) => "text",
            ShapeKind::Image(_) => "image",
        }
    }
}

/// A custom shape. `frame` is in page millimetres, except that `frame.y`
/// of a table-anchored shape is an offset below the totals line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    #[serde(flatten)]
    pub frame: Frame,
    #[serde(default)]
    pub anchor: Anchor,
    #[serde(flatten)]
    pub kind: ShapeKind,
}

impl Shape {
    pub fn new(frame: Frame, anchor: Anchor, kind: ShapeKind) -> Self {
        Self {
            id: ShapeId::generate(),
            frame,
            anchor,
            kind,
        }
    }

    pub fn rectangle(frame: Frame) -> Self {
        Self::new(frame, Anchor::Page, ShapeKind::Rectangle(RectangleStyle::default()))
    }

    pub fn text_box(frame: Frame) -> Self {
        Self::new(frame, Anchor::Page, ShapeKind::TextBox(TextBoxStyle::default()))
    }

    pub fn image(frame: Frame, image_path: &str, aspect_ratio: f64) -> Self {
        Self::new(
            frame,
            Anchor::Page,
            ShapeKind::Image(ImageRef {
                image_path: image_path.to_string(),
                aspect_ratio,
                ..Default::default()
            }),
        )
    }

    /// Where the shape is drawn for a given resolved layout.
    pub fn effective_frame(&self, layout: &ResolvedLayout) -> Frame {
        match self.anchor {
            Anchor::Page => self.frame,
            Anchor::Table => Frame {
                y: layout.totals_start_y + self.frame.y,
                ..self.frame
            },
        }
    }

    /// Store an effective (page) frame back into the shape's own coordinates.
    pub fn set_effective_frame(&mut self, frame: Frame, layout: &ResolvedLayout) {
        self.frame = match self.anchor {
            Anchor::Page => frame,
            Anchor::Table => Frame {
                y: frame.y - layout.totals_start_y,
                ..frame
            },
        };
    }

    /// Change the anchor without moving the shape on the current layout.
    pub fn set_anchor(&mut self, anchor: Anchor, layout: &ResolvedLayout) {
        let effective = self.effective_frame(layout);
        self.anchor = anchor;
        self.set_effective_frame(effective, layout);
    }

    fn is_persistable(&self) -> bool {
        let f = &self.frame;
        [f.x, f.y, f.width, f.height].iter().all(|v| v.is_finite())
            && f.width >= MIN_SHAPE_SIZE
            && f.height >= MIN_SHAPE_SIZE
    }
}

/// Property-panel edits. Fields that do not apply to the shape's kind are
/// ignored; out-of-range values are clamped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShapePatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub border_color: Option<String>,
    pub border_width: Option<f64>,
    pub fill_color: Option<String>,
    pub fill_opacity: Option<f64>,
    pub text: Option<String>,
    pub font_size: Option<f64>,
    pub font_color: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub background_color: Option<String>,
    pub background_opacity: Option<f64>,
    pub opacity: Option<f64>,
}

fn unit(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}

impl ShapePatch {
    pub fn apply(&self, shape: &mut Shape) {
        let f = &mut shape.frame;
        if let Some(x) = self.x.filter(|v| v.is_finite()) {
            f.x = x;
        }
        if let Some(y) = self.y.filter(|v| v.is_finite()) {
            f.y = y;
        }
        if let Some(w) = self.width {
            f.width = w;
        }
        if let Some(h) = self.height {
            f.height = h;
        }
        shape.frame = shape.frame.with_min_size(MIN_SHAPE_SIZE);

        match &mut shape.kind {
            ShapeKind::Rectangle(style) => {
                if let Some(c) = &self.border_color {
                    style.border_color = c.clone();
                }
                if let Some(w) = self.border_width {
                    style.border_width = non_negative(w);
                }
                if let Some(c) = &self.fill_color {
                    style.fill_color = c.clone();
                }
                if let Some(o) = self.fill_opacity {
                    style.fill_opacity = unit(o);
                }
            }
            ShapeKind::TextBox(style) => {
                if let Some(t) = &self.text {
                    style.text = t.clone();
                }
                if let Some(size) = self.font_size.filter(|s| s.is_finite() && *s > 0.0) {
                    style.font_size = size;
                }
                if let Some(c) = &self.font_color {
                    style.font_color = c.clone();
                }
                if let Some(b) = self.bold {
                    style.bold = b;
                }
                if let Some(i) = self.italic {
                    style.italic = i;
                }
                if let Some(c) = &self.background_color {
                    style.background_color = c.clone();
                }
                if let Some(o) = self.background_opacity {
                    style.background_opacity = unit(o);
                }
            }
            ShapeKind::Image(image) => {
                if let Some(w) = self.border_width {
                    image.border_width = non_negative(w);
                }
                if let Some(c) = &self.border_color {
                    image.border_color = c.clone();
                }
                if let Some(o) = self.opacity {
                    image.opacity = unit(o);
                }
            }
        }
    }

    /// [`ShapePatch::apply`], then keep the shape's drawn frame on the page
    /// the same way a drag does.
    pub fn apply_on_page(&self, shape: &mut Shape, layout: &ResolvedLayout) {
        self.apply(shape);
        let mut frame = shape.effective_frame(layout);
        frame.width = frame.width.min(layout.page_width);
        frame.height = frame.height.min(layout.page_height);
        shape.set_effective_frame(frame.clamped_to_page(layout.page_width, layout.page_height), layout);
    }
}

/// The ordered shape collection. Later shapes draw on top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeCollection {
    shapes: Vec<Shape>,
}

impl ShapeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_shapes(shapes: Vec<Shape>) -> Self {
        Self { shapes }
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shape> {
        self.shapes.iter()
    }

    pub fn as_slice(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn get(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| &s.id == id)
    }

    pub fn get_mut(&mut self, id: &ShapeId) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|s| &s.id == id)
    }

    pub fn insert(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn remove(&mut self, id: &ShapeId) -> Option<Shape> {
        let index = self.shapes.iter().position(|s| &s.id == id)?;
        Some(self.shapes.remove(index))
    }

    pub fn retain(&mut self, keep: impl FnMut(&Shape) -> bool) {
        self.shapes.retain(keep);
    }

    /// Move a shape to the top of the draw order.
    pub fn bring_to_front(&mut self, id: &ShapeId) {
        if let Some(shape) = self.remove(id) {
            self.shapes.push(shape);
        }
    }

    /// The topmost shape whose effective frame contains `p`.
    pub fn hit_test(&self, p: Point, layout: &ResolvedLayout) -> Option<&Shape> {
        self.shapes
            .iter()
            .rev()
            .find(|s| s.effective_frame(layout).contains(p))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.shapes)
    }

    /// Parse a stored collection, dropping only the entries that are
    /// malformed or below the size floor.
    pub fn from_json_lenient(json: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(json) {
            Ok(v) => v,
            Err(e) => {
                warn!("Stored shapes are not valid JSON, starting empty: {}", e);
                return Self::new();
            }
        };
        let serde_json::Value::Array(entries) = value else {
            warn!("Stored shapes are not a JSON array, starting empty");
            return Self::new();
        };

        let shapes = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<Shape>(entry) {
                Ok(shape) if shape.is_persistable() => Some(shape),
                Ok(shape) => {
                    warn!("Dropping shape {} ({}): below minimum size", index, shape.id);
                    None
                }
                Err(e) => {
                    warn!("Dropping malformed shape {}: {}", index, e);
                    None
                }
            })
            .collect();
        Self { shapes }
    }

    /// Load the collection from the settings store.
    pub fn load(store: &dyn SettingsStore) -> Result<Self, SettingsError> {
        Ok(store
            .get(keys::CUSTOM_SHAPES)?
            .map(|json| Self::from_json_lenient(&json))
            .unwrap_or_default())
    }

    /// Write the collection to the settings store. Entries below the size
    /// floor are never written.
    pub fn save(&self, store: &mut dyn SettingsStore) -> Result<(), SettingsError> {
        let persistable: Vec<&Shape> = self.shapes.iter().filter(|s| s.is_persistable()).collect();
        let json = serde_json::to_string(&persistable)?;
        store.set(keys::CUSTOM_SHAPES, &json)
    }
}
