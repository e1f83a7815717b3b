//! # Interactive Editor
//!
//! The designer's model: tool selection, the pointer gesture state machine,
//! write-through persistence of every committed edit, the debounced live
//! preview, and a pixel display list for the host to paint.
//!
//! Pointer events arrive in surface pixels and are converted with
//! [`px_to_mm`] at the current zoom. Everything below that works in page
//! millimetres against the same [`ResolvedLayout`] the renderer uses, with
//! the sample invoice's row count.
//!
//! ```text
//!            Down (draw tool)        Up, both sides >= 5mm, Text tool
//!   Idle ─────────────────────▶ Drawing ─────────────────────▶ EditingText
//!    ▲  ╲ Down on shape/handle     │ Up                           │ commit/cancel
//!    │   ╲──────────▶ Moving │ Resizing ──Up──▶ Idle ◀────────────┘
//! ```

pub mod preview;

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{DocformError, Result};
use crate::font::FontContext;
use crate::geometry::{Frame, Point};
use crate::image_loader::image_dimensions;
use crate::layout::{
    header_lines, logo_frame, resolve, ResolvedLayout, BLOCK_LINE_PITCH, CONTENT_MARGIN,
};
use crate::model::sample_invoice;
use crate::render::{ComposedPage, DocumentRecord, DocumentRenderer, RenderOutput};
use crate::settings::{LayoutSettings, SettingsStore};
use crate::shapes::{
    handle_at, move_frame, resize_frame, Anchor, ResizeHandle, Shape, ShapeCollection, ShapeId,
    ShapeKind, ShapePatch, MIN_SHAPE_SIZE,
};
use crate::units::{mm_to_px, pt_to_mm, px_to_mm};

pub use preview::{PreviewScheduler, PreviewTicket, PREVIEW_DEBOUNCE_MS};

/// Pointer slop around a resize handle, in surface pixels.
pub const HANDLE_TOLERANCE_PX: f64 = 6.0;
/// Side length of a drawn resize handle, in surface pixels.
pub const HANDLE_SIZE_PX: f64 = 8.0;
/// Width of a freshly placed image shape.
pub const DEFAULT_IMAGE_WIDTH: f64 = 40.0;
pub const DEFAULT_SAMPLE_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Select,
    Rectangle,
    Text,
    Image,
}

/// The gesture in progress. Frames are effective (page) frames.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Idle,
    Drawing {
        tool: Tool,
        origin: Point,
        frame: Frame,
    },
    Moving {
        id: ShapeId,
        origin: Point,
        start: Frame,
    },
    Resizing {
        id: ShapeId,
        handle: ResizeHandle,
        origin: Point,
        start: Frame,
    },
    EditingText {
        id: ShapeId,
    },
}

/// A pointer event in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up { x: f64, y: f64 },
}

/// What a surface item depicts.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceKind {
    Page,
    Border,
    Logo { loaded: bool },
    HeaderText { text: String, bold: bool },
    Separator,
    /// The items table at the sample row count.
    TableGhost { rows: usize },
    Totals,
    Shape { id: ShapeId, kind: &'static str },
    ShapeText { id: ShapeId, text: String },
    /// An image shape whose image could not be loaded.
    ImagePlaceholder { id: ShapeId },
    /// The drag rectangle of a draw gesture.
    Provisional,
    Selection { id: ShapeId },
    Handle { handle: ResizeHandle },
}

/// One item of the editor display list. `frame` is in surface pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceItem {
    pub kind: SurfaceKind,
    pub frame: Frame,
}

pub struct Editor<S: SettingsStore> {
    renderer: DocumentRenderer<S>,
    settings: LayoutSettings,
    shapes: ShapeCollection,
    tool: Tool,
    gesture: Gesture,
    selected: Option<ShapeId>,
    zoom: f64,
    sample_rows: usize,
    scheduler: PreviewScheduler,
    preview: Option<RenderOutput>,
    fonts: FontContext,
}

impl<S: SettingsStore> Editor<S> {
    /// Load settings and shapes through `renderer`.
    pub fn open(mut renderer: DocumentRenderer<S>) -> Result<Self> {
        let settings = renderer.settings()?;
        let shapes = renderer.shapes()?;
        let fonts = *renderer.fonts();
        info!("Editor opened with {} shape(s)", shapes.len());
        Ok(Self {
            renderer,
            settings,
            shapes,
            tool: Tool::Select,
            gesture: Gesture::Idle,
            selected: None,
            zoom: 1.0,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            scheduler: PreviewScheduler::default(),
            preview: None,
            fonts,
        })
    }

    pub fn renderer(&self) -> &DocumentRenderer<S> {
        &self.renderer
    }

    /// Re-read settings and shapes from the store, dropping any gesture in
    /// progress and a selection whose shape no longer exists.
    pub fn reload(&mut self, now: Instant) -> Result<()> {
        self.renderer.invalidate();
        self.settings = self.renderer.settings()?;
        self.shapes = self.renderer.shapes()?;
        self.gesture = Gesture::Idle;
        if let Some(id) = &self.selected {
            if self.shapes.get(id).is_none() {
                self.selected = None;
            }
        }
        self.scheduler.request(now);
        info!("Editor reloaded with {} shape(s)", self.shapes.len());
        Ok(())
    }

    /// Replace stored settings from an export and reload the editor from
    /// the result. The editor is reloaded even when the import fails part
    /// way, so it always shows what the store holds.
    pub fn import_settings(&mut self, json: &str, now: Instant) -> Result<usize> {
        let imported = self.renderer.import_settings(json);
        self.reload(now)?;
        imported
    }

    pub fn export_settings(&self) -> Result<String> {
        self.renderer.export_settings()
    }

    /// Compose `record` with the stored settings and shapes.
    pub fn compose_record(&mut self, record: &dyn DocumentRecord, footer: &str) -> Result<ComposedPage> {
        self.renderer.compose_record(record, footer)
    }

    /// Compose the sample invoice the editor draws against.
    pub fn compose_preview(&mut self, footer: &str) -> Result<ComposedPage> {
        let sample = sample_invoice(self.sample_rows);
        self.renderer.compose_record(&sample, footer)
    }

    pub fn render_record(&mut self, record: &dyn DocumentRecord) -> Result<RenderOutput> {
        self.renderer.render_record(record)
    }

    /// Drop cached images, e.g. after files changed on disk.
    pub fn invalidate_cache(&mut self) {
        self.renderer.invalidate();
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn shapes(&self) -> &ShapeCollection {
        &self.shapes
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn selected(&self) -> Option<&ShapeId> {
        self.selected.as_ref()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn sample_rows(&self) -> usize {
        self.sample_rows
    }

    pub fn scheduler(&self) -> &PreviewScheduler {
        &self.scheduler
    }

    /// The geometry the editor draws against: the sample table's height.
    pub fn layout(&self) -> ResolvedLayout {
        resolve(&self.settings, self.sample_rows, self.settings.has_comments())
    }

    /// Switch tools. An unfinished draw or drag is abandoned.
    pub fn set_tool(&mut self, tool: Tool) {
        if !matches!(self.gesture, Gesture::Idle | Gesture::EditingText { .. }) {
            debug!("Abandoning {:?} on tool change", self.gesture);
        }
        self.tool = tool;
        self.gesture = Gesture::Idle;
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() && zoom > 0.0 {
            self.zoom = zoom;
        }
    }

    pub fn set_sample_rows(&mut self, rows: usize, now: Instant) {
        self.sample_rows = rows;
        self.scheduler.request(now);
    }

    pub fn select(&mut self, id: Option<ShapeId>) {
        self.selected = id.filter(|id| self.shapes.get(id).is_some());
    }

    fn to_mm(&self, x: f64, y: f64) -> Point {
        Point::new(px_to_mm(x, self.zoom), px_to_mm(y, self.zoom))
    }

    fn to_px(&self, frame: &Frame) -> Frame {
        Frame::new(
            mm_to_px(frame.x, self.zoom),
            mm_to_px(frame.y, self.zoom),
            mm_to_px(frame.width, self.zoom),
            mm_to_px(frame.height, self.zoom),
        )
    }

    /// Feed one pointer event. Moves are pure arithmetic; the store is only
    /// written when a gesture ends.
    pub fn handle_pointer(&mut self, event: PointerEvent, now: Instant) -> Result<()> {
        match event {
            PointerEvent::Down { x, y } => self.pointer_down(self.to_mm(x, y), now),
            PointerEvent::Move { x, y } => {
                self.pointer_move(self.to_mm(x, y));
                Ok(())
            }
            PointerEvent::Up { x, y } => self.pointer_up(self.to_mm(x, y), now),
        }
    }

    fn clamp_to_page(&self, p: Point) -> Point {
        let layout = self.layout();
        Point::new(
            p.x.clamp(0.0, layout.page_width),
            p.y.clamp(0.0, layout.page_height),
        )
    }

    fn pointer_down(&mut self, p: Point, now: Instant) -> Result<()> {
        if let Gesture::EditingText { .. } = self.gesture {
            self.end_text_edit(now)?;
        }

        match self.tool {
            Tool::Rectangle | Tool::Text => {
                let origin = self.clamp_to_page(p);
                self.gesture = Gesture::Drawing {
                    tool: self.tool,
                    origin,
                    frame: Frame::from_corners(origin, origin),
                };
            }
            Tool::Select => {
                let layout = self.layout();
                let tolerance = px_to_mm(HANDLE_TOLERANCE_PX, self.zoom);
                let on_handle = self.selected.as_ref().and_then(|id| {
                    let frame = self.shapes.get(id)?.effective_frame(&layout);
                    handle_at(&frame, p, tolerance).map(|h| (id.clone(), h, frame))
                });
                self.gesture = if let Some((id, handle, start)) = on_handle {
                    Gesture::Resizing {
                        id,
                        handle,
                        origin: p,
                        start,
                    }
                } else if let Some(shape) = self.shapes.hit_test(p, &layout) {
                    let id = shape.id.clone();
                    let start = shape.effective_frame(&layout);
                    self.selected = Some(id.clone());
                    Gesture::Moving { id, origin: p, start }
                } else {
                    self.selected = None;
                    Gesture::Idle
                };
            }
            // images are placed with `place_image`
            Tool::Image => {}
        }
        Ok(())
    }

    fn pointer_move(&mut self, p: Point) {
        let layout = self.layout();
        match &mut self.gesture {
            Gesture::Drawing { origin, frame, .. } => {
                let end = Point::new(
                    p.x.clamp(0.0, layout.page_width),
                    p.y.clamp(0.0, layout.page_height),
                );
                *frame = Frame::from_corners(*origin, end);
            }
            Gesture::Moving { id, origin, start } => {
                let moved = move_frame(
                    *start,
                    p.x - origin.x,
                    p.y - origin.y,
                    layout.page_width,
                    layout.page_height,
                );
                if let Some(shape) = self.shapes.get_mut(id) {
                    shape.set_effective_frame(moved, &layout);
                }
            }
            Gesture::Resizing {
                id,
                handle,
                origin,
                start,
            } => {
                let resized = resize_frame(
                    *start,
                    *handle,
                    p.x - origin.x,
                    p.y - origin.y,
                    layout.page_width,
                    layout.page_height,
                );
                if let Some(shape) = self.shapes.get_mut(id) {
                    shape.set_effective_frame(resized, &layout);
                }
            }
            Gesture::Idle | Gesture::EditingText { .. } => {}
        }
    }

    fn pointer_up(&mut self, p: Point, now: Instant) -> Result<()> {
        self.pointer_move(p);
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match gesture {
            Gesture::Drawing { tool, frame, .. } => {
                if frame.width < MIN_SHAPE_SIZE || frame.height < MIN_SHAPE_SIZE {
                    debug!(
                        "Discarding {:.1}x{:.1}mm draw below the {}mm minimum",
                        frame.width, frame.height, MIN_SHAPE_SIZE
                    );
                    return Ok(());
                }
                let shape = if tool == Tool::Text {
                    Shape::text_box(frame)
                } else {
                    Shape::rectangle(frame)
                };
                let id = shape.id.clone();
                self.shapes.insert(shape);
                self.selected = Some(id.clone());
                if tool == Tool::Text {
                    self.gesture = Gesture::EditingText { id };
                }
                self.persist_shapes(now)
            }
            Gesture::Moving { id, start, .. } | Gesture::Resizing { id, start, .. } => {
                let layout = self.layout();
                let changed = self
                    .shapes
                    .get(&id)
                    .is_some_and(|s| s.effective_frame(&layout) != start);
                if changed {
                    self.persist_shapes(now)
                } else {
                    Ok(())
                }
            }
            other => {
                self.gesture = other;
                Ok(())
            }
        }
    }

    /// Finish inline editing with `text`.
    pub fn commit_text(&mut self, text: &str, now: Instant) -> Result<()> {
        let Gesture::EditingText { id } = &self.gesture else {
            return Ok(());
        };
        if let Some(shape) = self.shapes.get_mut(id) {
            ShapePatch {
                text: Some(text.to_string()),
                ..Default::default()
            }
            .apply(shape);
        }
        self.gesture = Gesture::Idle;
        self.persist_shapes(now)
    }

    /// Leave inline editing, keeping the text box as it is.
    pub fn cancel_text_edit(&mut self) {
        if let Gesture::EditingText { .. } = self.gesture {
            self.gesture = Gesture::Idle;
        }
    }

    fn end_text_edit(&mut self, now: Instant) -> Result<()> {
        self.gesture = Gesture::Idle;
        self.persist_shapes(now)
    }

    /// Write the collection through and schedule a preview. On failure the
    /// in-memory collection is kept so the caller can retry.
    fn persist_shapes(&mut self, now: Instant) -> Result<()> {
        self.scheduler.request(now);
        self.renderer.save_shapes(&self.shapes).map_err(|e| {
            warn!("Saving shapes failed, keeping unsaved edits: {}", e);
            e
        })
    }

    /// Retry persisting after a failed save.
    pub fn save(&mut self, now: Instant) -> Result<()> {
        self.renderer.save_settings(&self.settings)?;
        self.persist_shapes(now)
    }

    pub fn delete_selected(&mut self, now: Instant) -> Result<bool> {
        let Some(id) = self.selected.take() else {
            return Ok(false);
        };
        if self.shapes.remove(&id).is_none() {
            return Ok(false);
        }
        if matches!(&self.gesture, Gesture::EditingText { id: editing } if *editing == id) {
            self.gesture = Gesture::Idle;
        }
        self.persist_shapes(now)?;
        Ok(true)
    }

    pub fn bring_to_front(&mut self, id: &ShapeId, now: Instant) -> Result<()> {
        self.shapes.bring_to_front(id);
        self.persist_shapes(now)
    }

    /// Re-anchor a shape without moving it on the editor page.
    pub fn set_anchor(&mut self, id: &ShapeId, anchor: Anchor, now: Instant) -> Result<()> {
        let layout = self.layout();
        let Some(shape) = self.shapes.get_mut(id) else {
            return Ok(());
        };
        shape.set_anchor(anchor, &layout);
        self.persist_shapes(now)
    }

    /// Property-panel edit of one shape. The result stays on the page.
    pub fn apply_patch(&mut self, id: &ShapeId, patch: &ShapePatch, now: Instant) -> Result<()> {
        let layout = self.layout();
        let Some(shape) = self.shapes.get_mut(id) else {
            return Ok(());
        };
        patch.apply_on_page(shape, &layout);
        self.persist_shapes(now)
    }

    /// Edit settings. Invalid results are rejected before anything changes;
    /// a failed write keeps the edit in memory and reports the error.
    pub fn update_settings(&mut self, edit: impl FnOnce(&mut LayoutSettings), now: Instant) -> Result<()> {
        let mut next = self.settings.clone();
        edit(&mut next);
        next.validate()?;
        self.settings = next;
        self.scheduler.request(now);
        self.renderer.save_settings(&self.settings)
    }

    /// Store a new logo and point the settings at it.
    pub fn set_logo(&mut self, filename: &str, bytes: &[u8], now: Instant) -> Result<()> {
        let name = self.renderer.image_store().save_new_image(filename, bytes)?;
        self.update_settings(|s| s.logo_path = Some(name), now)
    }

    /// Store an uploaded image and add it as an image shape centred on the
    /// page.
    pub fn place_image(&mut self, filename: &str, bytes: &[u8], now: Instant) -> Result<ShapeId> {
        let (width_px, height_px) = image_dimensions(bytes)?;
        if width_px == 0 || height_px == 0 {
            return Err(DocformError::Image(format!("{} has no pixels", filename)));
        }
        let aspect = height_px as f64 / width_px as f64;
        let name = self.renderer.image_store().save_new_image(filename, bytes)?;

        let layout = self.layout();
        let width = DEFAULT_IMAGE_WIDTH.min(layout.page_width).max(MIN_SHAPE_SIZE);
        let height = (width * aspect).min(layout.page_height).max(MIN_SHAPE_SIZE);
        let frame = Frame::new(
            (layout.page_width - width) / 2.0,
            (layout.page_height - height) / 2.0,
            width,
            height,
        );

        let shape = Shape::image(frame, &name, aspect);
        let id = shape.id.clone();
        self.shapes.insert(shape);
        self.selected = Some(id.clone());
        self.tool = Tool::Select;
        self.persist_shapes(now)?;
        Ok(id)
    }

    /// Render the sample invoice if the debounce window has passed. The
    /// result must go through [`Editor::deliver_preview`] to be shown.
    pub fn poll_preview(&mut self, now: Instant) -> Result<Option<(PreviewTicket, RenderOutput)>> {
        let Some(ticket) = self.scheduler.poll(now) else {
            return Ok(None);
        };
        let output = self.renderer.render_invoice(&sample_invoice(self.sample_rows))?;
        Ok(Some((ticket, output)))
    }

    /// Show a finished preview unless a newer request superseded it.
    pub fn deliver_preview(&mut self, ticket: PreviewTicket, output: RenderOutput) -> bool {
        let accepted = self.scheduler.accept(ticket);
        if accepted {
            self.preview = Some(output);
        }
        accepted
    }

    /// Poll and deliver in one step. Returns whether a new preview is shown.
    pub fn tick(&mut self, now: Instant) -> Result<bool> {
        match self.poll_preview(now)? {
            Some((ticket, output)) => Ok(self.deliver_preview(ticket, output)),
            None => Ok(false),
        }
    }

    pub fn preview(&self) -> Option<&RenderOutput> {
        self.preview.as_ref()
    }

    fn item(&self, kind: SurfaceKind, frame: Frame) -> SurfaceItem {
        SurfaceItem {
            kind,
            frame: self.to_px(&frame),
        }
    }

    /// The editor display list in surface pixels, back to front.
    pub fn surface(&mut self) -> Vec<SurfaceItem> {
        let layout = self.layout();
        let mut items = vec![
            self.item(
                SurfaceKind::Page,
                Frame::new(0.0, 0.0, layout.page_width, layout.page_height),
            ),
            self.item(SurfaceKind::Border, layout.border_frame()),
        ];

        if let Some(logo) = self.settings.logo_path.clone() {
            let image = self.renderer.image(&logo);
            let aspect = image.as_ref().map_or(1.0, |i| i.aspect_ratio());
            items.push(self.item(
                SurfaceKind::Logo {
                    loaded: image.is_some(),
                },
                logo_frame(&self.settings, aspect),
            ));
        }

        for line in header_lines(&self.settings, &self.fonts) {
            let frame = line.frame();
            items.push(self.item(
                SurfaceKind::HeaderText {
                    text: line.text,
                    bold: line.bold,
                },
                frame,
            ));
        }

        items.push(self.item(
            SurfaceKind::Separator,
            Frame::new(CONTENT_MARGIN, layout.line_y, layout.content_width(), 0.0),
        ));
        items.push(self.item(
            SurfaceKind::TableGhost {
                rows: self.sample_rows,
            },
            layout.table_frame(),
        ));
        items.push(self.item(
            SurfaceKind::Totals,
            Frame::new(
                CONTENT_MARGIN,
                layout.totals_start_y,
                layout.content_width(),
                4.0 * BLOCK_LINE_PITCH,
            ),
        ));

        let shapes: Vec<Shape> = self.shapes.iter().cloned().collect();
        for shape in &shapes {
            let frame = shape.effective_frame(&layout);
            items.push(self.item(
                SurfaceKind::Shape {
                    id: shape.id.clone(),
                    kind: shape.kind.name(),
                },
                frame,
            ));
            match &shape.kind {
                ShapeKind::TextBox(style) => {
                    let size = pt_to_mm(style.font_size);
                    for line in style.lines(&frame, &self.fonts) {
                        let width = self.fonts.measure_mm(&line.text, style.font_key(), style.font_size);
                        let line_frame = Frame::new(line.x, line.baseline_y - size * 0.8, width, size);
                        items.push(self.item(
                            SurfaceKind::ShapeText {
                                id: shape.id.clone(),
                                text: line.text,
                            },
                            line_frame,
                        ));
                    }
                }
                ShapeKind::Image(image_ref) => {
                    if self.renderer.image(&image_ref.image_path).is_none() {
                        items.push(self.item(SurfaceKind::ImagePlaceholder { id: shape.id.clone() }, frame));
                    }
                }
                ShapeKind::Rectangle(_) => {}
            }
        }

        if let Gesture::Drawing { frame, .. } = &self.gesture {
            items.push(self.item(SurfaceKind::Provisional, *frame));
        }

        if let Some(shape) = self.selected.as_ref().and_then(|id| self.shapes.get(id)) {
            let frame = shape.effective_frame(&layout);
            items.push(self.item(SurfaceKind::Selection { id: shape.id.clone() }, frame));
            for handle in ResizeHandle::ALL {
                let center = handle.position(&frame);
                let x = mm_to_px(center.x, self.zoom);
                let y = mm_to_px(center.y, self.zoom);
                items.push(SurfaceItem {
                    kind: SurfaceKind::Handle { handle },
                    frame: Frame::new(
                        x - HANDLE_SIZE_PX / 2.0,
                        y - HANDLE_SIZE_PX / 2.0,
                        HANDLE_SIZE_PX,
                        HANDLE_SIZE_PX,
                    ),
                });
            }
        }

        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;
    use crate::storage::ImageStore;
    use std::time::Duration;

    fn editor() -> (tempfile::TempDir, Editor<MemoryStore>) {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageStore::open(dir.path()).unwrap();
        let editor = Editor::open(DocumentRenderer::new(MemoryStore::new(), images)).unwrap();
        (dir, editor)
    }

    /// Millimetres to surface pixels at zoom 1.
    fn px(mm: f64) -> f64 {
        mm_to_px(mm, 1.0)
    }

    fn drag(editor: &mut Editor<MemoryStore>, from: (f64, f64), to: (f64, f64), now: Instant) -> Result<()> {
        editor.handle_pointer(PointerEvent::Down { x: px(from.0), y: px(from.1) }, now)?;
        editor.handle_pointer(PointerEvent::Move { x: px(to.0), y: px(to.1) }, now)?;
        editor.handle_pointer(PointerEvent::Up { x: px(to.0), y: px(to.1) }, now)
    }

    #[test]
    fn test_draw_commits_normalized_rectangle() {
        let (_dir, mut editor) = editor();
        let now = Instant::now();
        editor.set_tool(Tool::Rectangle);
        drag(&mut editor, (60.0, 80.0), (20.0, 50.0), now).unwrap();

        assert_eq!(editor.shapes().len(), 1);
        let shape = editor.shapes().iter().next().unwrap();
        assert!((shape.frame.x - 20.0).abs() < 1e-6);
        assert!((shape.frame.y - 50.0).abs() < 1e-6);
        assert!((shape.frame.width - 40.0).abs() < 1e-6);
        assert_eq!(editor.gesture(), &Gesture::Idle);

        let stored = ShapeCollection::load(editor.renderer().store()).unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn test_tiny_draw_is_discarded() {
        let (_dir, mut editor) = editor();
        editor.set_tool(Tool::Rectangle);
        drag(&mut editor, (20.0, 20.0), (24.0, 60.0), Instant::now()).unwrap();
        assert!(editor.shapes().is_empty());
        assert!(ShapeCollection::load(editor.renderer().store()).unwrap().is_empty());
    }

    #[test]
    fn test_text_tool_enters_editing() {
        let (_dir, mut editor) = editor();
        let now = Instant::now();
        editor.set_tool(Tool::Text);
        drag(&mut editor, (20.0, 20.0), (80.0, 35.0), now).unwrap();
        let id = match editor.gesture() {
            Gesture::EditingText { id } => id.clone(),
            other => panic!("expected text editing, got {:?}", other),
        };
        editor.commit_text("Thank you!", now).unwrap();
        assert_eq!(editor.gesture(), &Gesture::Idle);
        match &editor.shapes().get(&id).unwrap().kind {
            ShapeKind::TextBox(style) => assert_eq!(style.text, "Thank you!"),
            other => panic!("expected text box, got {}", other.name()),
        }
    }

    #[test]
    fn test_move_is_clamped_and_persisted_on_up() {
        let (_dir, mut editor) = editor();
        let now = Instant::now();
        editor.set_tool(Tool::Rectangle);
        drag(&mut editor, (20.0, 20.0), (40.0, 30.0), now).unwrap();
        editor.set_tool(Tool::Select);

        editor.handle_pointer(PointerEvent::Down { x: px(30.0), y: px(25.0) }, now).unwrap();
        editor.handle_pointer(PointerEvent::Move { x: px(500.0), y: px(25.0) }, now).unwrap();
        let moved = editor.shapes().iter().next().unwrap().frame;
        assert!((moved.right() - 210.0).abs() < 1e-6);

        // not yet written
        let stored = ShapeCollection::load(editor.renderer().store()).unwrap();
        assert!((stored.iter().next().unwrap().frame.x - 20.0).abs() < 1e-6);

        editor.handle_pointer(PointerEvent::Up { x: px(500.0), y: px(25.0) }, now).unwrap();
        let stored = ShapeCollection::load(editor.renderer().store()).unwrap();
        assert!((stored.iter().next().unwrap().frame.right() - 210.0).abs() < 1e-6);
    }

    #[test]
    fn test_resize_via_handle_respects_minimum() {
        let (_dir, mut editor) = editor();
        let now = Instant::now();
        editor.set_tool(Tool::Rectangle);
        drag(&mut editor, (20.0, 20.0), (60.0, 40.0), now).unwrap();
        editor.set_tool(Tool::Select);

        // bottom-right handle of the selected shape, dragged far up-left
        drag(&mut editor, (60.0, 40.0), (0.0, 0.0), now).unwrap();
        let frame = editor.shapes().iter().next().unwrap().frame;
        assert!((frame.width - MIN_SHAPE_SIZE).abs() < 1e-6);
        assert!((frame.height - MIN_SHAPE_SIZE).abs() < 1e-6);
        assert!((frame.x - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_table_anchored_shape_moves_with_sample_rows() {
        let (_dir, mut editor) = editor();
        let now = Instant::now();
        editor.set_tool(Tool::Rectangle);
        drag(&mut editor, (20.0, 150.0), (60.0, 160.0), now).unwrap();
        let id = editor.selected().unwrap().clone();
        editor.set_anchor(&id, Anchor::Table, now).unwrap();

        let before = editor.shapes().get(&id).unwrap().effective_frame(&editor.layout());
        assert!((before.y - 150.0).abs() < 1e-6);
        editor.set_sample_rows(10, now);
        let after = editor.shapes().get(&id).unwrap().effective_frame(&editor.layout());
        assert!(after.y > before.y);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let (_dir, mut editor) = editor();
        let err = editor.update_settings(|s| s.font_size_body = 0.0, Instant::now());
        assert!(err.is_err());
        assert_eq!(editor.settings().font_size_body, 10.0);
    }

    #[test]
    fn test_import_reloads_editor_geometry() {
        let (_dir, mut editor) = editor();
        let before = editor.layout();
        let count = editor
            .import_settings(r#"{"header_y":"60","company_comments":"GSTIN X"}"#, Instant::now())
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(editor.settings().header_y, 60.0);
        assert_eq!(editor.settings().comments, "GSTIN X");

        let layout = editor.layout();
        assert!(layout.line_y > before.line_y);
        assert_eq!(layout, editor.compose_preview("").unwrap().layout);
        assert!(editor.scheduler().is_pending());
    }

    #[test]
    fn test_imported_shapes_survive_the_next_edit() {
        let (_dir, mut editor) = editor();
        let now = Instant::now();
        editor.set_tool(Tool::Rectangle);
        drag(&mut editor, (20.0, 20.0), (60.0, 40.0), now).unwrap();
        assert!(editor.selected().is_some());

        let imported = Shape::text_box(Frame::new(30.0, 200.0, 50.0, 12.0));
        let imported_id = imported.id.clone();
        let shapes_json = ShapeCollection::from_shapes(vec![imported]).to_json().unwrap();
        let export = serde_json::json!({ "custom_shapes": shapes_json }).to_string();
        editor.import_settings(&export, now).unwrap();

        assert_eq!(editor.shapes().len(), 1);
        assert!(editor.shapes().get(&imported_id).is_some());
        assert!(editor.selected().is_none());

        drag(&mut editor, (100.0, 100.0), (140.0, 130.0), now).unwrap();
        let stored = ShapeCollection::load(editor.renderer().store()).unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.get(&imported_id).is_some());
    }

    #[test]
    fn test_failed_import_leaves_editor_matching_store() {
        let (_dir, mut editor) = editor();
        let now = Instant::now();
        editor.update_settings(|s| s.header_y = 40.0, now).unwrap();
        assert!(editor.import_settings("not json", now).is_err());
        assert_eq!(editor.settings().header_y, 40.0);
        assert_eq!(editor.layout(), editor.compose_preview("").unwrap().layout);
    }

    #[test]
    fn test_patch_cannot_push_shape_off_page() {
        let (_dir, mut editor) = editor();
        let now = Instant::now();
        editor.set_tool(Tool::Rectangle);
        drag(&mut editor, (20.0, 20.0), (60.0, 40.0), now).unwrap();
        let id = editor.selected().unwrap().clone();

        let patch = ShapePatch {
            x: Some(500.0),
            ..Default::default()
        };
        editor.apply_patch(&id, &patch, now).unwrap();
        let layout = editor.layout();
        let frame = editor.shapes().get(&id).unwrap().effective_frame(&layout);
        assert!((frame.right() - layout.page_width).abs() < 1e-9);

        let stored = ShapeCollection::load(editor.renderer().store()).unwrap();
        assert_eq!(stored.get(&id).unwrap().frame, editor.shapes().get(&id).unwrap().frame);
    }

    #[test]
    fn test_preview_debounced_and_superseded() {
        let (_dir, mut editor) = editor();
        let t0 = Instant::now();
        editor.update_settings(|s| s.company_name = "A".to_string(), t0).unwrap();
        editor
            .update_settings(|s| s.company_name = "AB".to_string(), t0 + Duration::from_millis(200))
            .unwrap();
        assert!(editor.poll_preview(t0 + Duration::from_millis(700)).unwrap().is_none());

        let (stale, output) = editor.poll_preview(t0 + Duration::from_millis(1000)).unwrap().unwrap();
        editor
            .update_settings(|s| s.company_name = "ABC".to_string(), t0 + Duration::from_millis(1100))
            .unwrap();
        assert!(!editor.deliver_preview(stale, output));
        assert!(editor.preview().is_none());

        assert!(editor.tick(t0 + Duration::from_millis(1900)).unwrap());
        assert!(editor.preview().unwrap().bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_surface_lists_selection_handles() {
        let (_dir, mut editor) = editor();
        editor.set_zoom(2.0);
        editor.set_tool(Tool::Rectangle);
        let now = Instant::now();
        editor
            .handle_pointer(PointerEvent::Down { x: mm_to_px(20.0, 2.0), y: mm_to_px(20.0, 2.0) }, now)
            .unwrap();
        editor
            .handle_pointer(PointerEvent::Up { x: mm_to_px(50.0, 2.0), y: mm_to_px(40.0, 2.0) }, now)
            .unwrap();

        let items = editor.surface();
        let handles = items
            .iter()
            .filter(|i| matches!(i.kind, SurfaceKind::Handle { .. }))
            .count();
        assert_eq!(handles, 8);
        let page = &items[0];
        assert_eq!(page.kind, SurfaceKind::Page);
        assert!((page.frame.width - mm_to_px(210.0, 2.0)).abs() < 1e-9);
        let shape = items
            .iter()
            .find(|i| matches!(i.kind, SurfaceKind::Shape { .. }))
            .unwrap();
        assert!((shape.frame.x - mm_to_px(20.0, 2.0)).abs() < 1e-6);
    }
}
