//! # Document Renderer
//!
//! Composes a page display list from settings, custom shapes and a record,
//! then hands it to the PDF writer. Every position comes from
//! [`crate::layout`], the same code the editor draws with.
//!
//! Paint order for a record page:
//!
//! 1. page border
//! 2. logo
//! 3. company header block
//! 4. separator, party block, meta block
//! 5. items table
//! 6. totals block and amount in words
//! 7. custom shapes (table-anchored ones against the real table height)
//! 8. footer

pub mod display;
pub mod pricing;
pub mod record;
pub mod words;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::cache::RenderCache;
use crate::error::Result;
use crate::font::{FontContext, FontKey};
use crate::geometry::{Frame, Point};
use crate::image_loader::LoadedImage;
use crate::layout::{
    column_frames, header_lines, logo_frame, resolve, ColumnSpec, ResolvedLayout, BLOCK_LINE_PITCH,
    CONTENT_MARGIN, TABLE_FONT_SIZE,
};
use crate::model::{Invoice, ListReport, PurchaseOrder};
use crate::pdf::{Metadata, PdfWriter};
use crate::settings::{LayoutSettings, SettingsStore};
use crate::shapes::{Shape, ShapeCollection, ShapeId, ShapeKind};
use crate::storage::ImageStore;
use crate::style::{Color, Stroke};
use crate::units::px_to_mm;

pub use display::{DrawCommand, Fill, LayoutPage};
pub use record::{format_amount, format_money, DocumentRecord, LabeledValue, RecordTable};

const BORDER_STROKE_WIDTH: f64 = 0.3;
const SEPARATOR_STROKE_WIDTH: f64 = 0.4;
const TABLE_STROKE_WIDTH: f64 = 0.2;
const BLOCK_FONT_SIZE: f64 = 9.0;
const TITLE_FONT_SIZE: f64 = 12.0;
const FOOTER_FONT_SIZE: f64 = 7.0;
/// Width of the totals block, anchored at the right content edge.
const TOTALS_WIDTH: f64 = 75.0;

/// Where composition gets decoded images from.
pub trait ImageSource {
    fn image(&mut self, name: &str) -> Option<Arc<LoadedImage>>;
}

/// No images at all; every image is treated as unavailable.
pub struct NoImages;

impl ImageSource for NoImages {
    fn image(&mut self, _name: &str) -> Option<Arc<LoadedImage>> {
        None
    }
}

impl ImageSource for HashMap<String, Arc<LoadedImage>> {
    fn image(&mut self, name: &str) -> Option<Arc<LoadedImage>> {
        self.get(name).cloned()
    }
}

/// Images read through the render cache from an image store.
pub struct CachedImages<'a> {
    pub cache: &'a mut RenderCache,
    pub store: &'a ImageStore,
}

impl ImageSource for CachedImages<'_> {
    fn image(&mut self, name: &str) -> Option<Arc<LoadedImage>> {
        self.cache.image(name, self.store)
    }
}

/// A composed record page plus the geometry it was built from.
#[derive(Debug, Clone)]
pub struct ComposedPage {
    pub page: LayoutPage,
    pub layout: ResolvedLayout,
    /// Effective frame of every shape, in collection order.
    pub shape_frames: Vec<(ShapeId, Frame)>,
}

/// Bytes plus human-readable size and timing, for the caller's status line.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub bytes: Vec<u8>,
    pub size: String,
    pub elapsed: String,
    pub page_count: usize,
}

/// `512 B`, `12.3 KB`, `1.4 MB`.
pub fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

/// Footer text with the current local time.
pub fn generated_footer() -> String {
    format!("Generated on {}", chrono::Local::now().format("%d %b %Y %H:%M"))
}

/// Compose a single record page.
///
/// `footer` is drawn as given; no clock is read here, so identical inputs
/// compose identical pages.
pub fn compose(
    settings: &LayoutSettings,
    shapes: &ShapeCollection,
    record: &dyn DocumentRecord,
    images: &mut dyn ImageSource,
    fonts: &FontContext,
    footer: &str,
) -> ComposedPage {
    let layout = resolve(settings, record.row_count(), settings.has_comments());
    let mut page = LayoutPage::new(layout.page_width, layout.page_height);

    draw_letterhead(&mut page, settings, &layout, images, fonts);
    draw_party_and_meta(&mut page, record, &layout, fonts);

    let table = record.table();
    draw_table(&mut page, &layout, &table.columns, &table.rows, &table.footer, fonts);
    draw_totals(&mut page, record, &layout, fonts);

    if !layout.fits_page() {
        warn!(
            "Items table with {} rows runs past the page footer ({:.1}mm > {:.1}mm)",
            record.row_count(),
            layout.totals_start_y,
            layout.footer_baseline()
        );
    }

    let mut shape_frames = Vec::with_capacity(shapes.len());
    for shape in shapes.iter() {
        let frame = shape.effective_frame(&layout);
        draw_shape(&mut page, shape, frame, images, fonts);
        shape_frames.push((shape.id.clone(), frame));
    }

    page.text(
        CONTENT_MARGIN,
        layout.footer_baseline(),
        footer,
        FontKey::REGULAR,
        FOOTER_FONT_SIZE,
        Color::GREY,
    );

    ComposedPage {
        page,
        layout,
        shape_frames,
    }
}

/// Border, logo, company block and separator: everything above the
/// content area.
fn draw_letterhead(
    page: &mut LayoutPage,
    settings: &LayoutSettings,
    layout: &ResolvedLayout,
    images: &mut dyn ImageSource,
    fonts: &FontContext,
) {
    page.rect(
        layout.border_frame(),
        None,
        Some(Stroke::new(Color::BLACK, BORDER_STROKE_WIDTH)),
    );

    if let Some(logo) = settings.logo_path.as_deref() {
        match images.image(logo) {
            Some(image) => {
                let frame = logo_frame(settings, image.aspect_ratio());
                page.push(DrawCommand::Image {
                    frame,
                    image,
                    opacity: 1.0,
                });
            }
            None => warn!("Logo {} could not be loaded, omitted", logo),
        }
    }

    for line in header_lines(settings, fonts) {
        let font = if line.bold { FontKey::BOLD } else { FontKey::REGULAR };
        page.text(line.x, line.baseline_y, &line.text, font, line.font_size, Color::BLACK);
    }

    page.line(
        Point::new(CONTENT_MARGIN, layout.line_y),
        Point::new(layout.page_width - CONTENT_MARGIN, layout.line_y),
        Stroke::new(Color::BLACK, SEPARATOR_STROKE_WIDTH),
    );
}

/// Lines available in the party and meta blocks.
const META_LINES: usize = 5;

fn draw_party_and_meta(
    page: &mut LayoutPage,
    record: &dyn DocumentRecord,
    layout: &ResolvedLayout,
    fonts: &FontContext,
) {
    let half_width = layout.content_width() / 2.0;

    page.text(
        CONTENT_MARGIN,
        layout.meta_baseline(0),
        record.party_heading(),
        FontKey::BOLD,
        BLOCK_FONT_SIZE,
        Color::BLACK,
    );
    for (i, line) in record.party().lines().iter().take(META_LINES - 1).enumerate() {
        let key = if i == 0 { FontKey::BOLD } else { FontKey::REGULAR };
        let text = fonts.fit_to_width(line, key, BLOCK_FONT_SIZE, half_width - 2.0);
        page.text(CONTENT_MARGIN, layout.meta_baseline(i + 1), &text, key, BLOCK_FONT_SIZE, Color::BLACK);
    }

    let right = layout.page_width - CONTENT_MARGIN;
    let title = record.title();
    let title_width = fonts.measure_mm(&title, FontKey::BOLD, TITLE_FONT_SIZE);
    page.text(
        right - title_width,
        layout.meta_baseline(0),
        &title,
        FontKey::BOLD,
        TITLE_FONT_SIZE,
        Color::BLACK,
    );

    let label_x = CONTENT_MARGIN + half_width + 10.0;
    for (i, item) in record.meta().iter().take(META_LINES - 1).enumerate() {
        let baseline = layout.meta_baseline(i + 1);
        page.text(label_x, baseline, &item.label, FontKey::BOLD, BLOCK_FONT_SIZE, Color::BLACK);
        let width = fonts.measure_mm(&item.value, FontKey::REGULAR, BLOCK_FONT_SIZE);
        page.text(right - width, baseline, &item.value, FontKey::REGULAR, BLOCK_FONT_SIZE, Color::BLACK);
    }
}

/// Header row, item rows and a footer row, outlined by
/// [`ResolvedLayout::table_frame`] so the editor ghost and the PDF agree.
fn draw_table(
    page: &mut LayoutPage,
    layout: &ResolvedLayout,
    columns: &[ColumnSpec],
    rows: &[Vec<String>],
    footer: &[String],
    fonts: &FontContext,
) {
    let frames = column_frames(columns, layout);
    let outline = layout.table_frame();
    let row_height = layout.table_row_height;
    let left = outline.x;
    let right = outline.right();
    let rule = Stroke::new(Color::BLACK, TABLE_STROKE_WIDTH);

    let draw_cells = |page: &mut LayoutPage, row_top: f64, cells: &[String], key: FontKey| {
        let baseline = layout.row_baseline(row_top);
        for (frame, cell) in frames.iter().zip(cells) {
            let text = fonts.fit_to_width(cell, key, TABLE_FONT_SIZE, frame.inner_width());
            let width = fonts.measure_mm(&text, key, TABLE_FONT_SIZE);
            page.text(frame.text_x(width), baseline, &text, key, TABLE_FONT_SIZE, Color::BLACK);
        }
    };

    let header_top = layout.row_top(0);
    page.rect(
        Frame::new(left, header_top, right - left, row_height),
        Some(Fill::solid(Color::LIGHT_GREY)),
        None,
    );
    let headers: Vec<String> = columns.iter().map(|c| c.header.clone()).collect();
    draw_cells(page, header_top, &headers, FontKey::BOLD);
    page.line(
        Point::new(left, header_top + row_height),
        Point::new(right, header_top + row_height),
        rule,
    );

    for (i, row) in rows.iter().enumerate() {
        draw_cells(page, layout.row_top(i + 1), row, FontKey::REGULAR);
    }

    let footer_top = layout.row_top(rows.len() + 1);
    page.line(Point::new(left, footer_top), Point::new(right, footer_top), rule);
    draw_cells(page, footer_top, footer, FontKey::BOLD);

    page.rect(outline, None, Some(rule));
    for frame in frames.iter().skip(1) {
        page.line(Point::new(frame.x, outline.y), Point::new(frame.x, outline.bottom()), rule);
    }
}

fn draw_totals(page: &mut LayoutPage, record: &dyn DocumentRecord, layout: &ResolvedLayout, fonts: &FontContext) {
    let right = layout.page_width - CONTENT_MARGIN;
    let label_x = right - TOTALS_WIDTH;

    let totals = record.totals();
    for (i, item) in totals.iter().enumerate() {
        let baseline = layout.totals_baseline(i);
        let key = if item.emphasized { FontKey::BOLD } else { FontKey::REGULAR };
        page.text(label_x, baseline, &item.label, key, BLOCK_FONT_SIZE, Color::BLACK);
        let width = fonts.measure_mm(&item.value, key, BLOCK_FONT_SIZE);
        page.text(right - width, baseline, &item.value, key, BLOCK_FONT_SIZE, Color::BLACK);
    }

    // amount in words and notes share the left side of the totals block
    let words_width = (label_x - CONTENT_MARGIN - 5.0).max(20.0);
    let mut line_index = 0;
    for (text, key) in [
        (record.amount_in_words(), FontKey::new(false, true)),
        (record.notes(), FontKey::REGULAR),
    ] {
        let Some(text) = text else { continue };
        for line in fonts.wrap(&text, key, BLOCK_FONT_SIZE, words_width) {
            page.text(CONTENT_MARGIN, layout.totals_baseline(line_index), &line, key, BLOCK_FONT_SIZE, Color::BLACK);
            line_index += 1;
        }
    }
}

/// Draw one custom shape at its effective frame.
pub fn draw_shape(
    page: &mut LayoutPage,
    shape: &Shape,
    frame: Frame,
    images: &mut dyn ImageSource,
    fonts: &FontContext,
) {
    match &shape.kind {
        ShapeKind::Rectangle(style) => {
            let fill = (style.fill_opacity > 0.0).then(|| Fill {
                color: Color::hex_or(&style.fill_color, Color::WHITE),
                opacity: style.fill_opacity,
            });
            let stroke = border_stroke(&style.border_color, style.border_width);
            if fill.is_some() || stroke.is_some() {
                page.rect(frame, fill, stroke);
            }
        }
        ShapeKind::TextBox(style) => {
            if style.background_opacity > 0.0 {
                page.rect(
                    frame,
                    Some(Fill {
                        color: Color::hex_or(&style.background_color, Color::WHITE),
                        opacity: style.background_opacity,
                    }),
                    None,
                );
            }
            let color = Color::hex_or(&style.font_color, Color::BLACK);
            for line in style.lines(&frame, fonts) {
                page.text(line.x, line.baseline_y, &line.text, style.font_key(), style.font_size, color);
            }
        }
        ShapeKind::Image(image_ref) => {
            match images.image(&image_ref.image_path) {
                Some(image) => page.push(DrawCommand::Image {
                    frame,
                    image,
                    opacity: image_ref.opacity,
                }),
                None => warn!(
                    "Image {} for shape {} could not be loaded, omitted",
                    image_ref.image_path, shape.id
                ),
            }
            if let Some(stroke) = border_stroke(&image_ref.border_color, image_ref.border_width) {
                page.rect(frame, None, Some(stroke));
            }
        }
    }
}

/// Border widths are stored in CSS pixels.
fn border_stroke(color: &str, width_px: f64) -> Option<Stroke> {
    (width_px > 0.0).then(|| Stroke::new(Color::hex_or(color, Color::BLACK), px_to_mm(width_px, 1.0)))
}

/// Rows that fit on one report page below `layout.table_start_y`, leaving
/// room for the header and footer rows.
fn report_rows_per_page(layout: &ResolvedLayout) -> usize {
    let available = layout.footer_baseline() - BLOCK_LINE_PITCH - layout.table_start_y;
    let rows = (available / layout.table_row_height).floor() as i64 - 2;
    rows.max(1) as usize
}

/// Compose a paginated list report. Every page repeats the letterhead and
/// the column header; the last page's footer row carries the record count.
pub fn compose_list_report(
    settings: &LayoutSettings,
    report: &ListReport,
    images: &mut dyn ImageSource,
    fonts: &FontContext,
    footer: &str,
) -> Vec<LayoutPage> {
    let has_comments = settings.has_comments();
    let per_page = report_rows_per_page(&resolve(settings, 0, has_comments));
    let chunks: Vec<&[Vec<String>]> = if report.rows.is_empty() {
        vec![&report.rows[..]]
    } else {
        report.rows.chunks(per_page).collect()
    };
    let total_pages = chunks.len();

    chunks
        .iter()
        .enumerate()
        .map(|(index, rows)| {
            let layout = resolve(settings, rows.len(), has_comments);
            let mut page = LayoutPage::new(layout.page_width, layout.page_height);
            draw_letterhead(&mut page, settings, &layout, images, fonts);

            page.text(
                CONTENT_MARGIN,
                layout.meta_baseline(0),
                &report.title,
                FontKey::BOLD,
                TITLE_FONT_SIZE,
                Color::BLACK,
            );
            if let Some(subtitle) = report.subtitle.as_deref() {
                page.text(
                    CONTENT_MARGIN,
                    layout.meta_baseline(1),
                    subtitle,
                    FontKey::REGULAR,
                    BLOCK_FONT_SIZE,
                    Color::GREY,
                );
            }

            let footer_row = footer_cells(report.columns.len(), || {
                if index + 1 == total_pages {
                    format!("Total records: {}", report.rows.len())
                } else {
                    "Continued...".to_string()
                }
            });
            draw_table(&mut page, &layout, &report.columns, rows, &footer_row, fonts);

            page.text(
                CONTENT_MARGIN,
                layout.footer_baseline(),
                footer,
                FontKey::REGULAR,
                FOOTER_FONT_SIZE,
                Color::GREY,
            );
            let number = format!("Page {} of {}", index + 1, total_pages);
            let width = fonts.measure_mm(&number, FontKey::REGULAR, FOOTER_FONT_SIZE);
            page.text(
                layout.page_width - CONTENT_MARGIN - width,
                layout.footer_baseline(),
                &number,
                FontKey::REGULAR,
                FOOTER_FONT_SIZE,
                Color::GREY,
            );
            page
        })
        .collect()
}

/// A footer row with `text` in the widest useful cell: the second column
/// when there is one.
fn footer_cells(columns: usize, text: impl FnOnce() -> String) -> Vec<String> {
    let mut cells = vec![String::new(); columns];
    if let Some(cell) = cells.get_mut(1.min(columns.saturating_sub(1))) {
        *cell = text();
    }
    cells
}

/// Owns the settings store, the image store and the render cache, and
/// exposes the render entry points.
pub struct DocumentRenderer<S: SettingsStore> {
    store: S,
    images: ImageStore,
    cache: RenderCache,
    fonts: FontContext,
    writer: PdfWriter,
}

impl<S: SettingsStore> DocumentRenderer<S> {
    pub fn new(store: S, images: ImageStore) -> Self {
        Self {
            store,
            images,
            cache: RenderCache::new(),
            fonts: FontContext::new(),
            writer: PdfWriter::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn image_store(&self) -> &ImageStore {
        &self.images
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    pub fn fonts(&self) -> &FontContext {
        &self.fonts
    }

    /// Settings as of the last save, served from the cache.
    pub fn settings(&mut self) -> Result<LayoutSettings> {
        Ok(self.cache.snapshot(&self.store)?.settings.clone())
    }

    pub fn shapes(&mut self) -> Result<ShapeCollection> {
        Ok(self.cache.snapshot(&self.store)?.shapes.clone())
    }

    /// Persist settings and invalidate the caches. The caches are dropped
    /// even when the write fails, so the next render rereads the store.
    pub fn save_settings(&mut self, settings: &LayoutSettings) -> Result<()> {
        let result = settings.save(&mut self.store);
        self.cache.invalidate();
        Ok(result?)
    }

    pub fn save_shapes(&mut self, shapes: &ShapeCollection) -> Result<()> {
        let result = shapes.save(&mut self.store);
        self.cache.invalidate();
        Ok(result?)
    }

    /// Replace stored settings from an export. Returns the number of keys.
    pub fn import_settings(&mut self, json: &str) -> Result<usize> {
        let result = crate::settings::import_settings_json(&mut self.store, json);
        self.cache.invalidate();
        Ok(result?)
    }

    pub fn export_settings(&self) -> Result<String> {
        Ok(crate::settings::export_settings_json(&self.store)?)
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    /// Decoded image from the store, through the cache.
    pub fn image(&mut self, name: &str) -> Option<Arc<LoadedImage>> {
        self.cache.image(name, &self.images)
    }

    /// Compose a record page from the current settings and shapes.
    pub fn compose_record(&mut self, record: &dyn DocumentRecord, footer: &str) -> Result<ComposedPage> {
        let snapshot = self.cache.snapshot(&self.store)?;
        let mut images = CachedImages {
            cache: &mut self.cache,
            store: &self.images,
        };
        Ok(compose(
            &snapshot.settings,
            &snapshot.shapes,
            record,
            &mut images,
            &self.fonts,
            footer,
        ))
    }

    pub fn render_record(&mut self, record: &dyn DocumentRecord) -> Result<RenderOutput> {
        let started = Instant::now();
        let composed = self.compose_record(record, &generated_footer())?;
        let settings = self.settings()?;
        let metadata = Metadata {
            title: Some(record.document_name()),
            author: non_empty(&settings.company_name),
        };
        self.finish(vec![composed.page], &metadata, started)
    }

    pub fn render_invoice(&mut self, invoice: &Invoice) -> Result<RenderOutput> {
        debug!("Rendering invoice {} ({} items)", invoice.invoice_number, invoice.items.len());
        self.render_record(invoice)
    }

    pub fn render_purchase_order(&mut self, order: &PurchaseOrder) -> Result<RenderOutput> {
        debug!("Rendering purchase order {} ({} items)", order.po_number, order.items.len());
        self.render_record(order)
    }

    pub fn render_list_report(&mut self, report: &ListReport) -> Result<RenderOutput> {
        let started = Instant::now();
        let snapshot = self.cache.snapshot(&self.store)?;
        let mut images = CachedImages {
            cache: &mut self.cache,
            store: &self.images,
        };
        let pages = compose_list_report(
            &snapshot.settings,
            report,
            &mut images,
            &self.fonts,
            &generated_footer(),
        );
        let metadata = Metadata {
            title: non_empty(&report.title),
            author: non_empty(&snapshot.settings.company_name),
        };
        self.finish(pages, &metadata, started)
    }

    fn finish(&self, pages: Vec<LayoutPage>, metadata: &Metadata, started: Instant) -> Result<RenderOutput> {
        let bytes = self.writer.write(&pages, metadata)?;
        let output = RenderOutput {
            size: format_size(bytes.len()),
            elapsed: format!("{} ms", started.elapsed().as_millis()),
            page_count: pages.len(),
            bytes,
        };
        info!(
            "Rendered {} page(s), {} in {}",
            output.page_count, output.size, output.elapsed
        );
        Ok(output)
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::CellAlign;
    use crate::model::{sample_invoice, sample_list_report};
    use crate::settings::MemoryStore;
    use crate::shapes::Anchor;

    fn settings() -> LayoutSettings {
        LayoutSettings {
            company_name: "Sharma Traders".to_string(),
            address: "14 MG Road, Pune".to_string(),
            phone: "020 5555 1234".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_compose_uses_resolved_layout() {
        let invoice = sample_invoice(6);
        let composed = compose(
            &settings(),
            &ShapeCollection::new(),
            &invoice,
            &mut NoImages,
            &FontContext::new(),
            "footer",
        );
        assert_eq!(composed.layout, resolve(&settings(), 6, false));
        let texts: Vec<&str> = composed.page.texts().collect();
        assert!(texts.contains(&"Sharma Traders"));
        assert!(texts.contains(&"INVOICE"));
        assert!(texts.contains(&"Sample Product 6"));
        assert_eq!(texts.last(), Some(&"footer"));
    }

    #[test]
    fn test_table_outline_is_the_layout_table_frame() {
        for rows in [0, 7, 13] {
            let composed = compose(
                &settings(),
                &ShapeCollection::new(),
                &sample_invoice(rows),
                &mut NoImages,
                &FontContext::new(),
                "",
            );
            let expected = composed.layout.table_frame();
            let outlined = composed.page.elements.iter().any(|e| {
                matches!(e, DrawCommand::Rect { frame, fill: None, stroke: Some(_) } if *frame == expected)
            });
            assert!(outlined, "rows = {}", rows);
        }
    }

    #[test]
    fn test_paint_order_puts_shapes_over_table() {
        let mut shapes = ShapeCollection::new();
        let mut stamp = Shape::rectangle(Frame::new(20.0, 2.0, 30.0, 10.0));
        stamp.anchor = Anchor::Table;
        shapes.insert(stamp);
        let composed = compose(
            &settings(),
            &shapes,
            &sample_invoice(3),
            &mut NoImages,
            &FontContext::new(),
            "",
        );
        let (_, frame) = &composed.shape_frames[0];
        assert_eq!(frame.y, composed.layout.totals_start_y + 2.0);
        match composed.page.elements.last() {
            Some(DrawCommand::Rect { frame: drawn, .. }) => assert_eq!(drawn, frame),
            other => panic!("expected the shape last, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_images_are_omitted() {
        let mut s = settings();
        s.logo_path = Some("missing.png".to_string());
        let mut shapes = ShapeCollection::new();
        shapes.insert(Shape::image(Frame::new(10.0, 200.0, 20.0, 20.0), "gone.png", 1.0));
        let composed = compose(&s, &shapes, &sample_invoice(1), &mut NoImages, &FontContext::new(), "");
        assert_eq!(composed.page.image_count(), 0);
        assert_eq!(composed.shape_frames.len(), 1);
    }

    #[test]
    fn test_list_report_paginates() {
        let fonts = FontContext::new();
        let layout = resolve(&settings(), 0, false);
        let per_page = report_rows_per_page(&layout);
        let report = sample_list_report(per_page * 2 + 1);
        let pages = compose_list_report(&settings(), &report, &mut NoImages, &fonts, "");
        assert_eq!(pages.len(), 3);
        assert!(pages[2].texts().any(|t| t == "Page 3 of 3"));
        assert!(pages[2].texts().any(|t| t.starts_with("Total records:")));
        assert!(pages[0].texts().any(|t| t == "Continued..."));

        let empty = ListReport::new("Empty", vec![ColumnSpec::new("Name", 1.0, CellAlign::Left)]);
        let pages = compose_list_report(&settings(), &empty, &mut NoImages, &fonts, "");
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_save_invalidates_cache() {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageStore::open(dir.path()).unwrap();
        let mut renderer = DocumentRenderer::new(MemoryStore::new(), images);
        assert_eq!(renderer.settings().unwrap().company_name, "");
        assert!(renderer.cache().has_snapshot());

        renderer.save_settings(&settings()).unwrap();
        assert!(!renderer.cache().has_snapshot());
        assert_eq!(renderer.settings().unwrap().company_name, "Sharma Traders");
    }

    #[test]
    fn test_render_invoice_output() {
        let dir = tempfile::tempdir().unwrap();
        let images = ImageStore::open(dir.path()).unwrap();
        let mut renderer = DocumentRenderer::new(MemoryStore::new(), images);
        renderer.save_settings(&settings()).unwrap();
        let output = renderer.render_invoice(&sample_invoice(4)).unwrap();
        assert!(output.bytes.starts_with(b"%PDF-1.7"));
        assert_eq!(output.page_count, 1);
        assert!(output.elapsed.ends_with(" ms"));
        assert_eq!(output.size, format_size(output.bytes.len()));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(12_595), "12.3 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
