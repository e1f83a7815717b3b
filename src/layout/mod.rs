//! # Layout Resolver
//!
//! Computes every derived coordinate of a document page from the settings
//! and the number of table rows. The editor and the renderer both call
//! [`resolve`] and the helpers in this module and never compute these
//! positions on their own: what the designer shows is what the PDF draws.
//!
//! All values are millimetres from the page's top-left corner.
//!
//! ```text
//!   safe_header_y ─┬─ company name
//!                  ├─ address            (+10)
//!                  ├─ phone · email      (+16)
//!                  └─ comments           (+21, optional)
//!   line_y            ───────────────    (+6)
//!   content_start_y   bill-to │ meta     (+6)
//!   table_start_y     ┌ header row ┐     (+27)
//!                     │ item rows  │
//!                     └ footer row ┘
//!   totals_start_y    totals block       (+3.5)
//! ```

use serde::{Deserialize, Serialize};

use crate::font::{FontContext, FontKey};
use crate::geometry::Frame;
use crate::settings::{HeaderAlign, LayoutSettings, PageMode, PageSize};
use crate::units::pt_to_mm;

/// Headers above this line would be clipped by the page border.
pub const MIN_HEADER_Y: f64 = 10.0;
/// Baseline offset of the last company line without comments.
pub const LAST_TEXT_OFFSET: f64 = 16.0;
/// Baseline offset of the last company line when comments are shown.
pub const LAST_TEXT_OFFSET_WITH_COMMENTS: f64 = 21.0;
/// Offset of the address line below the company name.
pub const ADDRESS_OFFSET: f64 = 10.0;
/// Gap between the last company line and the separator.
pub const SEPARATOR_GAP: f64 = 6.0;
/// Gap between the separator and the bill-to block.
pub const CONTENT_GAP: f64 = 6.0;
/// Height reserved for the bill-to and document meta block.
pub const META_BLOCK_HEIGHT: f64 = 27.0;
/// Font size of table cells, in points.
pub const TABLE_FONT_SIZE: f64 = 9.0;
pub const TABLE_LINE_HEIGHT_FACTOR: f64 = 1.15;
/// Vertical padding above and below each table line.
pub const TABLE_CELL_PADDING: f64 = 1.5;
/// Gap between the table and the totals block.
pub const TOTALS_GAP: f64 = 3.5;
/// Inset of the decorative page border.
pub const PAGE_BORDER_INSET: f64 = 5.0;
/// Left/right margin of the bill-to block and the table.
pub const CONTENT_MARGIN: f64 = 15.0;
/// Line pitch inside the bill-to, meta and totals blocks.
pub const BLOCK_LINE_PITCH: f64 = 5.0;

pub const A4: (f64, f64) = (210.0, 297.0);
pub const A5: (f64, f64) = (148.0, 210.0);

/// Derived page geometry. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLayout {
    pub line_y: f64,
    pub content_start_y: f64,
    pub table_start_y: f64,
    pub table_row_height: f64,
    pub table_height: f64,
    pub totals_start_y: f64,
    pub page_width: f64,
    pub page_height: f64,
}

/// Page width and height for the configured size and mode.
pub fn page_extent(settings: &LayoutSettings) -> (f64, f64) {
    let (width, height) = match settings.page_size {
        PageSize::A4 => A4,
        PageSize::A5 => A5,
        PageSize::Custom => (settings.page_width, settings.page_height),
    };
    match settings.page_mode {
        PageMode::Full => (width, height),
        PageMode::Half => (width, height / 2.0),
    }
}

/// Height of one items-table line (text only, no padding).
pub fn table_line_height() -> f64 {
    pt_to_mm(TABLE_FONT_SIZE) * TABLE_LINE_HEIGHT_FACTOR
}

/// Resolve the page geometry for `row_count` table rows.
///
/// Pure: identical inputs give bit-identical output. The logo is not an
/// input; a tall logo can overlap the separator and is left that way.
pub fn resolve(settings: &LayoutSettings, row_count: usize, has_comments: bool) -> ResolvedLayout {
    let safe_header_y = settings.header_y.max(MIN_HEADER_Y);
    let last_text_offset = if has_comments {
        LAST_TEXT_OFFSET_WITH_COMMENTS
    } else {
        LAST_TEXT_OFFSET
    };
    let address_end_y = safe_header_y + last_text_offset;
    let line_y = address_end_y + SEPARATOR_GAP;
    let content_start_y = line_y + CONTENT_GAP;
    let table_start_y = content_start_y + META_BLOCK_HEIGHT;

    let table_row_height = table_line_height() + 2.0 * TABLE_CELL_PADDING;
    // header row + footer row
    let table_height = table_row_height * (row_count + 2) as f64;
    let totals_start_y = table_start_y + table_height + TOTALS_GAP;

    let (page_width, page_height) = page_extent(settings);

    ResolvedLayout {
        line_y,
        content_start_y,
        table_start_y,
        table_row_height,
        table_height,
        totals_start_y,
        page_width,
        page_height,
    }
}

impl ResolvedLayout {
    /// The items table rectangle, header and footer rows included.
    pub fn table_frame(&self) -> Frame {
        Frame::new(
            CONTENT_MARGIN,
            self.table_start_y,
            self.content_width(),
            self.table_height,
        )
    }

    pub fn content_width(&self) -> f64 {
        self.page_width - 2.0 * CONTENT_MARGIN
    }

    /// Top of table row `index`; row 0 is the header row.
    pub fn row_top(&self, index: usize) -> f64 {
        self.table_start_y + self.table_row_height * index as f64
    }

    /// Text baseline inside the row starting at `row_top`.
    pub fn row_baseline(&self, row_top: f64) -> f64 {
        row_top + TABLE_CELL_PADDING + table_line_height() * 0.8
    }

    /// Baseline of line `index` of the bill-to and meta block.
    pub fn meta_baseline(&self, index: usize) -> f64 {
        self.content_start_y + 4.0 + BLOCK_LINE_PITCH * index as f64
    }

    /// Baseline of line `index` of the totals block.
    pub fn totals_baseline(&self, index: usize) -> f64 {
        self.totals_start_y + 4.0 + BLOCK_LINE_PITCH * index as f64
    }

    /// Baseline of the footer line.
    pub fn footer_baseline(&self) -> f64 {
        self.page_height - PAGE_BORDER_INSET - 3.0
    }

    /// The inset page border rectangle.
    pub fn border_frame(&self) -> Frame {
        Frame::new(
            PAGE_BORDER_INSET,
            PAGE_BORDER_INSET,
            self.page_width - 2.0 * PAGE_BORDER_INSET,
            self.page_height - 2.0 * PAGE_BORDER_INSET,
        )
    }

    /// Whether the table and the totals fit above the footer.
    pub fn fits_page(&self) -> bool {
        self.totals_start_y < self.footer_baseline()
    }
}

/// One line of the company header block.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderLine {
    pub text: String,
    /// Left edge of the text after alignment.
    pub x: f64,
    pub baseline_y: f64,
    pub width: f64,
    pub font_size: f64,
    pub bold: bool,
}

impl HeaderLine {
    /// Approximate box around the line, for hit-testing and editor outlines.
    pub fn frame(&self) -> Frame {
        let height = pt_to_mm(self.font_size);
        Frame::new(self.x, self.baseline_y - height * 0.8, self.width, height)
    }
}

/// Lay out the company header block at `(header_x, header_y)`.
///
/// `header_x` is the alignment anchor: left-aligned text starts there,
/// centred text is centred on it, right-aligned text ends on it.
pub fn header_lines(settings: &LayoutSettings, fonts: &FontContext) -> Vec<HeaderLine> {
    let top = settings.header_y.max(MIN_HEADER_Y);
    let contact = [settings.phone.trim(), settings.email.trim()]
        .iter()
        .zip(["Phone: ", "Email: "])
        .filter(|(value, _)| !value.is_empty())
        .map(|(value, label)| format!("{}{}", label, value))
        .collect::<Vec<_>>()
        .join("  |  ");

    let mut rows = vec![
        (settings.company_name.trim().to_string(), 0.0, settings.font_size_header, true),
        (settings.address.trim().to_string(), ADDRESS_OFFSET, settings.font_size_body, false),
        (contact, LAST_TEXT_OFFSET, settings.font_size_body, false),
    ];
    if settings.has_comments() {
        rows.push((
            settings.comments.trim().to_string(),
            LAST_TEXT_OFFSET_WITH_COMMENTS,
            settings.font_size_body,
            false,
        ));
    }

    rows.into_iter()
        .filter(|(text, ..)| !text.is_empty())
        .map(|(text, offset, font_size, bold)| {
            let key = if bold { FontKey::BOLD } else { FontKey::REGULAR };
            let width = fonts.measure_mm(&text, key, font_size);
            let x = match settings.header_align {
                HeaderAlign::Left => settings.header_x,
                HeaderAlign::Center => settings.header_x - width / 2.0,
                HeaderAlign::Right => settings.header_x - width,
            };
            HeaderLine {
                text,
                x,
                baseline_y: top + offset,
                width,
                font_size,
                bold,
            }
        })
        .collect()
}

/// The logo rectangle: fixed width, height from the image aspect ratio
/// (`height_px / width_px`).
pub fn logo_frame(settings: &LayoutSettings, aspect: f64) -> Frame {
    let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
    Frame::new(
        settings.logo_x,
        settings.logo_y,
        settings.logo_width,
        settings.logo_width * aspect,
    )
}

/// Horizontal alignment inside a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellAlign {
    Left,
    Right,
}

/// A table column: header text, relative width, alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub header: String,
    pub weight: f64,
    pub align: CellAlign,
}

impl ColumnSpec {
    pub fn new(header: &str, weight: f64, align: CellAlign) -> Self {
        Self {
            header: header.to_string(),
            weight,
            align,
        }
    }
}

/// Resolved horizontal extent of one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnFrame {
    pub x: f64,
    pub width: f64,
    pub align: CellAlign,
}

impl ColumnFrame {
    /// Text origin for a cell of `text_width` with the cell padding applied.
    pub fn text_x(&self, text_width: f64) -> f64 {
        match self.align {
            CellAlign::Left => self.x + TABLE_CELL_PADDING,
            CellAlign::Right => self.x + self.width - TABLE_CELL_PADDING - text_width,
        }
    }

    /// Room for text inside the cell.
    pub fn inner_width(&self) -> f64 {
        (self.width - 2.0 * TABLE_CELL_PADDING).max(0.0)
    }
}

/// Distribute the content width over columns by weight.
pub fn column_frames(columns: &[ColumnSpec], layout: &ResolvedLayout) -> Vec<ColumnFrame> {
    let total_weight: f64 = columns.iter().map(|c| c.weight.max(0.0)).sum();
    let content_width = layout.content_width();
    let mut x = CONTENT_MARGIN;
    columns
        .iter()
        .map(|c| {
            let width = if total_weight > 0.0 {
                content_width * c.weight.max(0.0) / total_weight
            } else {
                content_width / columns.len() as f64
            };
            let frame = ColumnFrame {
                x,
                width,
                align: c.align,
            };
            x += width;
            frame
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_at(header_y: f64) -> LayoutSettings {
        LayoutSettings {
            header_y,
            ..Default::default()
        }
    }

    #[test]
    fn test_a4_scenario() {
        let layout = resolve(&settings_at(50.0), 6, false);
        assert_eq!(layout.line_y, 72.0);
        assert_eq!(layout.content_start_y, 78.0);
        assert_eq!(layout.table_start_y, 105.0);
        let row = pt_to_mm(9.0) * 1.15 + 3.0;
        assert!((layout.table_height - row * 8.0).abs() < 1e-12);
        assert!((layout.totals_start_y - (105.0 + row * 8.0 + 3.5)).abs() < 1e-12);
        assert_eq!((layout.page_width, layout.page_height), (210.0, 297.0));
    }

    #[test]
    fn test_header_clamped_to_minimum() {
        let low = resolve(&settings_at(2.0), 0, false);
        let floor = resolve(&settings_at(10.0), 0, false);
        assert_eq!(low, floor);
        assert_eq!(low.line_y, 32.0);
    }

    #[test]
    fn test_zero_rows_reserve_header_and_footer() {
        let layout = resolve(&LayoutSettings::default(), 0, false);
        assert!((layout.table_height - 2.0 * layout.table_row_height).abs() < 1e-12);
    }

    #[test]
    fn test_comments_shift_everything_by_five() {
        let s = settings_at(30.0);
        let without = resolve(&s, 4, false);
        let with = resolve(&s, 4, true);
        assert_eq!(with.line_y - without.line_y, 5.0);
        assert_eq!(with.content_start_y - without.content_start_y, 5.0);
        assert_eq!(with.table_start_y - without.table_start_y, 5.0);
        assert!((with.totals_start_y - without.totals_start_y - 5.0).abs() < 1e-9);
        assert_eq!(with.table_height, without.table_height);
        assert_eq!(with.table_row_height, without.table_row_height);
        assert_eq!(with.page_height, without.page_height);
    }

    #[test]
    fn test_page_extent_variants() {
        let mut s = LayoutSettings {
            page_size: PageSize::A5,
            ..Default::default()
        };
        assert_eq!(page_extent(&s), (148.0, 210.0));
        s.page_mode = PageMode::Half;
        assert_eq!(page_extent(&s), (148.0, 105.0));
        s.page_size = PageSize::Custom;
        s.page_width = 100.0;
        s.page_height = 80.0;
        assert_eq!(page_extent(&s), (100.0, 40.0));
    }

    #[test]
    fn test_logo_does_not_move_separator() {
        let mut s = settings_at(20.0);
        let before = resolve(&s, 3, false);
        s.logo_width = 150.0;
        s.logo_y = 5.0;
        assert_eq!(resolve(&s, 3, false), before);
    }

    #[test]
    fn test_header_alignment_anchor() {
        let fonts = FontContext::new();
        let mut s = LayoutSettings {
            company_name: "Acme".to_string(),
            header_x: 100.0,
            header_align: HeaderAlign::Left,
            ..Default::default()
        };
        let left = header_lines(&s, &fonts);
        assert_eq!(left[0].x, 100.0);

        s.header_align = HeaderAlign::Center;
        let center = header_lines(&s, &fonts);
        assert!((center[0].x + center[0].width / 2.0 - 100.0).abs() < 1e-9);

        s.header_align = HeaderAlign::Right;
        let right = header_lines(&s, &fonts);
        assert!((right[0].x + right[0].width - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_header_lines_offsets() {
        let fonts = FontContext::new();
        let s = LayoutSettings {
            company_name: "Acme".to_string(),
            address: "12 MG Road".to_string(),
            phone: "98450 00000".to_string(),
            email: "sales@acme.in".to_string(),
            comments: "GSTIN 29ABCDE1234F1Z5".to_string(),
            header_y: 20.0,
            ..Default::default()
        };
        let lines = header_lines(&s, &fonts);
        let ys: Vec<f64> = lines.iter().map(|l| l.baseline_y).collect();
        assert_eq!(ys, vec![20.0, 30.0, 36.0, 41.0]);
        assert_eq!(lines[2].text, "Phone: 98450 00000  |  Email: sales@acme.in");
        assert!(lines[0].bold);
        // the last baseline is the one the resolver reserves space for
        let layout = resolve(&s, 0, true);
        assert_eq!(layout.line_y, 41.0 + SEPARATOR_GAP);
    }

    #[test]
    fn test_column_frames_fill_content_width() {
        let layout = resolve(&LayoutSettings::default(), 1, false);
        let cols = column_frames(
            &[
                ColumnSpec::new("#", 1.0, CellAlign::Left),
                ColumnSpec::new("Item", 3.0, CellAlign::Left),
            ],
            &layout,
        );
        assert_eq!(cols[0].x, CONTENT_MARGIN);
        assert!((cols[1].x + cols[1].width - (210.0 - CONTENT_MARGIN)).abs() < 1e-9);
        assert!((cols[1].width - 3.0 * cols[0].width).abs() < 1e-9);
    }

    #[test]
    fn test_logo_frame_uses_aspect() {
        let s = LayoutSettings::default();
        let f = logo_frame(&s, 0.5);
        assert_eq!(f, Frame::new(15.0, 10.0, 40.0, 20.0));
        assert_eq!(logo_frame(&s, f64::NAN).height, 40.0);
    }
}
