//! # Unit Conversion
//!
//! Page geometry lives in millimetres, font metrics in points, and the
//! editing surface in CSS pixels scaled by a zoom factor. Every conversion
//! between those systems goes through this module; the editor and the PDF
//! writer both call these functions so the two paths cannot drift apart.

/// Millimetres per typographic point (1/72 inch).
pub const MM_PER_PT: f64 = 0.352778;

/// CSS pixels per inch at zoom 1.0.
pub const PX_PER_INCH: f64 = 96.0;

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Convert millimetres to surface pixels at the given zoom.
pub fn mm_to_px(mm: f64, zoom: f64) -> f64 {
    mm * PX_PER_INCH / MM_PER_INCH * zoom
}

/// Convert surface pixels at the given zoom back to millimetres.
pub fn px_to_mm(px: f64, zoom: f64) -> f64 {
    px * MM_PER_INCH / PX_PER_INCH / zoom
}

/// Convert points to millimetres.
pub fn pt_to_mm(pt: f64) -> f64 {
    pt * MM_PER_PT
}

/// Convert millimetres to points.
pub fn mm_to_pt(mm: f64) -> f64 {
    mm / MM_PER_PT
}
