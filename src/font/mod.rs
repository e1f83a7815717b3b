//! # Font Management
//!
//! The engine draws with the standard PDF Helvetica family, which needs no
//! embedding. Text is measured here so that header alignment and table cell
//! fitting come out the same in the editor and in the PDF.

pub mod metrics;

pub use metrics::StandardFontMetrics;

use crate::units::pt_to_mm;

/// Appended to text cut short by [`FontContext::fit_to_width`].
pub const ELLIPSIS: &str = "...";

/// Identifies one face of the Helvetica family.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontKey {
    pub bold: bool,
    pub italic: bool,
}

impl FontKey {
    pub const REGULAR: FontKey = FontKey {
        bold: false,
        italic: false,
    };
    pub const BOLD: FontKey = FontKey {
        bold: true,
        italic: false,
    };

    pub fn new(bold: bool, italic: bool) -> Self {
        Self { bold, italic }
    }

    /// The PDF BaseFont name for this face.
    pub fn pdf_name(&self) -> &'static str {
        match (self.bold, self.italic) {
            (false, false) => "Helvetica",
            (true, false) => "Helvetica-Bold",
            (false, true) => "Helvetica-Oblique",
            (true, true) => "Helvetica-BoldOblique",
        }
    }

    fn metrics(&self) -> StandardFontMetrics {
        if self.bold {
            StandardFontMetrics::HELVETICA_BOLD
        } else {
            StandardFontMetrics::HELVETICA
        }
    }
}

/// Shared font context used by layout, the editor surface and PDF
/// serialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct FontContext;

impl FontContext {
    pub fn new() -> Self {
        Self
    }

    /// Advance width of a single character in points.
    pub fn char_width(&self, ch: char, key: FontKey, font_size: f64) -> f64 {
        key.metrics().char_width(ch, font_size)
    }

    /// Width of a string in points.
    pub fn measure_string(&self, text: &str, key: FontKey, font_size: f64) -> f64 {
        key.metrics().measure_string(text, font_size, 0.0)
    }

    /// Width of a string in millimetres.
    pub fn measure_mm(&self, text: &str, key: FontKey, font_size: f64) -> f64 {
        pt_to_mm(self.measure_string(text, key, font_size))
    }

    /// Shorten `text` with a trailing ellipsis until it fits `max_width_mm`.
    /// One pass over the characters, keeping a running width.
    pub fn fit_to_width(&self, text: &str, key: FontKey, font_size: f64, max_width_mm: f64) -> String {
        if self.measure_mm(text, key, font_size) <= max_width_mm {
            return text.to_string();
        }
        // summed in the same order measure_mm would sum the candidate
        let with_ellipsis =
            |width: f64| ELLIPSIS.chars().fold(width, |w, c| w + self.char_width(c, key, font_size));
        if pt_to_mm(with_ellipsis(0.0)) > max_width_mm {
            return String::new();
        }

        let mut used = 0.0;
        let mut end = 0;
        for (i, ch) in text.char_indices() {
            let next = used + self.char_width(ch, key, font_size);
            if pt_to_mm(with_ellipsis(next)) > max_width_mm {
                break;
            }
            used = next;
            end = i + ch.len_utf8();
        }
        format!("{}{}", &text[..end], ELLIPSIS)
    }

    /// Greedy word wrap into lines no wider than `max_width_mm`. Explicit
    /// newlines are kept; a single word wider than the box gets a line of
    /// its own and is truncated.
    pub fn wrap(&self, text: &str, key: FontKey, font_size: f64, max_width_mm: f64) -> Vec<String> {
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut current = String::new();
            for word in paragraph.split_whitespace() {
                let candidate = if current.is_empty() {
                    word.to_string()
                } else {
                    format!("{} {}", current, word)
                };
                if current.is_empty() || self.measure_mm(&candidate, key, font_size) <= max_width_mm {
                    current = candidate;
                } else {
                    lines.push(self.fit_to_width(&current, key, font_size, max_width_mm));
                    current = word.to_string();
                }
            }
            lines.push(self.fit_to_width(&current, key, font_size, max_width_mm));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_context_helvetica() {
        let ctx = FontContext::new();
        let w = ctx.char_width(' ', FontKey::REGULAR, 12.0);
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_font_context_bold_wider() {
        let ctx = FontContext::new();
        let regular = ctx.char_width('A', FontKey::REGULAR, 12.0);
        let bold = ctx.char_width('A', FontKey::BOLD, 12.0);
        assert!(bold > regular, "Bold A should be wider than regular A");
    }

    #[test]
    fn test_oblique_shares_upright_widths() {
        let ctx = FontContext::new();
        let upright = ctx.measure_string("Invoice", FontKey::new(true, false), 10.0);
        let oblique = ctx.measure_string("Invoice", FontKey::new(true, true), 10.0);
        assert_eq!(upright, oblique);
    }

    #[test]
    fn test_fit_to_width_truncates() {
        let ctx = FontContext::new();
        let long = "A very long product description that cannot fit";
        let fitted = ctx.fit_to_width(long, FontKey::REGULAR, 9.0, 30.0);
        assert!(fitted.ends_with("..."));
        assert!(ctx.measure_mm(&fitted, FontKey::REGULAR, 9.0) <= 30.0);
        assert_eq!(ctx.fit_to_width("Pen", FontKey::REGULAR, 9.0, 30.0), "Pen");
    }

    #[test]
    fn test_fit_to_width_keeps_longest_prefix() {
        let ctx = FontContext::new();
        let text = "Stainless steel water bottle, 750 ml, insulated";
        for max in [5.0, 12.0, 25.0, 40.0] {
            let fitted = ctx.fit_to_width(text, FontKey::BOLD, 9.0, max);
            assert!(ctx.measure_mm(&fitted, FontKey::BOLD, 9.0) <= max);
            let kept = fitted.trim_end_matches(ELLIPSIS);
            assert!(text.starts_with(kept));
            let next = text[kept.len()..].chars().next().unwrap();
            let longer = format!("{}{}{}", kept, next, ELLIPSIS);
            assert!(ctx.measure_mm(&longer, FontKey::BOLD, 9.0) > max, "max = {}", max);
        }
        assert_eq!(ctx.fit_to_width(text, FontKey::REGULAR, 9.0, 0.5), "");
    }

    #[test]
    fn test_fit_to_width_long_cell() {
        let ctx = FontContext::new();
        let long = "Delivered against order 42; ".repeat(4_000);
        let fitted = ctx.fit_to_width(&long, FontKey::REGULAR, 9.0, 60.0);
        assert!(fitted.ends_with(ELLIPSIS));
        assert!(fitted.len() < 80);
    }

    #[test]
    fn test_wrap() {
        let ctx = FontContext::new();
        let lines = ctx.wrap("Paid with thanks\nSigned", FontKey::REGULAR, 10.0, 20.0);
        assert_eq!(lines.last().map(String::as_str), Some("Signed"));
        assert!(lines.len() >= 3);
        for line in &lines {
            assert!(ctx.measure_mm(line, FontKey::REGULAR, 10.0) <= 20.0);
        }
        assert_eq!(ctx.wrap("", FontKey::REGULAR, 10.0, 20.0), vec![String::new()]);
    }

    #[test]
    fn test_pdf_names() {
        assert_eq!(FontKey::REGULAR.pdf_name(), "Helvetica");
        assert_eq!(FontKey::new(true, true).pdf_name(), "Helvetica-BoldOblique");
    }
}
