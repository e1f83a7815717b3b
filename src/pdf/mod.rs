//! # PDF Serializer
//!
//! Takes composed pages and writes a PDF 1.7 file. The display list is in
//! millimetres from the top-left corner; PDF user space is points from the
//! bottom-left, so every coordinate passes through [`mm_to_pt`] and is
//! flipped against the page height here and nowhere else.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, fonts, images, pages...
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! Text uses the standard Helvetica family with WinAnsiEncoding, so nothing
//! is embedded. Opacity is expressed with one ExtGState per distinct alpha.
//! Output is deterministic: the same pages always give the same bytes.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>
use std::sync::Arc;

use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::error::DocformError;
use crate::font::FontKey;
use crate::geometry::Frame;
use crate::image_loader::{ImagePixelData, JpegColorSpace, LoadedImage};
use crate::render::{DrawCommand, Fill, LayoutPage};
use crate::style::{Color, Stroke};
use crate::units::mm_to_pt;

/// Document info dictionary entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfWriter;

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn new() -> Self {
        // 0 = placeholder (PDF objects are 1-indexed), 1 = Catalog, 2 = Pages
        Self {
            objects: (0..3).map(|_| PdfObject { data: Vec::new() }).collect(),
        }
    }

    fn push(&mut self, data: Vec<u8>) -> usize {
        self.objects.push(PdfObject { data });
        self.objects.len() - 1
    }

    fn push_stream(&mut self, dict_entries: &str, payload: &[u8]) -> usize {
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(data, "<< {} /Length {} >>\nstream\n", dict_entries, payload.len());
        data.extend_from_slice(payload);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }
}

/// Opacity quantized to thousandths, the key of an ExtGState.
type AlphaKey = u16;

fn alpha_key(opacity: f64) -> Option<AlphaKey> {
    let o = if opacity.is_finite() { opacity.clamp(0.0, 1.0) } else { 1.0 };
    let key = (o * 1000.0).round() as AlphaKey;
    (key < 1000).then_some(key)
}

/// Fonts, images and graphics states referenced by the pages, in first-use
/// order so resource names are stable.
#[derive(Default)]
struct Resources {
    fonts: Vec<FontKey>,
    images: Vec<Arc<LoadedImage>>,
    image_index: HashMap<*const LoadedImage, usize>,
    alphas: Vec<AlphaKey>,
}

impl Resources {
    fn collect(pages: &[LayoutPage]) -> Self {
        let mut res = Resources::default();
        let mut fonts = BTreeSet::new();
        let mut alphas = BTreeSet::new();
        for command in pages.iter().flat_map(|p| &p.elements) {
            match command {
                DrawCommand::Rect { fill, stroke, .. } => {
                    alphas.extend(fill.and_then(|f| alpha_key(f.opacity)));
                    alphas.extend(stroke.and_then(|s| alpha_key(s.opacity)));
                }
                DrawCommand::Line { stroke, .. } => {
                    alphas.extend(alpha_key(stroke.opacity));
                }
                DrawCommand::Text { font, .. } => {
                    fonts.insert(*font);
                }
                DrawCommand::Image { image, opacity, .. } => {
                    alphas.extend(alpha_key(*opacity));
                    let ptr = Arc::as_ptr(image);
                    if !res.image_index.contains_key(&ptr) {
                        res.image_index.insert(ptr, res.images.len());
                        res.images.push(Arc::clone(image));
                    }
                }
            }
        }
        res.fonts = fonts.into_iter().collect();
        res.alphas = alphas.into_iter().collect();
        res
    }

    fn font_index(&self, key: FontKey) -> usize {
        self.fonts.iter().position(|k| *k == key).unwrap_or(0)
    }

    fn alpha_index(&self, opacity: f64) -> Option<usize> {
        let key = alpha_key(opacity)?;
        self.alphas.binary_search(&key).ok()
    }

    fn image_index(&self, image: &Arc<LoadedImage>) -> Option<usize> {
        self.image_index.get(&Arc::as_ptr(image)).copied()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write composed pages to a PDF byte vector.
    pub fn write(&self, pages: &[LayoutPage], metadata: &Metadata) -> Result<Vec<u8>, DocformError> {
        if pages.is_empty() {
            return Err(DocformError::Render("no pages to write".to_string()));
        }

        let mut builder = PdfBuilder::new();
        let resources = Resources::collect(pages);

        let font_ids: Vec<usize> = resources
            .fonts
            .iter()
            .map(|key| {
                builder.push(
                    format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                        key.pdf_name()
                    )
                    .into_bytes(),
                )
            })
            .collect();

        let image_ids: Vec<usize> = resources
            .images
            .iter()
            .map(|image| Self::write_image_xobject(&mut builder, image))
            .collect();

        let gs_ids: Vec<usize> = resources
            .alphas
            .iter()
            .map(|key| {
                let a = *key as f64 / 1000.0;
                builder.push(format!("<< /Type /ExtGState /ca {:.3} /CA {:.3} >>", a, a).into_bytes())
            })
            .collect();

        let resource_dict = Self::build_resource_dict(&font_ids, &image_ids, &gs_ids);

        let mut page_obj_ids: Vec<usize> = Vec::with_capacity(pages.len());
        for page in pages {
            let content = self.build_content_stream(page, &resources);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);
            let content_obj_id = builder.push_stream("/Filter /FlateDecode", &compressed);

            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources {} >>",
                mm_to_pt(page.width),
                mm_to_pt(page.height),
                content_obj_id,
                resource_dict
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let mut info = String::from("<< ");
        if let Some(ref title) = metadata.title {
            let _ = write!(info, "/Title ({}) ", Self::escape_pdf_string(title));
        }
        if let Some(ref author) = metadata.author {
            let _ = write!(info, "/Author ({}) ", Self::escape_pdf_string(author));
        }
        info.push_str("/Producer (docform) /Creator (docform) >>");
        let info_obj_id = builder.push(info.into_bytes());

        Ok(self.serialize(&builder, info_obj_id))
    }

    fn build_resource_dict(font_ids: &[usize], image_ids: &[usize], gs_ids: &[usize]) -> String {
        let entries = |prefix: &str, ids: &[usize]| {
            ids.iter()
                .enumerate()
                .map(|(i, id)| format!("/{}{} {} 0 R", prefix, i, id))
                .collect::<Vec<_>>()
                .join(" ")
        };
        let mut dict = format!("<< /Font << {} >>", entries("F", font_ids));
        if !image_ids.is_empty() {
            let _ = write!(dict, " /XObject << {} >>", entries("Im", image_ids));
        }
        if !gs_ids.is_empty() {
            let _ = write!(dict, " /ExtGState << {} >>", entries("GS", gs_ids));
        }
        dict.push_str(" >>");
        dict
    }

    /// Build the PDF content stream for a single page.
    fn build_content_stream(&self, page: &LayoutPage, resources: &Resources) -> String {
        let mut stream = String::new();
        let page_height = mm_to_pt(page.height);
        for command in &page.elements {
            self.write_command(&mut stream, command, page_height, resources);
        }
        stream
    }

    /// `/GSn gs` for opacities below 1.
    fn graphics_state(stream: &mut String, opacity: f64, resources: &Resources) {
        if let Some(idx) = resources.alpha_index(opacity) {
            let _ = writeln!(stream, "/GS{} gs", idx);
        }
    }

    /// A frame as PDF `x y w h` in points, bottom-left origin.
    fn pdf_rect(frame: &Frame, page_height: f64) -> (f64, f64, f64, f64) {
        let w = mm_to_pt(frame.width);
        let h = mm_to_pt(frame.height);
        (mm_to_pt(frame.x), page_height - mm_to_pt(frame.y) - h, w, h)
    }

    fn write_command(&self, stream: &mut String, command: &DrawCommand, page_height: f64, resources: &Resources) {
        match command {
            DrawCommand::Rect { frame, fill, stroke } => {
                let (x, y, w, h) = Self::pdf_rect(frame, page_height);
                if let Some(Fill { color, opacity }) = fill {
                    if *opacity > 0.0 {
                        stream.push_str("q\n");
                        Self::graphics_state(stream, *opacity, resources);
                        let _ = write!(
                            stream,
                            "{:.3} {:.3} {:.3} rg\n{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
                            color.r, color.g, color.b, x, y, w, h
                        );
                    }
                }
                if let Some(stroke) = stroke {
                    if stroke.width > 0.0 {
                        stream.push_str("q\n");
                        Self::write_stroke_style(stream, stroke, resources);
                        let _ = write!(stream, "{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n", x, y, w, h);
                    }
                }
            }

            DrawCommand::Line { from, to, stroke } => {
                stream.push_str("q\n");
                Self::write_stroke_style(stream, stroke, resources);
                let _ = write!(
                    stream,
                    "{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
                    mm_to_pt(from.x),
                    page_height - mm_to_pt(from.y),
                    mm_to_pt(to.x),
                    page_height - mm_to_pt(to.y)
                );
            }

            DrawCommand::Text {
                x,
                baseline_y,
                text,
                font,
                font_size,
                color,
            } => {
                let _ = write!(
                    stream,
                    "BT\n{:.3} {:.3} {:.3} rg\n/F{} {:.1} Tf\n{:.2} {:.2} Td\n({}) Tj\nET\n",
                    color.r,
                    color.g,
                    color.b,
                    resources.font_index(*font),
                    font_size,
                    mm_to_pt(*x),
                    page_height - mm_to_pt(*baseline_y),
                    Self::encode_text(text)
                );
            }

            DrawCommand::Image { frame, image, opacity } => {
                let (x, y, w, h) = Self::pdf_rect(frame, page_height);
                stream.push_str("q\n");
                Self::graphics_state(stream, *opacity, resources);
                match resources.image_index(image) {
                    Some(idx) => {
                        let _ = write!(stream, "{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{} Do\n", w, h, x, y, idx);
                    }
                    None => {
                        // grey placeholder if the image was not registered
                        let Color { r, g, b } = Color::LIGHT_GREY;
                        let _ = write!(stream, "{:.3} {:.3} {:.3} rg\n{:.2} {:.2} {:.2} {:.2} re\nf\n", r, g, b, x, y, w, h);
                    }
                }
                stream.push_str("Q\n");
            }
        }
    }

    fn write_stroke_style(stream: &mut String, stroke: &Stroke, resources: &Resources) {
        Self::graphics_state(stream, stroke.opacity, resources);
        let _ = write!(
            stream,
            "{:.3} {:.3} {:.3} RG\n{:.2} w\n",
            stroke.color.r,
            stroke.color.g,
            stroke.color.b,
            mm_to_pt(stroke.width)
        );
    }

    /// Write a single image as one or two XObject PDF objects.
    /// Returns the main XObject ID.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
        match &image.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                let color_space_str = match color_space {
                    JpegColorSpace::DeviceRGB => "/DeviceRGB",
                    JpegColorSpace::DeviceGray => "/DeviceGray",
                };
                builder.push_stream(
                    &format!(
                        "/Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace {} /BitsPerComponent 8 /Filter /DCTDecode",
                        image.width_px, image.height_px, color_space_str
                    ),
                    data,
                )
            }

            ImagePixelData::Decoded { rgb, alpha } => {
                // SMask first so the main image can reference it
                let smask_ref = alpha
                    .as_ref()
                    .map(|alpha_data| {
                        let compressed = compress_to_vec_zlib(alpha_data, 6);
                        let id = builder.push_stream(
                            &format!(
                                "/Type /XObject /Subtype /Image /Width {} /Height {} \
                                 /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode",
                                image.width_px, image.height_px
                            ),
                            &compressed,
                        );
                        format!(" /SMask {} 0 R", id)
                    })
                    .unwrap_or_default();

                let compressed_rgb = compress_to_vec_zlib(rgb, 6);
                builder.push_stream(
                    &format!(
                        "/Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode{}",
                        image.width_px, image.height_px, smask_ref
                    ),
                    &compressed_rgb,
                )
            }
        }
    }

    /// Escape special characters in a PDF string.
    fn escape_pdf_string(s: &str) -> String {
        s.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
    }

    /// Encode text as a WinAnsi PDF string body. Unmappable characters
    /// become `?`.
    fn encode_text(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            let b = Self::unicode_to_winansi(ch).unwrap_or(b'?');
            match b {
                b'\\' => out.push_str("\\\\"),
                b'(' => out.push_str("\\("),
                b')' => out.push_str("\\)"),
                0x20..=0x7E => out.push(b as char),
                _ => {
                    let _ = write!(out, "\\{:03o}", b);
                }
            }
        }
        out
    }

    /// Map a Unicode codepoint to a WinAnsiEncoding byte value.
    ///
    /// WinAnsiEncoding is based on Windows-1252. Most codepoints in
    /// 0x20..=0x7E and 0xA0..=0xFF map directly. The 0x80..=0x9F range
    /// contains special mappings for smart quotes, bullets, dashes, etc.
    fn unicode_to_winansi(ch: char) -> Option<u8> {
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
            return Some(cp as u8);
        }
        match cp {
            0x20AC => Some(0x80), // Euro sign
            0x201A => Some(0x82),
            0x0192 => Some(0x83),
            0x201E => Some(0x84),
            0x2026 => Some(0x85), // Horizontal ellipsis
            0x2020 => Some(0x86),
            0x2021 => Some(0x87),
            0x02C6 => Some(0x88),
            0x2030 => Some(0x89),
            0x0160 => Some(0x8A),
            0x2039 => Some(0x8B),
            0x0152 => Some(0x8C),
            0x017D => Some(0x8E),
            0x2018 => Some(0x91), // Left single quotation mark
            0x2019 => Some(0x92), // Right single quotation mark
            0x201C => Some(0x93),
            0x201D => Some(0x94),
            0x2022 => Some(0x95), // Bullet
            0x2013 => Some(0x96), // En dash
            0x2014 => Some(0x97), // Em dash
            0x02DC => Some(0x98),
            0x2122 => Some(0x99), // Trade mark sign
            0x0161 => Some(0x9A),
            0x203A => Some(0x9B),
            0x0153 => Some(0x9C),
            0x017E => Some(0x9E),
            0x0178 => Some(0x9F),
            _ => None,
        }
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn page() -> LayoutPage {
        LayoutPage::new(210.0, 297.0)
    }

    fn rgb_image() -> Arc<LoadedImage> {
        Arc::new(LoadedImage {
            pixel_data: ImagePixelData::Decoded {
                rgb: vec![255, 0, 0],
                alpha: Some(vec![128]),
            },
            width_px: 1,
            height_px: 1,
        })
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(PdfWriter::escape_pdf_string("Hello (World)"), "Hello \\(World\\)");
        assert_eq!(PdfWriter::escape_pdf_string("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_encode_text_winansi() {
        assert_eq!(PdfWriter::encode_text("Rs. (5)"), "Rs. \\(5\\)");
        assert_eq!(PdfWriter::encode_text("caf\u{e9}"), "caf\\351");
        assert_eq!(PdfWriter::encode_text("\u{20b9}"), "?");
    }

    #[test]
    fn test_single_page_produces_valid_pdf() {
        let bytes = PdfWriter::new().write(&[page()], &Metadata::default()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(text.contains("xref"));
        assert!(text.contains("trailer"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(text.contains("/MediaBox [0 0 595.28 841.89]"));
    }

    #[test]
    fn test_no_pages_is_an_error() {
        assert!(PdfWriter::new().write(&[], &Metadata::default()).is_err());
    }

    #[test]
    fn test_metadata_in_pdf() {
        let metadata = Metadata {
            title: Some("Invoice INV-7".to_string()),
            author: Some("Sharma (Traders)".to_string()),
        };
        let bytes = PdfWriter::new().write(&[page()], &metadata).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Title (Invoice INV-7)"));
        assert!(text.contains("/Author (Sharma \\(Traders\\))"));
    }

    #[test]
    fn test_fonts_registered_per_face() {
        let mut p = page();
        p.text(10.0, 10.0, "Name", FontKey::BOLD, 18.0, Color::BLACK);
        p.text(10.0, 20.0, "Address", FontKey::REGULAR, 10.0, Color::BLACK);
        p.text(10.0, 30.0, "More", FontKey::REGULAR, 10.0, Color::BLACK);
        let bytes = PdfWriter::new().write(&[p], &Metadata::default()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("/BaseFont /Helvetica ").count(), 1);
        assert_eq!(text.matches("/BaseFont /Helvetica-Bold ").count(), 1);
    }

    #[test]
    fn test_content_stream_coordinates() {
        let mut p = page();
        p.rect(
            Frame::new(10.0, 20.0, 30.0, 40.0),
            Some(Fill::solid(Color::BLACK)),
            None,
        );
        p.line(Point::new(0.0, 0.0), Point::new(210.0, 0.0), Stroke::new(Color::BLACK, 0.5));
        let resources = Resources::collect(std::slice::from_ref(&p));
        let stream = PdfWriter::new().build_content_stream(&p, &resources);
        let x = mm_to_pt(10.0);
        let h = mm_to_pt(40.0);
        let y = mm_to_pt(297.0) - mm_to_pt(20.0) - h;
        assert!(stream.contains(&format!("{:.2} {:.2} {:.2} {:.2} re\nf", x, y, mm_to_pt(30.0), h)));
        assert!(stream.contains(&format!("0.00 {:.2} m", mm_to_pt(297.0))));
        assert!(!stream.contains(" gs"));
    }

    #[test]
    fn test_opacity_uses_ext_gstate() {
        let mut p = page();
        p.rect(
            Frame::new(10.0, 10.0, 20.0, 20.0),
            Some(Fill {
                color: Color::BLACK,
                opacity: 0.25,
            }),
            None,
        );
        let resources = Resources::collect(std::slice::from_ref(&p));
        assert_eq!(resources.alphas, vec![250]);
        let stream = PdfWriter::new().build_content_stream(&p, &resources);
        assert!(stream.contains("/GS0 gs"));

        let bytes = PdfWriter::new().write(&[p], &Metadata::default()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/ExtGState << /GS0"));
        assert!(text.contains("/ca 0.250 /CA 0.250"));
    }

    #[test]
    fn test_shared_image_written_once() {
        let image = rgb_image();
        let pages: Vec<LayoutPage> = (0..2)
            .map(|_| {
                let mut p = page();
                p.push(DrawCommand::Image {
                    frame: Frame::new(10.0, 10.0, 40.0, 40.0),
                    image: Arc::clone(&image),
                    opacity: 1.0,
                });
                p
            })
            .collect();
        let bytes = PdfWriter::new().write(&pages, &Metadata::default()).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("/ColorSpace /DeviceRGB").count(), 1);
        assert_eq!(text.matches("/SMask").count(), 1);
        assert_eq!(text.matches("/Type /Page ").count(), 2);
    }

    #[test]
    fn test_output_is_deterministic() {
        let build = || {
            let mut p = page();
            p.text(10.0, 10.0, "Same", FontKey::new(false, true), 9.0, Color::GREY);
            p.push(DrawCommand::Image {
                frame: Frame::new(0.0, 0.0, 5.0, 5.0),
                image: rgb_image(),
                opacity: 0.5,
            });
            PdfWriter::new().write(&[p], &Metadata::default()).unwrap()
        };
        assert_eq!(build(), build());
    }
}
