//! The page display list: what to draw, in page millimetres, in paint
//! order. Composition produces it; the PDF writer consumes it.

use std::sync::Arc;

use crate::font::FontKey;
use crate::geometry::{Frame, Point};
use crate::image_loader::LoadedImage;
use crate::style::{Color, Stroke};

/// A flat fill with opacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub color: Color,
    pub opacity: f64,
}

impl Fill {
    pub fn solid(color: Color) -> Self {
        Self { color, opacity: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Rect {
        frame: Frame,
        fill: Option<Fill>,
        stroke: Option<Stroke>,
    },
    Line {
        from: Point,
        to: Point,
        stroke: Stroke,
    },
    Text {
        x: f64,
        baseline_y: f64,
        text: String,
        font: FontKey,
        /// Points.
        font_size: f64,
        color: Color,
    },
    Image {
        frame: Frame,
        image: Arc<LoadedImage>,
        opacity: f64,
    },
}

/// One page of drawing commands.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<DrawCommand>,
}

impl LayoutPage {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            elements: Vec::new(),
        }
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.elements.push(command);
    }

    pub fn rect(&mut self, frame: Frame, fill: Option<Fill>, stroke: Option<Stroke>) {
        self.push(DrawCommand::Rect { frame, fill, stroke });
    }

    pub fn line(&mut self, from: Point, to: Point, stroke: Stroke) {
        self.push(DrawCommand::Line { from, to, stroke });
    }

    pub fn text(&mut self, x: f64, baseline_y: f64, text: &str, font: FontKey, font_size: f64, color: Color) {
        if text.is_empty() {
            return;
        }
        self.push(DrawCommand::Text {
            x,
            baseline_y,
            text: text.to_string(),
            font,
            font_size,
            color,
        });
    }

    /// Every text run on the page, in paint order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn image_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| matches!(e, DrawCommand::Image { .. }))
            .count()
    }
}
