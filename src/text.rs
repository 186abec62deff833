//! Text as geometry.
//!
//! A string becomes one textured quad: [`layout`] wraps it into lines in world
//! units, [`rasterize`] draws those lines into an RGBA coverage bitmap with
//! `fontdue`, and the context places a plane of the laid-out size at the
//! anchored position.
//!
//! Layout only needs glyph advances, so it runs against any [`Measure`].
//! Without a font, [`EstimatedMetrics`] still yields sensible sizes for the
//! placeholder slab.

use std::path::{Path, PathBuf};

use fontdue::{Font, FontSettings};
use glam::{Vec2, Vec3};
use thiserror::Error;

use crate::color::Color;
use crate::texture::TextureData;

/// Pixels per em used when rasterizing.
pub const RASTER_PX: f32 = 64.0;

#[derive(Debug, Error)]
pub enum TextError {
    #[error("failed to read font {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse font {path}: {reason}")]
    Font { path: PathBuf, reason: &'static str },
}

/// Read and parse a TTF/OTF font file.
pub fn load_font(path: impl AsRef<Path>) -> Result<Font, TextError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| TextError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|reason| TextError::Font {
        path: path.to_path_buf(),
        reason,
    })?;
    tracing::info!(path = %path.display(), glyphs = font.glyph_count(), "font loaded");
    Ok(font)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnchorX {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnchorY {
    Top,
    #[default]
    Middle,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    /// Em size in world units.
    pub font_size: f32,
    /// Wrap width in world units.
    pub max_width: Option<f32>,
    pub anchor_x: AnchorX,
    pub anchor_y: AnchorY,
    pub color: Color,
    pub position: Vec3,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 0.25,
            max_width: None,
            anchor_x: AnchorX::Center,
            anchor_y: AnchorY::Middle,
            color: Color::WHITE,
            position: Vec3::ZERO,
        }
    }
}

impl TextStyle {
    pub fn new(font_size: f32) -> Self {
        Self {
            font_size,
            ..Default::default()
        }
    }

    pub fn max_width(mut self, width: f32) -> Self {
        self.max_width = Some(width);
        self
    }

    pub fn anchor(mut self, x: AnchorX, y: AnchorY) -> Self {
        self.anchor_x = x;
        self.anchor_y = y;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }
}

/// Horizontal glyph metrics at a given em size.
pub trait Measure {
    fn advance(&self, ch: char, size: f32) -> f32;
    fn line_height(&self, size: f32) -> f32;
    fn ascent(&self, size: f32) -> f32;

    fn width(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|ch| self.advance(ch, size)).sum()
    }
}

impl Measure for Font {
    fn advance(&self, ch: char, size: f32) -> f32 {
        self.metrics(ch, size).advance_width
    }

    fn line_height(&self, size: f32) -> f32 {
        self.horizontal_line_metrics(size)
            .map(|m| m.new_line_size)
            .unwrap_or(size * 1.2)
    }

    fn ascent(&self, size: f32) -> f32 {
        self.horizontal_line_metrics(size)
            .map(|m| m.ascent)
            .unwrap_or(size * 0.8)
    }
}

/// Fixed-pitch approximation used when no font is loaded.
#[derive(Clone, Copy, Debug, Default)]
pub struct EstimatedMetrics;

impl Measure for EstimatedMetrics {
    fn advance(&self, _ch: char, size: f32) -> f32 {
        size * 0.6
    }

    fn line_height(&self, size: f32) -> f32 {
        size * 1.2
    }

    fn ascent(&self, size: f32) -> f32 {
        size * 0.8
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub width: f32,
}

/// Lines of text measured in world units.
#[derive(Clone, Debug, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<TextLine>,
    pub width: f32,
    pub height: f32,
    pub line_height: f32,
    pub font_size: f32,
    pub align: AnchorX,
}

impl TextLayout {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Offset from the anchor point to the centre of the text quad.
    pub fn center_offset(&self, anchor_x: AnchorX, anchor_y: AnchorY) -> Vec2 {
        let x = match anchor_x {
            AnchorX::Left => self.width * 0.5,
            AnchorX::Center => 0.0,
            AnchorX::Right => -self.width * 0.5,
        };
        let y = match anchor_y {
            AnchorY::Top => -self.height * 0.5,
            AnchorY::Middle => 0.0,
            AnchorY::Bottom => self.height * 0.5,
        };
        Vec2::new(x, y)
    }
}

/// Greedy word wrap. Explicit newlines always break; a single word wider
/// than `max_width` gets a line of its own.
pub fn layout(text: &str, style: &TextStyle, measure: &impl Measure) -> TextLayout {
    let size = style.font_size;
    let line_height = measure.line_height(size);
    let space = measure.advance(' ', size);
    let mut lines = Vec::new();

    if !text.trim().is_empty() {
        for paragraph in text.lines() {
            let mut current = String::new();
            let mut current_width = 0.0;
            for word in paragraph.split_whitespace() {
                let word_width = measure.width(word, size);
                if current.is_empty() {
                    current.push_str(word);
                    current_width = word_width;
                } else if style
                    .max_width
                    .is_some_and(|max| current_width + space + word_width > max)
                {
                    lines.push(TextLine {
                        text: std::mem::take(&mut current),
                        width: current_width,
                    });
                    current.push_str(word);
                    current_width = word_width;
                } else {
                    current.push(' ');
                    current.push_str(word);
                    current_width += space + word_width;
                }
            }
            lines.push(TextLine {
                text: current,
                width: current_width,
            });
        }
    }

    let width = lines.iter().map(|l| l.width).fold(0.0, f32::max);
    TextLayout {
        height: lines.len() as f32 * line_height,
        lines,
        width,
        line_height,
        font_size: size,
        align: style.anchor_x,
    }
}

/// Rasterize a layout into white glyph coverage (color comes from the material).
pub fn rasterize(layout: &TextLayout, font: &Font, label: &str) -> TextureData {
    if layout.is_empty() || layout.font_size <= 0.0 {
        return TextureData::blank(label);
    }

    let scale = RASTER_PX / layout.font_size;
    let width = ((layout.width * scale).ceil() as u32).max(1);
    let height = ((layout.height * scale).ceil() as u32).max(1);
    let mut alpha = vec![0u8; (width * height) as usize];
    let ascent = font.ascent(RASTER_PX);

    for (row, line) in layout.lines.iter().enumerate() {
        let slack = (layout.width - line.width) * scale;
        let mut pen_x = match layout.align {
            AnchorX::Left => 0.0,
            AnchorX::Center => slack * 0.5,
            AnchorX::Right => slack,
        };
        let baseline = row as f32 * layout.line_height * scale + ascent;

        for ch in line.text.chars() {
            let (metrics, bitmap) = font.rasterize(ch, RASTER_PX);
            let left = (pen_x + metrics.xmin as f32).round() as i32;
            let top = (baseline - metrics.height as f32 - metrics.ymin as f32).round() as i32;
            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let x = left + gx as i32;
                    let y = top + gy as i32;
                    if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                        continue;
                    }
                    let dst = &mut alpha[(y as u32 * width + x as u32) as usize];
                    *dst = (*dst).max(bitmap[gy * metrics.width + gx]);
                }
            }
            pen_x += metrics.advance_width;
        }
    }

    let rgba = alpha.iter().flat_map(|&a| [255, 255, 255, a]).collect();
    TextureData::from_rgba(label, width, height, rgba)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn missing_font_file_reports_path() {
        let err = load_font("fonts/nope.ttf").unwrap_err();
        assert!(matches!(err, TextError::Io { .. }));
        assert!(err.to_string().contains("fonts/nope.ttf"));
    }

    #[test]
    fn wraps_greedily_at_max_width() {
        let style = TextStyle::new(1.0).max_width(5.0);
        let l = layout("aaa bbb ccc", &style, &EstimatedMetrics);
        let texts: Vec<&str> = l.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["aaa bbb", "ccc"]);
        assert!(approx(l.width, 4.2));
        assert!(approx(l.height, 2.4));
    }

    #[test]
    fn long_word_keeps_its_own_line() {
        let style = TextStyle::new(1.0).max_width(2.0);
        let l = layout("a enormousword b", &style, &EstimatedMetrics);
        let texts: Vec<&str> = l.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "enormousword", "b"]);
    }

    #[test]
    fn newlines_break_without_max_width() {
        let l = layout("first\nsecond line", &TextStyle::new(0.5), &EstimatedMetrics);
        assert_eq!(l.lines.len(), 2);
        assert_eq!(l.lines[1].text, "second line");
    }

    #[test]
    fn empty_text_has_no_lines() {
        let l = layout("   ", &TextStyle::default(), &EstimatedMetrics);
        assert!(l.is_empty());
        assert_eq!(l.size(), Vec2::ZERO);
    }

    #[test]
    fn anchors_shift_quad_centre() {
        let l = layout("abcd", &TextStyle::new(1.0), &EstimatedMetrics);
        let top_left = l.center_offset(AnchorX::Left, AnchorY::Top);
        assert!(approx(top_left.x, 1.2) && approx(top_left.y, -0.6));
        let bottom_right = l.center_offset(AnchorX::Right, AnchorY::Bottom);
        assert!(approx(bottom_right.x, -1.2) && approx(bottom_right.y, 0.6));
        assert_eq!(l.center_offset(AnchorX::Center, AnchorY::Middle), Vec2::ZERO);
    }
}
