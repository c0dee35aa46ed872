//! Slide rasterisation with fontdue onto an RGB canvas.

use super::layout::{
    layout_lines, TextMeasure, BODY_FONT_SIZE, CANVAS_HEIGHT, CANVAS_WIDTH, TITLE_FONT_SIZE,
};
use super::SlideRender;
use crate::text::clean_text;
use anyhow::{anyhow, Context, Result};
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};
use image::{Rgb, RgbImage};
use log::debug;
use std::path::{Path, PathBuf};

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const USER_FONT_NAMES: &[&str] = &["DejaVuSans.ttf", "LiberationSans-Regular.ttf", "Arial.ttf"];

/// Find a usable sans-serif font on this machine.
pub fn find_system_font() -> Option<PathBuf> {
    let user_fonts = dirs::font_dir()
        .into_iter()
        .flat_map(|dir| USER_FONT_NAMES.iter().map(move |name| dir.join(name)));

    FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .chain(user_fonts)
        .find(|path| path.is_file())
}

/// White slides with centred black text.
pub struct FontSlideRenderer {
    font: Font,
}

impl FontSlideRenderer {
    /// Load `font_path`, or the first system font found when `None`.
    pub fn load(font_path: Option<&Path>) -> Result<Self> {
        let path = match font_path {
            Some(path) => path.to_path_buf(),
            None => find_system_font()
                .context("No usable font found; set one with `lesson-video config set-font`")?,
        };
        debug!("Slide font: {}", path.display());

        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read font {}", path.display()))?;
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| anyhow!("Failed to parse font {}: {}", path.display(), e))?;
        Ok(Self { font })
    }

    /// Draw cleaned `text` onto a fresh canvas.
    pub fn draw(&self, text: &str, is_title: bool) -> RgbImage {
        let font_size = if is_title { TITLE_FONT_SIZE } else { BODY_FONT_SIZE };
        let mut canvas = RgbImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, Rgb([255, 255, 255]));

        let lines = layout_lines(text, self, font_size, CANVAS_WIDTH, CANVAS_HEIGHT);
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);

        for line in lines {
            layout.reset(&LayoutSettings {
                x: line.x as f32,
                y: line.y as f32,
                ..LayoutSettings::default()
            });
            layout.append(&[&self.font], &TextStyle::new(&line.text, font_size, 0));

            for glyph in layout.glyphs() {
                if glyph.width == 0 || glyph.height == 0 {
                    continue;
                }
                let (_, coverage) = self.font.rasterize_config(glyph.key);
                blend_glyph(
                    &mut canvas,
                    glyph.x.round() as i32,
                    glyph.y.round() as i32,
                    glyph.width,
                    &coverage,
                );
            }
        }

        canvas
    }
}

impl TextMeasure for FontSlideRenderer {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars()
            .map(|c| self.font.metrics(c, font_size).advance_width)
            .sum()
    }
}

impl SlideRender for FontSlideRenderer {
    fn render(&mut self, text: &str, output_path: &Path, is_title: bool) -> Result<()> {
        let canvas = self.draw(&clean_text(text), is_title);
        canvas
            .save(output_path)
            .with_context(|| format!("Failed to write slide {}", output_path.display()))
    }
}

/// Darken the canvas by each glyph pixel's coverage (black ink).
fn blend_glyph(canvas: &mut RgbImage, x0: i32, y0: i32, width: usize, coverage: &[u8]) {
    if width == 0 {
        return;
    }
    let (cw, ch) = (canvas.width() as i32, canvas.height() as i32);

    for (row, line) in coverage.chunks(width).enumerate() {
        let y = y0 + row as i32;
        if y < 0 || y >= ch {
            continue;
        }
        for (col, &alpha) in line.iter().enumerate() {
            let x = x0 + col as i32;
            if x < 0 || x >= cw || alpha == 0 {
                continue;
            }
            let pixel = canvas.get_pixel_mut(x as u32, y as u32);
            for channel in pixel.0.iter_mut() {
                *channel = (*channel as u16 * (255 - alpha as u16) / 255) as u8;
            }
        }
    }
}
