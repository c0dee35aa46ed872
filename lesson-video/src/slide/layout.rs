//! Word wrapping and line placement on the slide canvas.

/// Canvas width in pixels.
pub const CANVAS_WIDTH: u32 = 1280;
/// Canvas height in pixels.
pub const CANVAS_HEIGHT: u32 = 720;
/// Total horizontal margin subtracted from the wrap width.
pub const WRAP_MARGIN: u32 = 100;
pub const TITLE_FONT_SIZE: f32 = 70.0;
pub const BODY_FONT_SIZE: f32 = 48.0;
/// Extra pixels between consecutive lines.
pub const LINE_GAP: i32 = 10;

/// Measures rendered text width.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font_size: f32) -> f32;
}

/// A wrapped line and its top-left position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: i32,
    pub y: i32,
}

/// Greedy word wrap: add words while the line fits `max_width`.
///
/// A single word wider than `max_width` gets a line of its own. Never yields
/// empty lines.
pub fn wrap_words<M: TextMeasure + ?Sized>(
    text: &str,
    measure: &M,
    font_size: f32,
    max_width: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{} {}", current, word);
        if measure.text_width(&candidate, font_size) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Wrap `text` and centre the block on a `width` x `height` canvas.
///
/// The block starts at `height/2 - lines*font_size/2` and advances
/// `font_size + LINE_GAP` per line; each line is centred horizontally.
pub fn layout_lines<M: TextMeasure + ?Sized>(
    text: &str,
    measure: &M,
    font_size: f32,
    width: u32,
    height: u32,
) -> Vec<PlacedLine> {
    let max_width = width.saturating_sub(WRAP_MARGIN) as f32;
    let lines = wrap_words(text, measure, font_size, max_width);

    let size = font_size as i32;
    let mut y = height as i32 / 2 - (lines.len() as i32 * size) / 2;

    lines
        .into_iter()
        .map(|line| {
            let line_width = measure.text_width(&line, font_size) as i32;
            let placed = PlacedLine {
                x: (width as i32 - line_width) / 2,
                y,
                text: line,
            };
            y += size + LINE_GAP;
            placed
        })
        .collect()
}
