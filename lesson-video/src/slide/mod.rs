//! Slide images: one PNG per title or sentence.

mod layout;
mod renderer;

pub use renderer::FontSlideRenderer;

use anyhow::Result;
use std::path::Path;

/// Renders text onto a fixed-size canvas and writes it as an image.
pub trait SlideRender {
    fn render(&mut self, text: &str, output_path: &Path, is_title: bool) -> Result<()>;
}

impl<T: SlideRender + ?Sized> SlideRender for &mut T {
    fn render(&mut self, text: &str, output_path: &Path, is_title: bool) -> Result<()> {
        (**self).render(text, output_path, is_title)
    }
}
