//! In-memory narrator, renderer and encoder for driving the pipeline in tests.

use super::{Narrator, Segment};
use crate::media::VideoEncoder;
use crate::slide::SlideRender;
use crate::tts::NarrationUnit;
use anyhow::Result;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Narrates with scripted durations keyed by sentence text.
#[derive(Default)]
pub struct FakeNarrator {
    durations: HashMap<String, f64>,
    default_duration: f64,
    failing: Vec<String>,
    fail_trim: bool,
    /// Sentences passed to `narrate`, in call order
    pub narrated: Vec<String>,
    /// `(audio, seconds)` per trim call
    pub trims: Vec<(PathBuf, f64)>,
}

impl FakeNarrator {
    /// Every sentence lasts `seconds` unless overridden.
    pub fn uniform(seconds: f64) -> Self {
        Self {
            default_duration: seconds,
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, text: &str, seconds: f64) -> Self {
        self.durations.insert(text.to_string(), seconds);
        self
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.push(text.to_string());
        self
    }

    pub fn failing_trim(mut self) -> Self {
        self.fail_trim = true;
        self
    }
}

impl Narrator for FakeNarrator {
    fn narrate(&mut self, text: &str, output: &Path) -> Result<NarrationUnit> {
        self.narrated.push(text.to_string());
        if self.failing.iter().any(|t| t == text) {
            anyhow::bail!("synthesis failed for {:?}", text);
        }
        let duration = self
            .durations
            .get(text)
            .copied()
            .unwrap_or(self.default_duration);
        Ok(NarrationUnit {
            text: text.to_string(),
            audio_path: output.to_path_buf(),
            duration,
        })
    }

    fn trim(&mut self, unit: &NarrationUnit, seconds: f64, _output: &Path) -> Result<()> {
        if self.fail_trim {
            anyhow::bail!("trim failed");
        }
        self.trims.push((unit.audio_path.clone(), seconds));
        Ok(())
    }
}

/// Records every slide instead of drawing it.
#[derive(Default)]
pub struct FakeRenderer {
    /// `(text, is_title)` per render call
    pub rendered: Vec<(String, bool)>,
    pub fail: bool,
}

impl SlideRender for FakeRenderer {
    fn render(&mut self, text: &str, _output_path: &Path, is_title: bool) -> Result<()> {
        if self.fail {
            anyhow::bail!("no font");
        }
        self.rendered.push((text.to_string(), is_title));
        Ok(())
    }
}

/// Records mux calls and writes placeholder files.
#[derive(Default)]
pub struct FakeEncoder {
    pub chapters: RefCell<Vec<(PathBuf, usize)>>,
    pub finals: RefCell<Vec<(Vec<String>, Option<f64>)>>,
    pub fail_final: bool,
}

impl VideoEncoder for FakeEncoder {
    fn mux_chapter(&self, segments: &[Segment], output: &Path) -> Result<()> {
        self.chapters
            .borrow_mut()
            .push((output.to_path_buf(), segments.len()));
        std::fs::write(output, b"chapter")?;
        Ok(())
    }

    fn mux_final(
        &self,
        chapters: &[(String, PathBuf, f64)],
        max_duration: Option<f64>,
        output: &Path,
    ) -> Result<()> {
        std::fs::write(output, b"partial")?;
        if self.fail_final {
            anyhow::bail!("concat failed");
        }
        let titles = chapters.iter().map(|(t, _, _)| t.clone()).collect();
        self.finals.borrow_mut().push((titles, max_duration));
        Ok(())
    }
}
