//! Budgeted assembly of title and sentence segments per chapter.

mod assembler;
mod budget;
#[cfg(test)]
pub(crate) mod fakes;

pub use assembler::ClipAssembler;

use crate::tts::NarrationUnit;
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// How a segment relates to its natural length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SegmentKind {
    /// Silent chapter title card
    Title,
    /// Sentence at its natural duration
    Full,
    /// Sentence cut short to fit the budget; always last in its chapter
    Trimmed,
}

/// One still image shown for a fixed time, optionally over audio.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub image_path: PathBuf,
    /// Seconds on screen
    pub duration: f64,
    pub audio_path: Option<PathBuf>,
    pub kind: SegmentKind,
    /// Length of the untrimmed audio (equals `duration` for titles)
    pub natural_duration: f64,
}

impl Segment {
    fn title(image_path: PathBuf, duration: f64) -> Self {
        Self {
            image_path,
            duration,
            audio_path: None,
            kind: SegmentKind::Title,
            natural_duration: duration,
        }
    }

    fn full(image_path: PathBuf, unit: NarrationUnit) -> Self {
        Self {
            image_path,
            duration: unit.duration,
            audio_path: Some(unit.audio_path),
            kind: SegmentKind::Full,
            natural_duration: unit.duration,
        }
    }

    fn trimmed(image_path: PathBuf, duration: f64, audio_path: PathBuf, natural: f64) -> Self {
        Self {
            image_path,
            duration,
            audio_path: Some(audio_path),
            kind: SegmentKind::Trimmed,
            natural_duration: natural,
        }
    }
}

/// The segments kept for one chapter, in playback order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterClips {
    /// Position of the chapter in the narration
    pub index: usize,
    pub title: String,
    pub segments: Vec<Segment>,
}

impl ChapterClips {
    /// Total seconds on screen.
    pub fn duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Number of sentence segments (titles excluded).
    pub fn sentence_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.kind != SegmentKind::Title)
            .count()
    }

    pub fn is_trimmed(&self) -> bool {
        self.segments.iter().any(|s| s.kind == SegmentKind::Trimmed)
    }
}

/// Speech seam the assembler drives: synthesize one sentence, and cut a
/// synthesized sentence short.
pub trait Narrator {
    /// Synthesize `text` into `output` and report its measured duration.
    fn narrate(&mut self, text: &str, output: &Path) -> Result<NarrationUnit>;

    /// Write the first `seconds` of `unit`'s audio to `output`.
    fn trim(&mut self, unit: &NarrationUnit, seconds: f64, output: &Path) -> Result<()>;
}

impl<T: Narrator + ?Sized> Narrator for &mut T {
    fn narrate(&mut self, text: &str, output: &Path) -> Result<NarrationUnit> {
        (**self).narrate(text, output)
    }

    fn trim(&mut self, unit: &NarrationUnit, seconds: f64, output: &Path) -> Result<()> {
        (**self).trim(unit, seconds, output)
    }
}
