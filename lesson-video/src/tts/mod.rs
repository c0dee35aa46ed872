//! Text-to-speech: backend trait, the command-line backend and the narrator
//! the clip assembler drives.

mod command;

pub use command::CommandTts;
pub(crate) use command::expand_template;

use crate::assemble::Narrator;
use crate::media::Ffmpeg;
use anyhow::{Context, Result};
use log::warn;
use std::path::{Path, PathBuf};

/// One synthesized sentence and its measured length.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrationUnit {
    pub text: String,
    pub audio_path: PathBuf,
    /// Seconds, read back from the audio file
    pub duration: f64,
}

/// TTS backend trait - all TTS engines implement this.
pub trait TtsBackend {
    /// Synthesize text to an audio file at `output_path`.
    fn synthesize(&self, text: &str, output_path: &Path) -> Result<()>;

    /// Synthesize, retrying up to `max_attempts` times in total.
    fn synthesize_with_retry(&self, text: &str, output_path: &Path, max_attempts: u32) -> Result<()> {
        let attempts = max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.synthesize(text, output_path) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if attempt < attempts {
                        warn!("TTS attempt {}/{} failed: {:#}", attempt, attempts, e);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("TTS produced no attempt")))
    }

    /// Short backend name for logs.
    fn name(&self) -> &str;
}

/// Narrator backed by a TTS engine, with ffprobe for durations and ffmpeg for
/// trimming.
pub struct TtsNarrator<B> {
    backend: B,
    ffmpeg: Ffmpeg,
    max_attempts: u32,
}

impl<B: TtsBackend> TtsNarrator<B> {
    pub fn new(backend: B, ffmpeg: Ffmpeg, max_attempts: u32) -> Self {
        Self {
            backend,
            ffmpeg,
            max_attempts,
        }
    }
}

impl<B: TtsBackend> Narrator for TtsNarrator<B> {
    fn narrate(&mut self, text: &str, output: &Path) -> Result<NarrationUnit> {
        self.backend
            .synthesize_with_retry(text, output, self.max_attempts)
            .with_context(|| format!("{} failed", self.backend.name()))?;
        let duration = self.ffmpeg.probe_duration(output)?;
        Ok(NarrationUnit {
            text: text.to_string(),
            audio_path: output.to_path_buf(),
            duration,
        })
    }

    fn trim(&mut self, unit: &NarrationUnit, seconds: f64, output: &Path) -> Result<()> {
        self.ffmpeg.trim_audio(&unit.audio_path, seconds, output)
    }
}
