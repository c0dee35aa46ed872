//! Narration text to final video: segment, assemble, mux.

use crate::assemble::{ChapterClips, ClipAssembler, Narrator};
use crate::error::{PipelineError, Result};
use crate::media::VideoEncoder;
use crate::session::SessionLayout;
use crate::slide::SlideRender;
use crate::text::split_chapters;
use indicatif::ProgressBar;
use log::info;
use std::path::PathBuf;

/// What one chapter contributed to the final video.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterSummary {
    pub index: usize,
    pub title: String,
    /// Seconds on screen
    pub duration: f64,
    pub sentences: usize,
    pub trimmed: bool,
    pub video_path: PathBuf,
}

/// Result of a successful generation.
#[derive(Debug, Clone)]
pub struct VideoOutput {
    pub main_video: PathBuf,
    pub chapters: Vec<ChapterSummary>,
}

impl VideoOutput {
    pub fn total_duration(&self) -> f64 {
        self.chapters.iter().map(|c| c.duration).sum()
    }
}

/// Build the lesson video for `narration` under `layout`.
///
/// Fails before any work on empty narration, and when no chapter produced a
/// segment. On an encoding failure no main video is left behind.
pub fn generate_video<N, R, E>(
    narration: &str,
    max_total_duration: Option<f64>,
    layout: &SessionLayout,
    narrator: N,
    renderer: R,
    encoder: &E,
    progress: ProgressBar,
) -> Result<VideoOutput>
where
    N: Narrator,
    R: SlideRender,
    E: VideoEncoder + ?Sized,
{
    if narration.trim().is_empty() {
        return Err(PipelineError::EmptyNarration);
    }

    let chapters = split_chapters(narration);
    info!("Narration split into {} chapter(s)", chapters.len());

    let clips = ClipAssembler::new(layout, narrator, renderer, max_total_duration)
        .with_progress(progress)
        .assemble(&chapters)?;

    if clips.is_empty() {
        return Err(PipelineError::NoSegments);
    }

    let mut summaries = Vec::with_capacity(clips.len());
    for clip in &clips {
        summaries.push(mux_chapter(clip, layout, encoder)?);
    }

    let inputs: Vec<(String, PathBuf, f64)> = summaries
        .iter()
        .map(|s| (s.title.clone(), s.video_path.clone(), s.duration))
        .collect();
    let main_video = layout.main_video();

    if let Err(e) = encoder.mux_final(&inputs, max_total_duration, &main_video) {
        let _ = std::fs::remove_file(&main_video);
        return Err(PipelineError::encode("joining chapter videos", e));
    }

    Ok(VideoOutput {
        main_video,
        chapters: summaries,
    })
}

fn mux_chapter<E: VideoEncoder + ?Sized>(
    clip: &ChapterClips,
    layout: &SessionLayout,
    encoder: &E,
) -> Result<ChapterSummary> {
    let video_path = layout.chapter_video(clip.index);
    encoder
        .mux_chapter(&clip.segments, &video_path)
        .map_err(|e| PipelineError::encode(format!("encoding chapter {}", clip.index), e))?;

    Ok(ChapterSummary {
        index: clip.index,
        title: clip.title.clone(),
        duration: clip.duration(),
        sentences: clip.sentence_count(),
        trimmed: clip.is_trimmed(),
        video_path,
    })
}
