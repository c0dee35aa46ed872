//! Per-request output layout.
//!
//! Every artifact of one request lives under directories keyed by the session
//! name, so back-to-back runs against the same output root never collide.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum slug length taken from the prompt.
const MAX_SLUG_LEN: usize = 40;

/// Build a session name: local timestamp, a slug of the prompt and a
/// 4-digit random suffix.
pub fn session_name(prompt: &str, now: DateTime<Local>) -> String {
    format!(
        "{}_{}_{}",
        now.format("%Y%m%d_%H%M%S"),
        slugify(prompt),
        random_suffix()
    )
}

fn random_suffix() -> u16 {
    rand::thread_rng().gen_range(1000..=9999)
}

/// Lowercase ASCII alphanumerics; every other run of characters becomes `-`.
pub fn slugify(prompt: &str) -> String {
    let mut slug = String::with_capacity(prompt.len().min(MAX_SLUG_LEN));
    let mut pending_dash = false;

    for c in prompt.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "lesson".to_string()
    } else {
        slug
    }
}

/// File name unique across runs: `<prefix>_<unix-seconds>_<4 random digits>.<ext>`.
pub fn unique_name(prefix: &str, ext: &str) -> String {
    format!("{}_{}_{}.{}", prefix, Utc::now().timestamp(), random_suffix(), ext)
}

/// Directories and files belonging to one request.
#[derive(Debug, Clone)]
pub struct SessionLayout {
    /// Session name used in every directory
    pub name: String,
    /// `frames/<session>/`
    pub frames_dir: PathBuf,
    /// `audio/<session>/`
    pub audio_dir: PathBuf,
    /// `video/<session>/`
    pub video_dir: PathBuf,
    /// `response/<session>.txt`
    pub response_path: PathBuf,
}

impl SessionLayout {
    /// Compute the layout under `root` without touching the filesystem.
    pub fn new(root: &Path, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            frames_dir: root.join("frames").join(&name),
            audio_dir: root.join("audio").join(&name),
            video_dir: root.join("video").join(&name),
            response_path: root.join("response").join(format!("{}.txt", name)),
            name,
        }
    }

    /// Compute the layout and create all of its directories.
    ///
    /// Fails if a session of the same name already exists under `root`.
    pub fn create(root: &Path, name: impl Into<String>) -> Result<Self> {
        let layout = Self::new(root, name);
        if layout.video_dir.exists() || layout.response_path.exists() {
            anyhow::bail!(
                "Session {} already exists under {}",
                layout.name,
                root.display()
            );
        }
        for dir in [&layout.frames_dir, &layout.audio_dir, &layout.video_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        if let Some(parent) = layout.response_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        Ok(layout)
    }

    /// Deterministic title frame path for a chapter.
    pub fn title_frame(&self, chapter_index: usize) -> PathBuf {
        self.frames_dir
            .join(format!("chapter_{}_title.png", chapter_index))
    }

    /// Fresh frame path for a sentence slide.
    pub fn sentence_frame(&self, chapter_index: usize, sentence_index: usize) -> PathBuf {
        self.frames_dir.join(unique_name(
            &format!("chapter_{}_frame_{}", chapter_index, sentence_index),
            "png",
        ))
    }

    /// Fresh audio path for a sentence's narration.
    pub fn sentence_audio(&self, chapter_index: usize, sentence_index: usize) -> PathBuf {
        self.audio_dir.join(unique_name(
            &format!("chapter_{}_audio_{}", chapter_index, sentence_index),
            "mp3",
        ))
    }

    /// Audio path for the trimmed copy of a narration file.
    pub fn trimmed_audio(&self, original: &Path) -> PathBuf {
        let stem = original
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        self.audio_dir.join(format!("{}_trimmed.mp3", stem))
    }

    /// Fresh path for a chapter video.
    pub fn chapter_video(&self, chapter_index: usize) -> PathBuf {
        self.video_dir
            .join(unique_name(&format!("chapter_{}", chapter_index), "mp4"))
    }

    /// Fresh path for the final lesson video.
    pub fn main_video(&self) -> PathBuf {
        self.video_dir.join(unique_name("video_lesson_main", "mp4"))
    }
}
