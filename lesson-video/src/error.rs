//! Error taxonomy for video generation.
//!
//! Sentence-level synthesis failures and empty chapters are recovered inside
//! the assembler and never surface here. Everything in this enum aborts the
//! request.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Narration for video generation is empty")]
    EmptyNarration,

    #[error("No video clips generated for concatenation: every chapter came out empty")]
    NoSegments,

    #[error("Failed to render slide {}: {message}", path.display())]
    Render { path: PathBuf, message: String },

    #[error("Failed to trim narration audio {}: {message}", path.display())]
    Trim { path: PathBuf, message: String },

    #[error("Video encoding failed while {stage}: {message}")]
    Encode { stage: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub(crate) fn render(path: impl Into<PathBuf>, err: anyhow::Error) -> Self {
        Self::Render {
            path: path.into(),
            message: format!("{:#}", err),
        }
    }

    pub(crate) fn trim(path: impl Into<PathBuf>, err: anyhow::Error) -> Self {
        Self::Trim {
            path: path.into(),
            message: format!("{:#}", err),
        }
    }

    pub(crate) fn encode(stage: impl Into<String>, err: anyhow::Error) -> Self {
        Self::Encode {
            stage: stage.into(),
            message: format!("{:#}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
