//! Video encoding through ffmpeg.

mod chapters;
mod ffmpeg;
mod muxer;

pub use ffmpeg::Ffmpeg;
pub use muxer::{VideoEncoder, VideoMuxer};
