//! Chapter and final video muxing.

use super::chapters::{build_markers, write_metadata};
use super::ffmpeg::{Ffmpeg, Still};
use crate::assemble::Segment;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Video encoding seam used by the pipeline.
pub trait VideoEncoder {
    /// Encode the segments in order into one chapter video at `output`.
    fn mux_chapter(&self, segments: &[Segment], output: &Path) -> Result<()>;

    /// Join chapter videos in order into `output`, tagged with chapter
    /// markers, and never longer than `max_duration`.
    fn mux_final(
        &self,
        chapters: &[(String, PathBuf, f64)],
        max_duration: Option<f64>,
        output: &Path,
    ) -> Result<()>;
}

/// ffmpeg-backed encoder. Intermediates live in a per-call temp dir.
pub struct VideoMuxer {
    ffmpeg: Ffmpeg,
    title: String,
}

impl VideoMuxer {
    pub fn new(ffmpeg: Ffmpeg, title: impl Into<String>) -> Self {
        Self {
            ffmpeg,
            title: title.into(),
        }
    }
}

impl VideoEncoder for VideoMuxer {
    fn mux_chapter(&self, segments: &[Segment], output: &Path) -> Result<()> {
        if segments.is_empty() {
            anyhow::bail!("No segments provided for {}", output.display());
        }

        let stills: Vec<Still<'_>> = segments
            .iter()
            .map(|segment| Still {
                image: &segment.image_path,
                seconds: segment.duration,
                audio: segment.audio_path.as_deref(),
            })
            .collect();
        self.ffmpeg
            .encode_stills(&stills, output)
            .with_context(|| format!("Failed to encode chapter {}", output.display()))?;
        debug!("Wrote chapter video {} ({} segments)", output.display(), segments.len());
        Ok(())
    }

    fn mux_final(
        &self,
        chapters: &[(String, PathBuf, f64)],
        max_duration: Option<f64>,
        output: &Path,
    ) -> Result<()> {
        if chapters.is_empty() {
            anyhow::bail!("No chapter videos provided");
        }

        let temp_dir = TempDir::new().context("Failed to create muxing directory")?;

        let durations: Vec<(String, f64)> = chapters
            .iter()
            .map(|(title, _, duration)| (title.clone(), *duration))
            .collect();
        let markers = build_markers(&durations, max_duration);
        let metadata_file = temp_dir.path().join("chapters.txt");
        write_metadata(&self.title, &markers, &metadata_file)?;

        let joined = temp_dir.path().join("joined.mp4");
        let inputs: Vec<&Path> = chapters.iter().map(|(_, path, _)| path.as_path()).collect();
        self.ffmpeg.concat(&inputs, &joined, Some(&metadata_file))?;

        let actual = self.ffmpeg.probe_duration(&joined)?;
        match max_duration {
            Some(max) if actual > max => {
                warn!(
                    "Joined video is {:.3}s, over the {:.3}s limit; cutting to the limit",
                    actual, max
                );
                self.ffmpeg.cut(&joined, max, output)?;
            }
            _ => {
                std::fs::copy(&joined, output).with_context(|| {
                    format!("Failed to write final video {}", output.display())
                })?;
            }
        }

        let final_duration = max_duration.map_or(actual, |max| actual.min(max));
        info!("Final video: {} ({:.1}s)", output.display(), final_duration);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::SegmentKind;

    fn muxer() -> VideoMuxer {
        VideoMuxer::new(Ffmpeg::new(Some(PathBuf::from("/nonexistent/ffmpeg")), None), "t")
    }

    #[test]
    fn test_empty_chapter_rejected() {
        let dir = TempDir::new().unwrap();
        let err = muxer().mux_chapter(&[], &dir.path().join("c.mp4")).unwrap_err();
        assert!(err.to_string().contains("No segments"));
    }

    #[test]
    fn test_empty_final_rejected() {
        let dir = TempDir::new().unwrap();
        let err = muxer().mux_final(&[], Some(5.0), &dir.path().join("m.mp4")).unwrap_err();
        assert!(err.to_string().contains("No chapter videos"));
    }

    #[test]
    fn test_encoder_failure_surfaces() {
        let dir = TempDir::new().unwrap();
        let segment = Segment {
            image_path: dir.path().join("title.png"),
            duration: 2.0,
            audio_path: None,
            kind: SegmentKind::Title,
            natural_duration: 2.0,
        };
        let output = dir.path().join("c.mp4");
        let err = muxer().mux_chapter(&[segment], &output).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to encode chapter"));
        assert!(!output.exists());
    }

    /// Stand-in ffmpeg/ffprobe: ffmpeg logs its arguments and writes its last
    /// argument; ffprobe reports `probed` seconds.
    #[cfg(unix)]
    fn fake_tools(dir: &Path, probed: &str) -> Ffmpeg {
        use std::os::unix::fs::PermissionsExt;

        let log = dir.join("calls.log");
        let ffmpeg = dir.join("ffmpeg");
        let ffprobe = dir.join("ffprobe");
        std::fs::write(
            &ffmpeg,
            format!(
                "#!/bin/sh\necho \"$@\" >> '{}'\nfor last; do :; done\necho video > \"$last\"\n",
                log.display()
            ),
        )
        .unwrap();
        std::fs::write(&ffprobe, format!("#!/bin/sh\necho {}\n", probed)).unwrap();
        for tool in [&ffmpeg, &ffprobe] {
            std::fs::set_permissions(tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        Ffmpeg::new(Some(ffmpeg), Some(ffprobe))
    }

    #[cfg(unix)]
    fn calls(dir: &Path) -> Vec<String> {
        std::fs::read_to_string(dir.join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    #[cfg(unix)]
    fn chapters(dir: &Path) -> Vec<(String, PathBuf, f64)> {
        vec![
            ("Intro".to_string(), dir.join("chapter_0.mp4"), 6.0),
            ("Details".to_string(), dir.join("chapter_1.mp4"), 6.5),
        ]
    }

    #[cfg(unix)]
    #[test]
    fn test_final_mux_cuts_overshoot_to_limit() {
        let dir = TempDir::new().unwrap();
        let muxer = VideoMuxer::new(fake_tools(dir.path(), "12.541"), "Lesson");
        let output = dir.path().join("main.mp4");

        muxer.mux_final(&chapters(dir.path()), Some(12.5), &output).unwrap();

        let calls = calls(dir.path());
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("-f concat"));
        assert!(calls[0].contains("-map_chapters 1"));
        assert!(calls[1].contains("-t 12.500"));
        assert!(calls[1].ends_with(&output.display().to_string()));
        assert!(output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_final_mux_within_limit_is_copied() {
        let dir = TempDir::new().unwrap();
        let muxer = VideoMuxer::new(fake_tools(dir.path(), "12.4"), "Lesson");
        let output = dir.path().join("main.mp4");

        muxer.mux_final(&chapters(dir.path()), Some(12.5), &output).unwrap();

        let calls = calls(dir.path());
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].contains("-t "));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "video\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_final_mux_unbounded_never_cuts() {
        let dir = TempDir::new().unwrap();
        let muxer = VideoMuxer::new(fake_tools(dir.path(), "600.0"), "Lesson");
        let output = dir.path().join("main.mp4");

        muxer.mux_final(&chapters(dir.path()), None, &output).unwrap();

        assert_eq!(calls(dir.path()).len(), 1);
        assert!(output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_chapter_mux_runs_one_encode() {
        let dir = TempDir::new().unwrap();
        let muxer = VideoMuxer::new(fake_tools(dir.path(), "5.0"), "Lesson");
        let segments = vec![
            Segment {
                image_path: dir.path().join("title.png"),
                duration: 2.0,
                audio_path: None,
                kind: SegmentKind::Title,
                natural_duration: 2.0,
            },
            Segment {
                image_path: dir.path().join("s0.png"),
                duration: 3.01,
                audio_path: Some(dir.path().join("s0.mp3")),
                kind: SegmentKind::Full,
                natural_duration: 3.01,
            },
        ];
        let output = dir.path().join("chapter_0.mp4");

        muxer.mux_chapter(&segments, &output).unwrap();

        let calls = calls(dir.path());
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("-filter_complex"));
        assert!(calls[0].contains("-t 5.010"));
        assert!(output.exists());
    }
}
