//! Thin wrappers over the ffmpeg and ffprobe binaries.

use anyhow::{Context, Result};
use log::debug;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Output frame rate of every encoded video.
pub const FRAME_RATE: u32 = 24;
/// Audio sample rate of every encoded video.
pub const SAMPLE_RATE: u32 = 44_100;

/// One still image held for `seconds`, over optional narration audio.
#[derive(Debug, Clone, Copy)]
pub struct Still<'a> {
    pub image: &'a Path,
    pub seconds: f64,
    pub audio: Option<&'a Path>,
}

/// Located ffmpeg/ffprobe executables.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl Ffmpeg {
    /// Use the given binaries, falling back to `ffmpeg`/`ffprobe` on PATH.
    pub fn new(ffmpeg: Option<PathBuf>, ffprobe: Option<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.unwrap_or_else(|| PathBuf::from("ffmpeg")),
            ffprobe: ffprobe.unwrap_or_else(|| PathBuf::from("ffprobe")),
        }
    }

    fn ffmpeg_command(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-hide_banner", "-loglevel", "error", "-y"]);
        cmd
    }

    /// Check that both binaries run.
    pub fn is_available(&self) -> bool {
        [&self.ffmpeg, &self.ffprobe].iter().all(|bin| {
            Command::new(bin)
                .arg("-version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
    }

    /// Duration of a media file in seconds.
    pub fn probe_duration(&self, path: &Path) -> Result<f64> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "quiet",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .context("Failed to run ffprobe")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffprobe failed on {}: {}", path.display(), stderr.trim());
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout))
            .with_context(|| format!("Failed to parse duration of {}", path.display()))
    }

    /// Re-encode an audio file into the container implied by `output`'s extension.
    pub fn transcode_audio(&self, input: &Path, output: &Path) -> Result<()> {
        let mut cmd = self.ffmpeg_command();
        cmd.arg("-i").arg(input).args(["-vn"]).arg(output);
        run(cmd, "audio transcode")
    }

    /// Keep only the first `seconds` of an audio file.
    pub fn trim_audio(&self, input: &Path, seconds: f64, output: &Path) -> Result<()> {
        let mut cmd = self.ffmpeg_command();
        cmd.arg("-i")
            .arg(input)
            .args(["-t", &format_seconds(seconds), "-vn"])
            .arg(output);
        run(cmd, "audio trim")
    }

    /// Encode stills back to back in a single pass.
    ///
    /// Images go through the concat demuxer with `duration` lines and the
    /// narration through one audio graph, so every still starts exactly where
    /// the previous one ended. Audio shorter than its still is padded with
    /// silence; longer audio is cut.
    pub fn encode_stills(&self, stills: &[Still<'_>], output: &Path) -> Result<()> {
        if stills.is_empty() {
            anyhow::bail!("No stills provided");
        }

        let temp_dir = TempDir::new()?;
        let list_file = temp_dir.path().join("stills.txt");
        std::fs::write(&list_file, still_list(stills))?;

        let mut cmd = self.ffmpeg_command();
        cmd.args(still_args(&list_file, stills, output));
        run(cmd, "chapter encode")
    }

    /// Join same-format media files with the concat demuxer, copying streams.
    ///
    /// When `metadata` is given it must be an FFMETADATA1 file; its global
    /// tags and chapters are attached to the output.
    pub fn concat(&self, inputs: &[&Path], output: &Path, metadata: Option<&Path>) -> Result<()> {
        if inputs.is_empty() {
            anyhow::bail!("No media files provided");
        }

        let temp_dir = TempDir::new()?;
        let list_file = temp_dir.path().join("concat_list.txt");
        std::fs::write(&list_file, concat_list(inputs))?;

        let mut cmd = self.ffmpeg_command();
        cmd.args(["-f", "concat", "-safe", "0", "-i"]).arg(&list_file);
        if let Some(metadata) = metadata {
            cmd.arg("-i")
                .arg(metadata)
                .args(["-map", "0", "-map_metadata", "1", "-map_chapters", "1"]);
        }
        cmd.args(["-c", "copy"]).arg(output);

        run(cmd, "concat")
    }

    /// Re-encode the first `seconds` of a video.
    ///
    /// Audio ends exactly at `seconds`; video keeps only the frames that end
    /// by then. Chapters and tags of the input are carried over.
    pub fn cut(&self, input: &Path, seconds: f64, output: &Path) -> Result<()> {
        let mut cmd = self.ffmpeg_command();
        cmd.arg("-i").arg(input).args(cut_args(seconds)).arg(output);
        run(cmd, "duration clamp")
    }
}

fn run(mut cmd: Command, what: &str) -> Result<()> {
    debug!("ffmpeg {}: {:?}", what, cmd);
    let output: Output = cmd
        .output()
        .with_context(|| format!("Failed to run ffmpeg {}", what))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("ffmpeg {} failed: {}", what, stderr.trim());
    }

    Ok(())
}

/// Quoted path for a concat demuxer list.
fn list_entry(path: &Path) -> String {
    format!("file '{}'\n", path.to_string_lossy().replace('\'', "'\\''"))
}

/// Concat demuxer list with single quotes escaped.
fn concat_list(inputs: &[&Path]) -> String {
    inputs.iter().map(|path| list_entry(path)).collect()
}

/// Image list for the concat demuxer. The last image is listed twice so its
/// duration is honoured.
fn still_list(stills: &[Still<'_>]) -> String {
    let mut list = String::new();
    for still in stills {
        list.push_str(&list_entry(still.image));
        list.push_str(&format!("duration {}\n", format_seconds(still.seconds)));
    }
    if let Some(last) = stills.last() {
        list.push_str(&list_entry(last.image));
    }
    list
}

/// Filter graph giving each still its own slice of audio (narration or
/// silence) and joining the slices into `[aout]`. Audio inputs are numbered
/// from 1, after the image list.
fn audio_graph(stills: &[Still<'_>]) -> String {
    let mut chains = Vec::with_capacity(stills.len() + 1);
    let mut labels = String::new();
    let mut next_input = 1;

    for (i, still) in stills.iter().enumerate() {
        let source = match still.audio {
            Some(_) => {
                let label = format!("[{}:a]", next_input);
                next_input += 1;
                label
            }
            None => format!("anullsrc=r={}:cl=stereo,", SAMPLE_RATE),
        };
        chains.push(format!(
            "{}aresample={rate},aformat=sample_fmts=fltp:sample_rates={rate}:channel_layouts=stereo,\
             apad,atrim=end={end},asetpts=PTS-STARTPTS[a{i}]",
            source,
            rate = SAMPLE_RATE,
            end = format_seconds(still.seconds),
            i = i,
        ));
        labels.push_str(&format!("[a{}]", i));
    }

    chains.push(format!("{}concat=n={}:v=0:a=1[aout]", labels, stills.len()));
    chains.join(";")
}

/// Arguments for the single-pass chapter encode, after the common prefix.
fn still_args(list_file: &Path, stills: &[Still<'_>], output: &Path) -> Vec<OsString> {
    let total: f64 = stills.iter().map(|s| s.seconds.max(0.0)).sum();

    let mut args: Vec<OsString> = ["-f", "concat", "-safe", "0", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(list_file.as_os_str().to_os_string());
    for audio in stills.iter().filter_map(|s| s.audio) {
        args.push("-i".into());
        args.push(audio.as_os_str().to_os_string());
    }
    args.push("-filter_complex".into());
    args.push(audio_graph(stills).into());
    args.extend(
        ["-map", "0:v", "-map", "[aout]"]
            .into_iter()
            .map(OsString::from),
    );
    args.extend(timing_args(total).into_iter().map(OsString::from));
    args.extend(codec_args().into_iter().map(OsString::from));
    args.push(output.as_os_str().to_os_string());
    args
}

/// Arguments for a re-encoding cut to `seconds`, between input and output.
fn cut_args(seconds: f64) -> Vec<String> {
    let mut args: Vec<String> = ["-map", "0:v", "-map", "0:a"]
        .into_iter()
        .map(String::from)
        .collect();
    args.extend(timing_args(seconds));
    args.extend(codec_args());
    args
}

/// Constant frame rate with the video no longer than `seconds` and the audio
/// exactly `seconds`.
fn timing_args(seconds: f64) -> Vec<String> {
    vec![
        "-r".to_string(),
        FRAME_RATE.to_string(),
        "-frames:v".to_string(),
        frame_count(seconds).to_string(),
        "-t".to_string(),
        format_seconds(seconds),
    ]
}

/// Whole frames that fit in `seconds`, at least one.
fn frame_count(seconds: f64) -> u64 {
    ((seconds.max(0.0) * FRAME_RATE as f64 + 1e-6).floor() as u64).max(1)
}

fn codec_args() -> Vec<String> {
    [
        "-c:v",
        "libx264",
        "-tune",
        "stillimage",
        "-pix_fmt",
        "yuv420p",
        "-c:a",
        "aac",
        "-b:a",
        "128k",
        "-ar",
        &SAMPLE_RATE.to_string(),
        "-ac",
        "2",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn parse_duration(raw: &str) -> Result<f64> {
    let seconds: f64 = raw.trim().parse()?;
    if !seconds.is_finite() || seconds < 0.0 {
        anyhow::bail!("invalid duration {:?}", raw.trim());
    }
    Ok(seconds)
}

/// Millisecond-precision seconds for ffmpeg time arguments.
fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_available() {
        // Only checks the probe doesn't panic
        let _ = Ffmpeg::default().is_available();
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let ffmpeg = Ffmpeg::new(Some(PathBuf::from("/nonexistent/ffmpeg")), None);
        assert!(!ffmpeg.is_available());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("3.250000\n").unwrap(), 3.25);
        assert!(parse_duration("N/A").is_err());
        assert!(parse_duration("-1").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(2.0), "2.000");
        assert_eq!(format_seconds(0.0051), "0.005");
        assert_eq!(format_seconds(-1.0), "0.000");
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let a = Path::new("/tmp/a.mp4");
        let b = Path::new("/tmp/it's.mp4");
        let list = concat_list(&[a, b]);
        assert_eq!(list, "file '/tmp/a.mp4'\nfile '/tmp/it'\\''s.mp4'\n");
    }

    #[test]
    fn test_concat_rejects_empty_input() {
        let dir = TempDir::new().unwrap();
        let err = Ffmpeg::default()
            .concat(&[], &dir.path().join("out.mp4"), None)
            .unwrap_err();
        assert!(err.to_string().contains("No media files"));
    }

    fn still<'a>(image: &'a str, seconds: f64, audio: Option<&'a str>) -> Still<'a> {
        Still {
            image: Path::new(image),
            seconds,
            audio: audio.map(Path::new),
        }
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_still_list_carries_durations() {
        let stills = [
            still("/f/title.png", 2.0, None),
            still("/f/s1.png", 3.01, Some("/a/s1.mp3")),
        ];
        assert_eq!(
            still_list(&stills),
            "file '/f/title.png'\nduration 2.000\n\
             file '/f/s1.png'\nduration 3.010\n\
             file '/f/s1.png'\n"
        );
    }

    #[test]
    fn test_audio_graph_numbers_inputs_and_pads_silence() {
        let stills = [
            still("/f/title.png", 2.0, None),
            still("/f/s1.png", 3.01, Some("/a/s1.mp3")),
            still("/f/s2.png", 1.5, Some("/a/s2.mp3")),
        ];
        let graph = audio_graph(&stills);
        let chains: Vec<&str> = graph.split(';').collect();
        assert_eq!(chains.len(), 4);
        assert!(chains[0].starts_with("anullsrc=r=44100:cl=stereo,"));
        assert!(chains[0].ends_with("atrim=end=2.000,asetpts=PTS-STARTPTS[a0]"));
        assert!(chains[1].starts_with("[1:a]aresample=44100"));
        assert!(chains[1].contains("apad,atrim=end=3.010"));
        assert!(chains[2].starts_with("[2:a]"));
        assert_eq!(chains[3], "[a0][a1][a2]concat=n=3:v=0:a=1[aout]");
    }

    #[test]
    fn test_chapter_encodes_in_one_pass() {
        // 2.0 + 3.01 + 3.01 would drift by two frames if each still were
        // encoded separately; one pass keeps the total on a single timeline.
        let stills = [
            still("/f/title.png", 2.0, None),
            still("/f/s1.png", 3.01, Some("/a/s1.mp3")),
            still("/f/s2.png", 3.01, Some("/a/s2.mp3")),
        ];
        let args = strings(&still_args(
            Path::new("/tmp/stills.txt"),
            &stills,
            Path::new("/v/chapter.mp4"),
        ));

        let inputs: Vec<&str> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| a.as_str() == "-i")
            .map(|(i, _)| args[i + 1].as_str())
            .collect();
        assert_eq!(inputs, vec!["/tmp/stills.txt", "/a/s1.mp3", "/a/s2.mp3"]);

        let joined = args.join(" ");
        assert!(joined.starts_with("-f concat -safe 0 -i /tmp/stills.txt"));
        assert!(joined.contains("-map 0:v -map [aout]"));
        assert!(joined.contains("-r 24 -frames:v 192 -t 8.020"));
        assert_eq!(args.last().map(String::as_str), Some("/v/chapter.mp4"));
    }

    #[test]
    fn test_frame_count() {
        assert_eq!(frame_count(3.0), 72);
        assert_eq!(frame_count(3.01), 72);
        assert_eq!(frame_count(8.02), 192);
        assert_eq!(frame_count(0.005), 1);
    }

    #[test]
    fn test_cut_reencodes_to_limit() {
        let args = cut_args(10.0);
        let joined = args.join(" ");
        assert!(joined.contains("-t 10.000"));
        assert!(joined.contains("-frames:v 240"));
        assert!(joined.contains("-c:a aac"));
        assert!(!args.iter().any(|a| a == "copy"));
    }

    #[test]
    fn test_encode_stills_rejects_empty_input() {
        let dir = TempDir::new().unwrap();
        let err = Ffmpeg::default()
            .encode_stills(&[], &dir.path().join("c.mp4"))
            .unwrap_err();
        assert!(err.to_string().contains("No stills"));
    }
}
