//! lesson-video configuration: output location, fonts, speech commands and
//! encoder paths.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const DEFAULT_MINUTES: f32 = 5.0;
const DEFAULT_TTS_RETRIES: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonConfig {
    /// Root directory for frames/, audio/, video/ and response/
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// TrueType/OpenType font for slides. None means search system fonts.
    #[serde(default)]
    pub font_path: Option<PathBuf>,

    /// TTS command. `{text}` and `{output}` are substituted per sentence.
    /// Put `{text}` after `--` so sentences starting with `-` stay text.
    #[serde(default = "default_tts_command")]
    pub tts_command: Vec<String>,

    /// File extension the TTS command writes (transcoded to mp3 afterwards)
    #[serde(default = "default_tts_extension")]
    pub tts_extension: String,

    /// Attempts per sentence before it is skipped
    #[serde(default = "default_tts_retries")]
    pub tts_retries: u32,

    /// STT command. `{input}` is substituted; the transcript is read from stdout.
    #[serde(default = "default_stt_command")]
    pub stt_command: Vec<String>,

    /// ffmpeg binary. None means `ffmpeg` from PATH.
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// ffprobe binary. None means `ffprobe` from PATH.
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Default requested lesson length in minutes
    #[serde(default = "default_minutes")]
    pub default_minutes: f32,

    /// Text-completion preset name (see llm.toml). None uses that file's default.
    #[serde(default)]
    pub llm_preset: Option<String>,
}

fn default_output_root() -> PathBuf {
    PathBuf::from("output")
}

fn default_tts_command() -> Vec<String> {
    ["espeak-ng", "-w", "{output}", "--", "{text}"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_tts_extension() -> String {
    "wav".to_string()
}

fn default_tts_retries() -> u32 {
    DEFAULT_TTS_RETRIES
}

fn default_stt_command() -> Vec<String> {
    ["whisper-cli", "-nt", "-np", "-f", "{input}"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_minutes() -> f32 {
    DEFAULT_MINUTES
}

impl Default for LessonConfig {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            font_path: None,
            tts_command: default_tts_command(),
            tts_extension: default_tts_extension(),
            tts_retries: default_tts_retries(),
            stt_command: default_stt_command(),
            ffmpeg_path: None,
            ffprobe_path: None,
            default_minutes: default_minutes(),
            llm_preset: None,
        }
    }
}

impl LessonConfig {
    /// Get the config file path: ~/.config/cli-programs/lesson-video.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home
            .join(".config")
            .join("cli-programs")
            .join("lesson-video.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: LessonConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }
}
