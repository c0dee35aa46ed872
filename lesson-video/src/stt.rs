//! Speech-to-text through an external command (whisper.cpp by default).

use crate::tts::expand_template;
use anyhow::{Context, Result};
use log::debug;
use std::path::Path;

/// Transcribes spoken prompts.
pub trait SpeechToText {
    fn transcribe(&self, audio_path: &Path) -> Result<String>;
}

/// Runs the configured STT command and reads the transcript from stdout.
pub struct CommandStt {
    command: Vec<String>,
}

impl CommandStt {
    pub fn new(command: Vec<String>) -> Result<Self> {
        if !command.iter().any(|arg| arg.contains("{input}")) {
            anyhow::bail!("STT command must contain an {{input}} placeholder");
        }
        Ok(Self { command })
    }
}

impl SpeechToText for CommandStt {
    fn transcribe(&self, audio_path: &Path) -> Result<String> {
        if !audio_path.exists() {
            anyhow::bail!("Audio file not found: {}", audio_path.display());
        }

        let input = audio_path.to_string_lossy();
        let mut cmd = expand_template(&self.command, &[("input", &input)])?;
        debug!("STT: {:?}", cmd);

        let output = cmd.output().context("Failed to run STT command")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("STT command failed: {}", stderr.trim());
        }

        let transcript = normalize_transcript(&String::from_utf8_lossy(&output.stdout));
        if transcript.is_empty() {
            anyhow::bail!("No speech recognized in {}", audio_path.display());
        }
        Ok(transcript)
    }
}

/// Join transcript lines into one whitespace-normalized string.
fn normalize_transcript(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_requires_input_placeholder() {
        assert!(CommandStt::new(vec!["whisper-cli".to_string()]).is_err());
    }

    #[test]
    fn test_normalize_transcript() {
        assert_eq!(
            normalize_transcript("  Explain\n   photosynthesis \n"),
            "Explain photosynthesis"
        );
    }

    #[test]
    fn test_missing_audio() {
        let stt = CommandStt::new(vec!["cat".to_string(), "{input}".to_string()]).unwrap();
        assert!(stt.transcribe(Path::new("/nonexistent/q.wav")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_transcribe_reads_stdout() {
        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("q.wav");
        std::fs::write(&audio, "What is\nosmosis?\n").unwrap();

        // `cat` echoes the file, standing in for a recognizer
        let stt = CommandStt::new(vec!["cat".to_string(), "{input}".to_string()]).unwrap();
        assert_eq!(stt.transcribe(&audio).unwrap(), "What is osmosis?");
    }
}
