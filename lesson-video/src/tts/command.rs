//! TTS through an external command such as espeak-ng, piper or `say`.

use super::TtsBackend;
use crate::media::Ffmpeg;
use anyhow::{Context, Result};
use log::debug;
use std::path::Path;
use std::process::Command;

/// Build a command from `template`, replacing `{name}` placeholders inside
/// each argument.
pub(crate) fn expand_template(template: &[String], vars: &[(&str, &str)]) -> Result<Command> {
    let (program, args) = template
        .split_first()
        .context("Command template is empty")?;

    let mut cmd = Command::new(program);
    for arg in args {
        let mut expanded = arg.clone();
        for (name, value) in vars {
            expanded = expanded.replace(&format!("{{{}}}", name), value);
        }
        cmd.arg(expanded);
    }
    Ok(cmd)
}

/// Runs a configured TTS command per sentence.
///
/// The command writes `native_extension` audio to `{output}`; when that differs
/// from the requested file's extension the result is transcoded with ffmpeg.
pub struct CommandTts {
    command: Vec<String>,
    native_extension: String,
    ffmpeg: Ffmpeg,
}

impl CommandTts {
    pub fn new(command: Vec<String>, native_extension: impl Into<String>, ffmpeg: Ffmpeg) -> Result<Self> {
        if command.is_empty() {
            anyhow::bail!("TTS command is empty");
        }
        if !command.iter().any(|arg| arg.contains("{output}")) {
            anyhow::bail!("TTS command must contain an {{output}} placeholder");
        }
        Ok(Self {
            command,
            native_extension: native_extension.into(),
            ffmpeg,
        })
    }

    fn needs_transcode(&self, output_path: &Path) -> bool {
        output_path
            .extension()
            .is_none_or(|ext| !ext.eq_ignore_ascii_case(&self.native_extension))
    }
}

impl TtsBackend for CommandTts {
    fn synthesize(&self, text: &str, output_path: &Path) -> Result<()> {
        let transcode = self.needs_transcode(output_path);
        let native_path = if transcode {
            output_path.with_extension(&self.native_extension)
        } else {
            output_path.to_path_buf()
        };

        let native = native_path.to_string_lossy();
        let mut cmd = expand_template(&self.command, &[("text", text), ("output", &native)])?;
        debug!("TTS: {:?}", cmd);

        let output = cmd
            .output()
            .with_context(|| format!("Failed to run TTS command {}", self.command[0]))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("TTS command failed: {}", stderr.trim());
        }

        let size = std::fs::metadata(&native_path)
            .map(|m| m.len())
            .unwrap_or(0);
        if size == 0 {
            anyhow::bail!("TTS command produced no audio at {}", native_path.display());
        }

        if transcode {
            let result = self.ffmpeg.transcode_audio(&native_path, output_path);
            let _ = std::fs::remove_file(&native_path);
            result?;
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.command[0]
    }
}
