//! Plain-text record of one request, written to `response/<session>.txt`.

use crate::pipeline::VideoOutput;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Everything worth keeping about a finished request.
pub struct ResponseRecord<'a> {
    pub prompt: &'a str,
    pub session: &'a str,
    pub max_total_duration: Option<f64>,
    /// Titled blocks such as topic tiers and lessons, in order
    pub sections: Vec<(String, String)>,
    pub narration: &'a str,
    pub output: &'a VideoOutput,
}

impl ResponseRecord<'_> {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let limit = self
            .max_total_duration
            .map_or_else(|| "none".to_string(), |s| format!("{:.1}s", s));

        let _ = writeln!(out, "Prompt: {}", self.prompt);
        let _ = writeln!(out, "Session: {}", self.session);
        let _ = writeln!(out, "Duration limit: {}", limit);

        for (title, body) in &self.sections {
            let _ = writeln!(out, "\n== {} ==\n{}", title, body.trim_end());
        }

        let _ = writeln!(out, "\n== Narration ==\n{}", self.narration.trim_end());

        let _ = writeln!(out, "\n== Chapters ==");
        for chapter in &self.output.chapters {
            let _ = writeln!(
                out,
                "{}. {} - {:.2}s, {} sentence(s){}",
                chapter.index + 1,
                chapter.title,
                chapter.duration,
                chapter.sentences,
                if chapter.trimmed { ", trimmed" } else { "" }
            );
        }
        let _ = writeln!(out, "Total: {:.2}s", self.output.total_duration());

        let _ = writeln!(out, "\nMain video: {}", self.output.main_video.display());
        out
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())
            .with_context(|| format!("Failed to write response file {}", path.display()))
    }
}

/// Append a follow-up question and its answer to an existing response file.
pub fn append_clarification(path: &Path, question: &str, answer: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open response file {}", path.display()))?;
    writeln!(file, "\n== Clarification ==\nQ: {}\nA: {}", question, answer.trim())?;
    Ok(())
}
