//! Best-effort structural segmentation of a narration.
//!
//! Chapters are found by heading lines ("Label:" alone on a line). This is a
//! heuristic, not a grammar: a narration written without headings becomes a
//! single fallback chapter.

use super::Chapter;
use regex::Regex;
use std::sync::OnceLock;

/// Title given to the fallback chapter when no heading line is found.
pub const FALLBACK_TITLE: &str = "Lesson";

/// Heading line: a label of letters, digits, spaces, hyphens or slashes,
/// a colon, then the end of the line.
static HEADING: OnceLock<Regex> = OnceLock::new();

fn heading_pattern() -> &'static Regex {
    HEADING.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*([A-Za-z0-9][A-Za-z0-9 /\-]*):[ \t]*\r?\n")
            .expect("heading pattern is a valid regex")
    })
}

/// Split a narration into ordered chapters.
///
/// Each heading's body runs from the end of its line to the start of the next
/// heading (or the end of the text). Chapters with an empty body are skipped;
/// text before the first heading is not part of any chapter. When no chapter
/// survives, the whole text becomes one chapter titled [`FALLBACK_TITLE`].
pub fn split_chapters(text: &str) -> Vec<Chapter> {
    let matches: Vec<_> = heading_pattern().captures_iter(text).collect();

    let mut chapters = Vec::with_capacity(matches.len());
    for (i, caps) in matches.iter().enumerate() {
        let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if i == 0 && !text[..whole.start()].trim().is_empty() {
            log::debug!(
                "Ignoring {} characters of narration before the first heading",
                text[..whole.start()].trim().len()
            );
        }

        let end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        let body = text[whole.end()..end].trim();
        if body.is_empty() {
            continue;
        }
        chapters.push(Chapter::new(label.as_str().trim(), body));
    }

    if chapters.is_empty() {
        let body = text.trim();
        if !body.is_empty() {
            chapters.push(Chapter::new(FALLBACK_TITLE, body));
        }
    }

    chapters
}

/// Split text into sentences on whitespace that follows `.`, `!` or `?`.
///
/// Abbreviations such as "e.g. this" are over-split; that is a known
/// limitation of the punctuation rule, not something to patch around here.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut push = |piece: &str| {
        let piece = piece.trim();
        if !piece.is_empty() {
            sentences.push(piece.to_string());
        }
    };

    let mut start = 0;
    let mut prev = None;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() && matches!(prev, Some('.' | '!' | '?')) {
            push(&text[start..i]);
            let mut next_start = i + c.len_utf8();
            while let Some(&(j, w)) = chars.peek() {
                if !w.is_whitespace() {
                    break;
                }
                next_start = j + w.len_utf8();
                chars.next();
            }
            start = next_start;
            prev = None;
            continue;
        }
        prev = Some(c);
    }
    push(&text[start..]);

    sentences
}
