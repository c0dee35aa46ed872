//! Narration text processing: chapter segmentation, sentence splitting and
//! cleaning.

mod cleaner;
mod segmenter;

pub use cleaner::clean_text;
pub use segmenter::{split_chapters, split_sentences};

use serde::Serialize;

/// A titled, contiguous span of the narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chapter {
    /// Heading label (or the fallback title)
    pub title: String,
    /// Trimmed body text under the heading
    pub body: String,
    /// Body sentences in source order
    pub sentences: Vec<String>,
}

impl Chapter {
    /// Create a chapter, splitting its body into sentences.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        let sentences = split_sentences(&body);
        Self {
            title: title.into(),
            body,
            sentences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_creation() {
        let chapter = Chapter::new("Intro", "One. Two.");
        assert_eq!(chapter.title, "Intro");
        assert_eq!(chapter.sentences, vec!["One.", "Two."]);
    }
}
