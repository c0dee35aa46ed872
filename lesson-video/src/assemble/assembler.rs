//! Greedy, order-preserving clip assembly under a global time budget.
//!
//! Each sentence is synthesized before the budget decision is made, since
//! only the finished audio tells how long it runs. A sentence that fits is
//! kept whole; the first one that overshoots is trimmed to the remaining
//! slack and ends the chapter.

use super::budget::BudgetState;
use super::{ChapterClips, Narrator, Segment};
use crate::error::{PipelineError, Result};
use crate::session::SessionLayout;
use crate::slide::SlideRender;
use crate::text::{clean_text, Chapter};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use std::path::PathBuf;

/// Seconds a title card is shown when the budget allows.
pub const TITLE_DURATION: f64 = 2.0;
/// Slack at or below which an overshooting sentence is dropped, not trimmed.
pub const TRIM_TOLERANCE: f64 = 0.01;

/// How a chapter's sentence loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChapterEnd {
    /// Ran out of sentences
    Completed,
    /// Hit the budget ceiling
    BudgetSpent,
}

/// Builds chapter clips from narration, spending one shared budget.
pub struct ClipAssembler<'a, N, R> {
    layout: &'a SessionLayout,
    narrator: N,
    renderer: R,
    budget: BudgetState,
    progress: ProgressBar,
}

impl<'a, N: Narrator, R: SlideRender> ClipAssembler<'a, N, R> {
    pub fn new(
        layout: &'a SessionLayout,
        narrator: N,
        renderer: R,
        max_total_duration: Option<f64>,
    ) -> Self {
        Self {
            layout,
            narrator,
            renderer,
            budget: BudgetState::new(max_total_duration),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report per-sentence progress on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Committed budget so far.
    pub fn budget(&self) -> BudgetState {
        self.budget
    }

    /// Assemble every chapter in order until the budget runs out.
    ///
    /// Chapters that end up with no sentence (and did not stop on the budget)
    /// are left out. Render and trim failures abort; synthesis failures skip
    /// the sentence.
    pub fn assemble(&mut self, chapters: &[Chapter]) -> Result<Vec<ChapterClips>> {
        let total: usize = chapters.iter().map(|c| c.sentences.len()).sum();
        self.progress.set_length(total as u64);

        let mut clips = Vec::new();
        for (index, chapter) in chapters.iter().enumerate() {
            if self.budget.is_exhausted() {
                info!(
                    "Time budget of {:.2}s used up; skipping {} remaining chapter(s)",
                    self.budget.ceiling().unwrap_or_default(),
                    chapters.len() - index
                );
                break;
            }

            if let Some(chapter_clips) = self.assemble_chapter(index, chapter)? {
                clips.push(chapter_clips);
            }
        }

        self.progress.finish_and_clear();
        Ok(clips)
    }

    fn assemble_chapter(&mut self, index: usize, chapter: &Chapter) -> Result<Option<ChapterClips>> {
        let sentences: Vec<String> = chapter
            .sentences
            .iter()
            .map(|s| clean_text(s))
            .filter(|s| !s.is_empty())
            .collect();

        if sentences.is_empty() {
            warn!("No sentences found in chapter {} ({:?})", index, chapter.title);
            return Ok(None);
        }

        // Spend against a copy; it is committed only if the chapter is kept
        let mut ledger = self.budget;
        let mut segments = Vec::with_capacity(sentences.len() + 1);

        let title_duration = ledger
            .remaining()
            .map_or(TITLE_DURATION, |r| r.min(TITLE_DURATION));
        let title_path = self.layout.title_frame(index);
        self.renderer
            .render(&chapter.title, &title_path, true)
            .map_err(|e| PipelineError::render(&title_path, e))?;
        segments.push(Segment::title(title_path, title_duration));
        ledger.charge(title_duration);

        let mut end = ChapterEnd::Completed;
        if ledger.is_exhausted() {
            debug!("Chapter {} title used the remaining budget", index);
            end = ChapterEnd::BudgetSpent;
            self.progress.inc(sentences.len() as u64);
        }

        if end == ChapterEnd::Completed {
            end = self.assemble_sentences(index, &sentences, &mut ledger, &mut segments)?;
        }

        let has_sentences = segments.len() > 1;
        if !has_sentences && end == ChapterEnd::Completed {
            warn!(
                "Every sentence in chapter {} ({:?}) failed; leaving it out",
                index, chapter.title
            );
            return Ok(None);
        }

        self.budget = ledger;
        Ok(Some(ChapterClips {
            index,
            title: chapter.title.clone(),
            segments,
        }))
    }

    fn assemble_sentences(
        &mut self,
        chapter_index: usize,
        sentences: &[String],
        ledger: &mut BudgetState,
        segments: &mut Vec<Segment>,
    ) -> Result<ChapterEnd> {
        for (i, sentence) in sentences.iter().enumerate() {
            self.progress.inc(1);

            let audio_path = self.layout.sentence_audio(chapter_index, i);
            let unit = match self.narrator.narrate(sentence, &audio_path) {
                Ok(unit) => unit,
                Err(e) => {
                    warn!("TTS error for sentence {:?}: {:#}", sentence, e);
                    continue;
                }
            };

            if ledger.fits(unit.duration) {
                let frame = self.render_sentence(chapter_index, i, sentence)?;
                ledger.charge(unit.duration);
                segments.push(Segment::full(frame, unit));

                if ledger.is_exhausted() {
                    self.progress.inc((sentences.len() - i - 1) as u64);
                    return Ok(ChapterEnd::BudgetSpent);
                }
                continue;
            }

            // Overshoots: keep only what is left of the budget
            let slack = ledger.remaining().unwrap_or_default();
            self.progress.inc((sentences.len() - i - 1) as u64);

            if slack <= TRIM_TOLERANCE {
                debug!(
                    "Dropping {:.2}s sentence; only {:.3}s of budget left",
                    unit.duration, slack
                );
                return Ok(ChapterEnd::BudgetSpent);
            }

            let trimmed_path = self.layout.trimmed_audio(&unit.audio_path);
            self.narrator
                .trim(&unit, slack, &trimmed_path)
                .map_err(|e| PipelineError::trim(&unit.audio_path, e))?;
            let frame = self.render_sentence(chapter_index, i, sentence)?;
            info!(
                "Trimmed final sentence of chapter {} from {:.2}s to {:.2}s",
                chapter_index, unit.duration, slack
            );

            segments.push(Segment::trimmed(frame, slack, trimmed_path, unit.duration));
            ledger.fill_to_ceiling();
            return Ok(ChapterEnd::BudgetSpent);
        }

        Ok(ChapterEnd::Completed)
    }

    fn render_sentence(&mut self, chapter_index: usize, i: usize, sentence: &str) -> Result<PathBuf> {
        let frame = self.layout.sentence_frame(chapter_index, i);
        self.renderer
            .render(sentence, &frame, false)
            .map_err(|e| PipelineError::render(&frame, e))?;
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::fakes::{FakeNarrator, FakeRenderer};
    use crate::assemble::SegmentKind;
    use proptest::prelude::*;
    use std::path::Path;

    fn layout() -> SessionLayout {
        SessionLayout::new(Path::new("/tmp/lesson-test"), "session")
    }

    fn chapter(title: &str, sentences: &[&str]) -> Chapter {
        Chapter::new(title, sentences.join(" "))
    }

    fn kinds(clips: &ChapterClips) -> Vec<SegmentKind> {
        clips.segments.iter().map(|s| s.kind).collect()
    }

    fn durations(clips: &ChapterClips) -> Vec<f64> {
        clips.segments.iter().map(|s| s.duration).collect()
    }

    #[test]
    fn test_budget_stops_after_fitting_sentence() {
        let layout = layout();
        let mut narrator = FakeNarrator::uniform(3.0);
        let mut renderer = FakeRenderer::default();
        let chapters = vec![chapter("Intro", &["One.", "Two.", "Three."])];

        let mut assembler = ClipAssembler::new(&layout, &mut narrator, &mut renderer, Some(5.0));
        let clips = assembler.assemble(&chapters).unwrap();
        assert_eq!(assembler.budget().spent(), 5.0);
        drop(assembler);

        assert_eq!(clips.len(), 1);
        assert_eq!(kinds(&clips[0]), vec![SegmentKind::Title, SegmentKind::Full]);
        assert_eq!(durations(&clips[0]), vec![2.0, 3.0]);
        // Later sentences are never synthesized
        assert_eq!(narrator.narrated, vec!["One."]);
    }

    #[test]
    fn test_title_consumes_small_budget() {
        let layout = layout();
        let mut narrator = FakeNarrator::uniform(10.0);
        let mut renderer = FakeRenderer::default();
        let chapters = vec![chapter("Intro", &["A very long sentence."])];

        let clips = ClipAssembler::new(&layout, &mut narrator, &mut renderer, Some(1.0))
            .assemble(&chapters)
            .unwrap();

        assert_eq!(clips.len(), 1);
        assert_eq!(kinds(&clips[0]), vec![SegmentKind::Title]);
        assert_eq!(durations(&clips[0]), vec![1.0]);
        assert!(narrator.narrated.is_empty());
    }

    #[test]
    fn test_overshoot_is_trimmed_to_slack() {
        let layout = layout();
        let mut narrator = FakeNarrator::uniform(3.0).with_duration("Two.", 4.0);
        let mut renderer = FakeRenderer::default();
        let chapters = vec![chapter("Intro", &["One.", "Two.", "Three."])];

        let clips = ClipAssembler::new(&layout, &mut narrator, &mut renderer, Some(7.0))
            .assemble(&chapters)
            .unwrap();

        let segments = &clips[0].segments;
        assert_eq!(kinds(&clips[0]), vec![SegmentKind::Title, SegmentKind::Full, SegmentKind::Trimmed]);
        assert!((segments[2].duration - 2.0).abs() < 1e-9);
        assert_eq!(segments[2].natural_duration, 4.0);
        assert!(segments[2]
            .audio_path
            .as_ref()
            .unwrap()
            .to_string_lossy()
            .ends_with("_trimmed.mp3"));
        assert_eq!(narrator.trims.len(), 1);
        assert_eq!(narrator.narrated, vec!["One.", "Two."]);
    }

    #[test]
    fn test_tiny_slack_drops_sentence() {
        let layout = layout();
        let mut narrator = FakeNarrator::uniform(3.0);
        let mut renderer = FakeRenderer::default();
        let chapters = vec![
            chapter("Intro", &["One.", "Two."]),
            chapter("More", &["Three."]),
        ];

        // 2s title + 3s sentence leaves 0.005s
        let clips = ClipAssembler::new(&layout, &mut narrator, &mut renderer, Some(5.005))
            .assemble(&chapters)
            .unwrap();

        assert_eq!(kinds(&clips[0]), vec![SegmentKind::Title, SegmentKind::Full]);
        assert!(narrator.trims.is_empty());
        let total: f64 = clips.iter().map(ChapterClips::duration).sum();
        assert!(total <= 5.005 + TRIM_TOLERANCE);
    }

    #[test]
    fn test_unbounded_keeps_everything() {
        let layout = layout();
        let mut narrator = FakeNarrator::uniform(4.5);
        let mut renderer = FakeRenderer::default();
        let chapters = vec![
            chapter("Intro", &["One.", "Two."]),
            chapter("Details", &["Three."]),
        ];

        let clips = ClipAssembler::new(&layout, &mut narrator, &mut renderer, None)
            .assemble(&chapters)
            .unwrap();

        assert_eq!(clips.len(), 2);
        assert_eq!(durations(&clips[0]), vec![2.0, 4.5, 4.5]);
        assert_eq!(durations(&clips[1]), vec![2.0, 4.5]);
        assert_eq!(
            renderer.rendered,
            vec![
                ("Intro".to_string(), true),
                ("One.".to_string(), false),
                ("Two.".to_string(), false),
                ("Details".to_string(), true),
                ("Three.".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_failed_sentence_is_skipped() {
        let layout = layout();
        let mut narrator = FakeNarrator::uniform(1.0).failing_on("Two.");
        let mut renderer = FakeRenderer::default();
        let chapters = vec![chapter("Intro", &["One.", "Two.", "Three."])];

        let clips = ClipAssembler::new(&layout, &mut narrator, &mut renderer, None)
            .assemble(&chapters)
            .unwrap();

        assert_eq!(clips[0].sentence_count(), 2);
        assert_eq!(narrator.narrated, vec!["One.", "Two.", "Three."]);
    }

    #[test]
    fn test_all_failed_chapter_is_absent_and_free() {
        let layout = layout();
        let mut narrator = FakeNarrator::uniform(1.0).failing_on("Bad.");
        let mut renderer = FakeRenderer::default();
        let chapters = vec![
            chapter("Broken", &["Bad."]),
            chapter("Fine", &["Good."]),
        ];

        let mut assembler = ClipAssembler::new(&layout, &mut narrator, &mut renderer, Some(10.0));
        let clips = assembler.assemble(&chapters).unwrap();

        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].title, "Fine");
        assert_eq!(clips[0].index, 1);
        // The dropped chapter's title card was not charged
        assert_eq!(assembler.budget().spent(), 3.0);
    }

    #[test]
    fn test_empty_chapter_is_absent() {
        let layout = layout();
        let mut narrator = FakeNarrator::uniform(1.0);
        let mut renderer = FakeRenderer::default();
        let chapters = vec![Chapter::new("Empty", "\"\" ''"), chapter("Real", &["Yes."])];

        let clips = ClipAssembler::new(&layout, &mut narrator, &mut renderer, None)
            .assemble(&chapters)
            .unwrap();

        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].title, "Real");
        assert!(!renderer.rendered.iter().any(|(t, _)| t == "Empty"));
    }

    #[test]
    fn test_budget_exhaustion_skips_later_chapters() {
        let layout = layout();
        let mut narrator = FakeNarrator::uniform(2.0);
        let mut renderer = FakeRenderer::default();
        let chapters = vec![
            chapter("A", &["One."]),
            chapter("B", &["Two."]),
            chapter("C", &["Three."]),
        ];

        let clips = ClipAssembler::new(&layout, &mut narrator, &mut renderer, Some(4.0))
            .assemble(&chapters)
            .unwrap();

        assert_eq!(clips.len(), 1);
        assert_eq!(narrator.narrated, vec!["One."]);
        assert_eq!(renderer.rendered.len(), 2);
    }

    #[test]
    fn test_render_failure_is_fatal() {
        let layout = layout();
        let mut narrator = FakeNarrator::uniform(1.0);
        let mut renderer = FakeRenderer {
            fail: true,
            ..FakeRenderer::default()
        };
        let chapters = vec![chapter("Intro", &["One."])];

        let err = ClipAssembler::new(&layout, &mut narrator, &mut renderer, None)
            .assemble(&chapters)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Render { .. }));
    }

    #[test]
    fn test_trim_failure_is_fatal() {
        let layout = layout();
        let mut narrator = FakeNarrator::uniform(10.0).failing_trim();
        let mut renderer = FakeRenderer::default();
        let chapters = vec![chapter("Intro", &["One."])];

        let err = ClipAssembler::new(&layout, &mut narrator, &mut renderer, Some(5.0))
            .assemble(&chapters)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Trim { .. }));
    }

    #[test]
    fn test_sentences_are_cleaned_before_synthesis() {
        let layout = layout();
        let mut narrator = FakeNarrator::uniform(1.0);
        let mut renderer = FakeRenderer::default();
        let chapters = vec![Chapter::new("Intro", "Use **bold** and `code` here.")];

        ClipAssembler::new(&layout, &mut narrator, &mut renderer, None)
            .assemble(&chapters)
            .unwrap();

        assert_eq!(narrator.narrated, vec!["Use bold and code here."]);
    }

    fn arb_chapters() -> impl Strategy<Value = Vec<Vec<(f64, bool)>>> {
        // (duration, synthesis fails)
        prop::collection::vec(
            prop::collection::vec((0.1f64..12.0, prop::bool::weighted(0.15)), 0..6),
            1..5,
        )
    }

    fn build(plan: &[Vec<(f64, bool)>]) -> (Vec<Chapter>, FakeNarrator) {
        let mut narrator = FakeNarrator::uniform(1.0);
        let mut chapters = Vec::new();
        for (ci, sentences) in plan.iter().enumerate() {
            let mut texts = Vec::new();
            for (si, (duration, fails)) in sentences.iter().enumerate() {
                let text = format!("Sentence c{}s{}.", ci, si);
                narrator = narrator.with_duration(&text, *duration);
                if *fails {
                    narrator = narrator.failing_on(&text);
                }
                texts.push(text);
            }
            chapters.push(Chapter::new(format!("Chapter {}", ci), texts.join(" ")));
        }
        (chapters, narrator)
    }

    proptest! {
        #[test]
        fn prop_total_never_exceeds_budget(plan in arb_chapters(), max in 0.5f64..40.0) {
            let layout = layout();
            let (chapters, mut narrator) = build(&plan);
            let mut renderer = FakeRenderer::default();
            let mut assembler = ClipAssembler::new(&layout, &mut narrator, &mut renderer, Some(max));
            let clips = assembler.assemble(&chapters).unwrap();

            let total: f64 = clips.iter().map(ChapterClips::duration).sum();
            prop_assert!(total <= max + TRIM_TOLERANCE);
            prop_assert!((assembler.budget().spent() - total).abs() < 1e-6);
        }

        #[test]
        fn prop_trimmed_segment_is_unique_and_last(plan in arb_chapters(), max in 0.5f64..40.0) {
            let layout = layout();
            let (chapters, mut narrator) = build(&plan);
            let mut renderer = FakeRenderer::default();
            let clips = ClipAssembler::new(&layout, &mut narrator, &mut renderer, Some(max))
                .assemble(&chapters)
                .unwrap();

            for chapter in &clips {
                let shortened: Vec<usize> = chapter
                    .segments
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.kind != SegmentKind::Title && s.duration < s.natural_duration)
                    .map(|(i, _)| i)
                    .collect();
                prop_assert!(shortened.len() <= 1);
                if let Some(&i) = shortened.first() {
                    prop_assert_eq!(i, chapter.segments.len() - 1);
                    prop_assert_eq!(chapter.segments[i].kind, SegmentKind::Trimmed);
                }
                prop_assert_eq!(chapter.segments[0].kind, SegmentKind::Title);
            }

            // Only the last kept chapter can end on a trim
            for chapter in clips.iter().rev().skip(1) {
                prop_assert!(!chapter.is_trimmed());
            }
        }

        #[test]
        fn prop_unbounded_keeps_natural_durations(plan in arb_chapters()) {
            let layout = layout();
            let (chapters, mut narrator) = build(&plan);
            let mut renderer = FakeRenderer::default();
            let clips = ClipAssembler::new(&layout, &mut narrator, &mut renderer, None)
                .assemble(&chapters)
                .unwrap();

            let surviving: usize = plan
                .iter()
                .map(|c| c.iter().filter(|(_, fails)| !fails).count())
                .sum();
            let kept: usize = clips.iter().map(ChapterClips::sentence_count).sum();
            prop_assert_eq!(kept, surviving);

            for segment in clips.iter().flat_map(|c| &c.segments) {
                prop_assert_eq!(segment.duration, segment.natural_duration);
                prop_assert!(segment.kind != SegmentKind::Trimmed);
            }
        }

        #[test]
        fn prop_chapter_order_preserved(plan in arb_chapters(), max in prop::option::of(0.5f64..40.0)) {
            let layout = layout();
            let (chapters, mut narrator) = build(&plan);
            let mut renderer = FakeRenderer::default();
            let clips = ClipAssembler::new(&layout, &mut narrator, &mut renderer, max)
                .assemble(&chapters)
                .unwrap();

            let indices: Vec<usize> = clips.iter().map(|c| c.index).collect();
            let mut sorted = indices.clone();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(indices, sorted);
        }
    }
}
