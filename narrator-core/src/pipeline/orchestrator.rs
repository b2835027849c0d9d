//! Drives a document through chunking, synthesis, combination and conversion.

use super::naming::final_file_name;
use super::outcome::{ChapterFailure, ChunkFailure, FailureKind, PipelineOutcome, ProducedChapter};
use super::workspace::Workspace;
use crate::audio::{Concatenator, TargetFormat, Transcoder, combine, convert_to_final};
use crate::document::{Chapter, Document};
use crate::error::Result;
use crate::text::{Chunk, DEFAULT_MAX_CHARS, chunk_chapter};
use crate::tts::{Fragment, SpeechEngine, SynthesisPolicy, SynthesisResult, VoiceSettings, synthesize};
use futures_util::{StreamExt, stream};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use tokio::sync::Semaphore;

/// Settings for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Directory final files are written to (created if missing)
    pub output_dir: PathBuf,
    pub format: TargetFormat,
    /// `None` uses the format's default bitrate
    pub bitrate_kbps: Option<u32>,
    pub voice: VoiceSettings,
    pub max_chunk_chars: usize,
    pub synthesis: SynthesisPolicy,
    /// Chapters processed at once
    pub chapter_workers: usize,
    /// Synthesis calls in flight per chapter
    pub chunk_workers: usize,
    /// Synthesis calls in flight across all chapters
    pub synthesis_workers: usize,
    /// Parent of the temporary workspace; `None` uses the system temp dir
    pub workspace_root: Option<PathBuf>,
}

impl PipelineOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            format: TargetFormat::default(),
            bitrate_kbps: None,
            voice: VoiceSettings::default(),
            max_chunk_chars: DEFAULT_MAX_CHARS,
            synthesis: SynthesisPolicy::default(),
            chapter_workers: 1,
            chunk_workers: 1,
            synthesis_workers: 4,
            workspace_root: None,
        }
    }
}

/// Progress notifications emitted while a document is processed.
///
/// Every chapter emits `ChapterStarted` followed by `ChapterFinished`. A
/// chapter skipped before chunking reports zero chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    ChapterStarted {
        chapter: usize,
        title: String,
        chunks: usize,
    },
    ChunkFinished {
        chapter: usize,
        ordinal: usize,
        succeeded: bool,
    },
    ChapterFinished {
        chapter: usize,
        produced: bool,
    },
}

type ProgressFn = dyn Fn(&PipelineEvent) + Send + Sync;

/// Result of processing one chapter.
struct ChapterReport {
    number: usize,
    produced: Option<ProducedChapter>,
    failure: Option<ChapterFailure>,
}

impl ChapterReport {
    fn dropped(chapter: &Chapter, reason: impl Into<String>) -> Self {
        Self {
            number: chapter.number,
            produced: None,
            failure: Some(ChapterFailure {
                chapter: chapter.number,
                title: chapter.title.clone(),
                kind: FailureKind::Dropped { reason: reason.into() },
            }),
        }
    }
}

/// The document-to-audio pipeline.
pub struct Pipeline {
    engine: Box<dyn SpeechEngine>,
    combiner: Box<dyn Concatenator>,
    transcoder: Box<dyn Transcoder>,
    options: PipelineOptions,
    synthesis_slots: Semaphore,
    progress: Option<Box<ProgressFn>>,
}

impl Pipeline {
    pub fn new(
        engine: Box<dyn SpeechEngine>,
        combiner: Box<dyn Concatenator>,
        transcoder: Box<dyn Transcoder>,
        options: PipelineOptions,
    ) -> Self {
        let synthesis_slots = Semaphore::new(options.synthesis_workers.max(1));
        Self {
            engine,
            combiner,
            transcoder,
            options,
            synthesis_slots,
            progress: None,
        }
    }

    /// Receive progress events.
    pub fn with_progress(mut self, callback: impl Fn(&PipelineEvent) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(progress) = &self.progress {
            progress(&event);
        }
    }

    /// Turn a document into one final file per chapter.
    ///
    /// Only document-level problems (an invalid or empty document, an
    /// unusable output directory or workspace) are errors. Chapter and chunk
    /// failures end up in the returned outcome. Intermediate files are
    /// removed before this returns or when the future is dropped.
    pub async fn process_document(&self, document: &Document) -> Result<PipelineOutcome> {
        document.validate()?;
        let units = document.work_units()?;

        info!(
            "Processing \"{}\": {} chapter(s), {} words",
            document.title,
            units.len(),
            document.total_words()
        );

        std::fs::create_dir_all(&self.options.output_dir)?;
        let workspace = Workspace::create(self.options.workspace_root.as_deref())?;

        let mut reports: Vec<ChapterReport> = stream::iter(units.iter())
            .map(|chapter| self.process_chapter(chapter, &workspace))
            .buffer_unordered(self.options.chapter_workers.max(1))
            .collect()
            .await;
        reports.sort_by_key(|r| r.number);

        if let Err(e) = workspace.close() {
            warn!("Failed to remove temporary workspace: {}", e);
        }

        let mut outcome = PipelineOutcome::default();
        for report in reports {
            outcome.files.extend(report.produced);
            outcome.failures.extend(report.failure);
        }

        info!(
            "Pipeline complete. Generated {} file(s) in {}",
            outcome.files.len(),
            self.options.output_dir.display()
        );

        Ok(outcome)
    }

    async fn process_chapter(&self, chapter: &Chapter, workspace: &Workspace) -> ChapterReport {
        let report = self.run_chapter(chapter, workspace).await;
        self.emit(PipelineEvent::ChapterFinished {
            chapter: chapter.number,
            produced: report.produced.is_some(),
        });
        report
    }

    async fn run_chapter(&self, chapter: &Chapter, workspace: &Workspace) -> ChapterReport {
        if chapter.is_blank() {
            warn!("Chapter {} \"{}\" has no content, skipping", chapter.number, chapter.title);
            self.emit(PipelineEvent::ChapterStarted {
                chapter: chapter.number,
                title: chapter.title.clone(),
                chunks: 0,
            });
            return ChapterReport::dropped(chapter, "chapter has no content");
        }

        let chunks = chunk_chapter(&chapter.content, self.options.max_chunk_chars);
        info!(
            "Chapter {} \"{}\": {} chunk(s)",
            chapter.number,
            chapter.title,
            chunks.len()
        );
        self.emit(PipelineEvent::ChapterStarted {
            chapter: chapter.number,
            title: chapter.title.clone(),
            chunks: chunks.len(),
        });

        let chapter_dir = match workspace.chapter_dir(chapter.number) {
            Ok(dir) => dir,
            Err(e) => return ChapterReport::dropped(chapter, e.to_string()),
        };

        let (fragments, failed_chunks) = self.synthesize_chunks(chapter.number, &chunks, &chapter_dir).await;

        if fragments.is_empty() {
            error!(
                "Chapter {} \"{}\": no audio generated, dropping",
                chapter.number, chapter.title
            );
            let reason = match failed_chunks.first() {
                Some(first) => format!("no chunks could be synthesized (first error: {})", first.reason),
                None => "no chunks could be synthesized".to_string(),
            };
            return ChapterReport::dropped(chapter, reason);
        }

        let master = chapter_dir.join(format!("combined_master.{}", self.engine.fragment_extension()));
        let master = match combine(self.combiner.as_ref(), &fragments, &master).await {
            Ok(path) => path,
            Err(e) => {
                error!("Chapter {}: combination failed: {}", chapter.number, e);
                return ChapterReport::dropped(chapter, format!("combination failed: {}", e));
            }
        };

        let output = self.options.output_dir.join(final_file_name(
            chapter.number,
            &chapter.title,
            self.options.format,
        ));
        let path = match self.convert(&master, &output, &chapter_dir).await {
            Ok(path) => path,
            Err(e) => {
                error!("Chapter {}: conversion failed: {}", chapter.number, e);
                return ChapterReport::dropped(chapter, format!("conversion failed: {}", e));
            }
        };

        info!("Chapter {}: wrote {}", chapter.number, path.display());

        let failure = if failed_chunks.is_empty() {
            None
        } else {
            warn!(
                "Chapter {}: {} of {} chunk(s) failed, audio is incomplete",
                chapter.number,
                failed_chunks.len(),
                chunks.len()
            );
            Some(ChapterFailure {
                chapter: chapter.number,
                title: chapter.title.clone(),
                kind: FailureKind::Partial {
                    failed_chunks,
                    total_chunks: chunks.len(),
                },
            })
        };

        ChapterReport {
            number: chapter.number,
            produced: Some(ProducedChapter {
                chapter: chapter.number,
                title: chapter.title.clone(),
                path,
            }),
            failure,
        }
    }

    /// Synthesize every chunk, returning fragments and failures in ordinal order.
    async fn synthesize_chunks(
        &self,
        chapter: usize,
        chunks: &[Chunk],
        chapter_dir: &Path,
    ) -> (Vec<Fragment>, Vec<ChunkFailure>) {
        let extension = self.engine.fragment_extension().to_string();

        let mut results: Vec<SynthesisResult> = stream::iter(chunks)
            .map(|chunk| {
                let destination = chapter_dir.join(format!("chunk_{:04}.{}", chunk.ordinal, extension));
                async move {
                    // Never closed, so acquiring only waits
                    let _slot = self.synthesis_slots.acquire().await.ok();
                    let result = synthesize(
                        self.engine.as_ref(),
                        &self.options.voice,
                        &self.options.synthesis,
                        chunk,
                        &destination,
                    )
                    .await;
                    self.emit(PipelineEvent::ChunkFinished {
                        chapter,
                        ordinal: chunk.ordinal,
                        succeeded: !matches!(result, SynthesisResult::Failed { .. }),
                    });
                    result
                }
            })
            .buffer_unordered(self.options.chunk_workers.max(1))
            .collect()
            .await;
        results.sort_by_key(|r| r.ordinal());

        let mut fragments = Vec::new();
        let mut failures = Vec::new();
        for result in results {
            match result {
                SynthesisResult::Fragment(fragment) => fragments.push(fragment),
                SynthesisResult::Skipped { .. } => {}
                SynthesisResult::Failed { ordinal, error } => {
                    warn!("Chapter {}: chunk {} failed: {}", chapter, ordinal, error);
                    failures.push(ChunkFailure {
                        ordinal,
                        reason: error.to_string(),
                    });
                }
            }
        }

        (fragments, failures)
    }

    async fn convert(&self, master: &Path, output: &Path, scratch_dir: &Path) -> Result<PathBuf> {
        convert_to_final(
            self.transcoder.as_ref(),
            &[master.to_path_buf()],
            self.options.format,
            self.options.bitrate_kbps,
            output,
            scratch_dir,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NarratorError;
    use crate::structure::StructureDetector;
    use crate::testing::{EngineBehavior, FakeConcatenator, FakeEngine, FakeTranscoder};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        _root: TempDir,
        output_dir: PathBuf,
        workspace_root: PathBuf,
    }

    impl Harness {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let output_dir = root.path().join("out");
            let workspace_root = root.path().join("tmp");
            Self {
                _root: root,
                output_dir,
                workspace_root,
            }
        }

        fn options(&self) -> PipelineOptions {
            let mut options = PipelineOptions::new(&self.output_dir);
            options.workspace_root = Some(self.workspace_root.clone());
            options.synthesis = SynthesisPolicy {
                timeout: Duration::from_millis(100),
                max_attempts: 2,
            };
            options
        }

        fn pipeline(&self, engine: FakeEngine) -> Pipeline {
            self.pipeline_with(engine, FakeConcatenator::new(), FakeTranscoder::new(), self.options())
        }

        fn pipeline_with(
            &self,
            engine: FakeEngine,
            combiner: FakeConcatenator,
            transcoder: FakeTranscoder,
            options: PipelineOptions,
        ) -> Pipeline {
            Pipeline::new(Box::new(engine), Box::new(combiner), Box::new(transcoder), options)
        }

        fn output_names(&self) -> Vec<String> {
            let mut names: Vec<String> = std::fs::read_dir(&self.output_dir)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }

        fn workspace_leftovers(&self) -> usize {
            std::fs::read_dir(&self.workspace_root)
                .map(|entries| entries.count())
                .unwrap_or(0)
        }
    }

    fn detected(title: &str, content: &str) -> Document {
        let chapters = StructureDetector::new().split_into_chapters(content);
        Document::new(title, content).with_chapters(chapters)
    }

    #[tokio::test]
    async fn test_two_chapters_to_mp3() {
        let harness = Harness::new();
        let document = detected("Book", "Chapter 1\nHello there.\n\nChapter 2\nGoodbye.");
        assert_eq!(document.chapters.len(), 2);

        let outcome = harness
            .pipeline(FakeEngine::succeeding())
            .process_document(&document)
            .await
            .unwrap();

        assert!(outcome.is_clean());
        assert_eq!(harness.output_names(), vec!["01 - Chapter 1.mp3", "02 - Chapter 2.mp3"]);
        assert_eq!(outcome.files[0].chapter, 1);
        assert_eq!(outcome.files[1].path, harness.output_dir.join("02 - Chapter 2.mp3"));
        assert_eq!(
            std::fs::read_to_string(&outcome.files[0].path).unwrap(),
            "audio:Hello there."
        );
    }

    #[tokio::test]
    async fn test_flat_text_becomes_single_chapter() {
        let harness = Harness::new();
        let document = detected("My Story", "Just flat text.");
        assert!(document.chapters.is_empty());

        let outcome = harness
            .pipeline(FakeEngine::succeeding())
            .process_document(&document)
            .await
            .unwrap();

        assert_eq!(harness.output_names(), vec!["01 - My Story.mp3"]);
        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.files[0].title, "My Story");
    }

    #[tokio::test]
    async fn test_failed_chapter_does_not_stop_siblings() {
        let harness = Harness::new();
        let document = Document::new("Book", "").with_chapters(vec![
            Chapter::new("One", "First chapter.", 1),
            Chapter::new("Two", "Doomed chapter.", 2),
            Chapter::new("Three", "Last chapter.", 3),
        ]);
        let engine = FakeEngine::new(|text, _| {
            if text.contains("Doomed") {
                EngineBehavior::Reject("invalid voice".to_string())
            } else {
                EngineBehavior::Succeed
            }
        });

        let outcome = harness.pipeline(engine).process_document(&document).await.unwrap();

        assert_eq!(harness.output_names(), vec!["01 - One.mp3", "03 - Three.mp3"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].chapter, 2);
        match &outcome.failures[0].kind {
            FailureKind::Dropped { reason } => assert!(reason.contains("invalid voice"), "{}", reason),
            other => panic!("expected dropped chapter, got {:?}", other),
        }
        assert_eq!(harness.workspace_leftovers(), 0);
    }

    #[tokio::test]
    async fn test_partial_chapter_still_produced() {
        let harness = Harness::new();
        let mut options = harness.options();
        options.max_chunk_chars = 20;
        let content = "Good paragraph one.\n\nBad paragraph two.\n\nGood paragraph three.";
        let document =
            Document::new("Book", "").with_chapters(vec![Chapter::new("Mixed", content, 1)]);
        let engine = FakeEngine::new(|text, _| {
            if text.starts_with("Bad") {
                EngineBehavior::Hang
            } else {
                EngineBehavior::Succeed
            }
        });

        let outcome = harness
            .pipeline_with(engine, FakeConcatenator::new(), FakeTranscoder::new(), options)
            .process_document(&document)
            .await
            .unwrap();

        assert_eq!(outcome.files.len(), 1);
        assert_eq!(
            std::fs::read_to_string(&outcome.files[0].path).unwrap(),
            "audio:Good paragraph one.audio:Good paragraph three."
        );
        match &outcome.failures[0].kind {
            FailureKind::Partial {
                failed_chunks,
                total_chunks,
            } => {
                assert_eq!(*total_chunks, 3);
                assert_eq!(failed_chunks.len(), 1);
                assert_eq!(failed_chunks[0].ordinal, 1);
                assert!(failed_chunks[0].reason.contains("timed out"));
            }
            other => panic!("expected partial chapter, got {:?}", other),
        }
        assert_eq!(harness.workspace_leftovers(), 0);
    }

    #[tokio::test]
    async fn test_blank_chapter_dropped_without_synthesis() {
        let harness = Harness::new();
        let document = Document::new("Book", "").with_chapters(vec![
            Chapter::new("Empty", "   \n  ", 1),
            Chapter::new("Full", "Words here.", 2),
        ]);
        let engine = FakeEngine::succeeding();
        let pipeline = harness.pipeline(engine);

        let outcome = pipeline.process_document(&document).await.unwrap();

        assert_eq!(harness.output_names(), vec!["02 - Full.mp3"]);
        assert_eq!(
            outcome.failures[0].kind,
            FailureKind::Dropped {
                reason: "chapter has no content".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_empty_document_is_fatal() {
        let harness = Harness::new();
        let result = harness
            .pipeline(FakeEngine::succeeding())
            .process_document(&Document::new("Nothing", "  \n "))
            .await;
        assert!(matches!(result, Err(NarratorError::Validation(_))));
    }

    #[tokio::test]
    async fn test_bad_numbering_is_fatal() {
        let harness = Harness::new();
        let document = Document::new("Book", "").with_chapters(vec![
            Chapter::new("One", "a", 1),
            Chapter::new("Three", "c", 3),
        ]);
        let result = harness
            .pipeline(FakeEngine::succeeding())
            .process_document(&document)
            .await;
        assert!(matches!(result, Err(NarratorError::Validation(_))));
    }

    #[tokio::test]
    async fn test_combination_and_conversion_failures_drop_chapter() {
        let harness = Harness::new();
        let document = detected("Book", "Chapter 1\nHello.");

        let outcome = harness
            .pipeline_with(
                FakeEngine::succeeding(),
                FakeConcatenator::failing("sox FAIL formats"),
                FakeTranscoder::new(),
                harness.options(),
            )
            .process_document(&document)
            .await
            .unwrap();
        assert!(outcome.files.is_empty());
        assert_eq!(outcome.dropped_chapters().count(), 1);

        let outcome = harness
            .pipeline_with(
                FakeEngine::succeeding(),
                FakeConcatenator::new(),
                FakeTranscoder::failing("Unknown encoder"),
                harness.options(),
            )
            .process_document(&document)
            .await
            .unwrap();
        assert!(outcome.files.is_empty());
        match &outcome.failures[0].kind {
            FailureKind::Dropped { reason } => assert!(reason.contains("Unknown encoder")),
            other => panic!("expected dropped chapter, got {:?}", other),
        }
        assert!(harness.output_names().is_empty());
    }

    #[tokio::test]
    async fn test_failed_rerun_keeps_earlier_file() {
        let harness = Harness::new();
        let document = Document::new("Book", "").with_chapters(vec![Chapter::new("One", "First chapter.", 1)]);

        harness
            .pipeline(FakeEngine::succeeding())
            .process_document(&document)
            .await
            .unwrap();
        let written = harness.output_dir.join("01 - One.mp3");
        assert_eq!(std::fs::read_to_string(&written).unwrap(), "audio:First chapter.");

        let outcome = harness
            .pipeline_with(
                FakeEngine::succeeding(),
                FakeConcatenator::new(),
                FakeTranscoder::failing("disk full"),
                harness.options(),
            )
            .process_document(&document)
            .await
            .unwrap();

        assert_eq!(outcome.dropped_chapters().count(), 1);
        assert_eq!(harness.output_names(), vec!["01 - One.mp3"]);
        assert_eq!(std::fs::read_to_string(&written).unwrap(), "audio:First chapter.");
    }

    #[tokio::test]
    async fn test_cancelled_run_cleans_workspace_and_keeps_finished_chapters() {
        let harness = Harness::new();
        let mut options = harness.options();
        options.synthesis.timeout = Duration::from_secs(60);
        let document = Document::new("Book", "").with_chapters(vec![
            Chapter::new("One", "First chapter.", 1),
            Chapter::new("Two", "Stuck chapter.", 2),
            Chapter::new("Three", "Never reached.", 3),
        ]);
        let engine = FakeEngine::new(|text, _| {
            if text.starts_with("Stuck") {
                EngineBehavior::Hang
            } else {
                EngineBehavior::Succeed
            }
        });
        let pipeline = harness.pipeline_with(engine, FakeConcatenator::new(), FakeTranscoder::new(), options);

        let result = tokio::time::timeout(Duration::from_millis(200), pipeline.process_document(&document)).await;

        assert!(result.is_err());
        assert_eq!(harness.workspace_leftovers(), 0);
        assert_eq!(harness.output_names(), vec!["01 - One.mp3"]);
    }

    #[tokio::test]
    async fn test_workspace_removed_after_run() {
        let harness = Harness::new();
        let document = detected("Book", "Chapter 1\nHello.\n\nChapter 2\nAgain.");

        harness
            .pipeline(FakeEngine::succeeding())
            .process_document(&document)
            .await
            .unwrap();
        assert_eq!(harness.workspace_leftovers(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_chunks_keep_order() {
        let harness = Harness::new();
        let mut options = harness.options();
        options.max_chunk_chars = 10;
        options.chunk_workers = 4;
        options.chapter_workers = 2;
        options.synthesis_workers = 8;
        options.synthesis.timeout = Duration::from_secs(5);

        let content = "Alpha one.\n\nBravo two.\n\nCharlie 3.\n\nDelta four.";
        let document = Document::new("Book", "").with_chapters(vec![
            Chapter::new("First", content, 1),
            Chapter::new("Second", "Short.", 2),
        ]);
        // Earlier chunks finish last
        let engine = FakeEngine::new(|text, _| {
            let delay = match text.chars().next() {
                Some('A') => 120,
                Some('B') => 80,
                Some('C') => 40,
                _ => 0,
            };
            EngineBehavior::SucceedAfter(Duration::from_millis(delay))
        });

        let outcome = harness
            .pipeline_with(engine, FakeConcatenator::new(), FakeTranscoder::new(), options)
            .process_document(&document)
            .await
            .unwrap();

        assert!(outcome.is_clean());
        assert_eq!(outcome.files.iter().map(|f| f.chapter).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(
            std::fs::read_to_string(&outcome.files[0].path).unwrap(),
            "audio:Alpha one.audio:Bravo two.audio:Charlie 3.audio:Delta four."
        );
    }

    #[tokio::test]
    async fn test_synthesis_capped_across_chapters() {
        let harness = Harness::new();
        let mut options = harness.options();
        options.max_chunk_chars = 10;
        options.chapter_workers = 4;
        options.chunk_workers = 4;
        options.synthesis_workers = 2;
        options.synthesis.timeout = Duration::from_secs(5);

        let chapters = (1..=4)
            .map(|n| Chapter::new(format!("Part {}", n), "Alpha one.\n\nBravo two.\n\nCharlie 3.", n))
            .collect();
        let document = Document::new("Book", "").with_chapters(chapters);
        let engine = Arc::new(FakeEngine::new(|_, _| {
            EngineBehavior::SucceedAfter(Duration::from_millis(20))
        }));

        let outcome = Pipeline::new(
            Box::new(Arc::clone(&engine)),
            Box::new(FakeConcatenator::new()),
            Box::new(FakeTranscoder::new()),
            options,
        )
        .process_document(&document)
        .await
        .unwrap();

        assert!(outcome.is_clean());
        assert_eq!(outcome.files.len(), 4);
        assert_eq!(engine.peak_in_flight(), 2);
        let mut spoken = engine.calls();
        spoken.sort();
        spoken.dedup();
        assert_eq!(spoken, vec!["Alpha one.", "Bravo two.", "Charlie 3."]);
        assert_eq!(engine.call_count(), 12);
    }

    #[tokio::test]
    async fn test_blank_chapter_events_are_balanced() {
        let harness = Harness::new();
        let document = Document::new("Book", "").with_chapters(vec![Chapter::new("Empty", "  ", 1)]);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        harness
            .pipeline(FakeEngine::succeeding())
            .with_progress(move |event| sink.lock().unwrap().push(event.clone()))
            .process_document(&document)
            .await
            .unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                PipelineEvent::ChapterStarted {
                    chapter: 1,
                    title: "Empty".to_string(),
                    chunks: 0
                },
                PipelineEvent::ChapterFinished {
                    chapter: 1,
                    produced: false
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_progress_events() {
        let harness = Harness::new();
        let document = detected("Book", "Chapter 1\nHello.");
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        harness
            .pipeline(FakeEngine::succeeding())
            .with_progress(move |event| sink.lock().unwrap().push(event.clone()))
            .process_document(&document)
            .await
            .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                PipelineEvent::ChapterStarted {
                    chapter: 1,
                    title: "Chapter 1".to_string(),
                    chunks: 1
                },
                PipelineEvent::ChunkFinished {
                    chapter: 1,
                    ordinal: 0,
                    succeeded: true
                },
                PipelineEvent::ChapterFinished {
                    chapter: 1,
                    produced: true
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_m4b_uses_manifest() {
        let harness = Harness::new();
        let mut options = harness.options();
        options.format = TargetFormat::M4b;
        let transcoder = FakeTranscoder::new();
        let document = detected("Book", "Chapter 1\nHello.");

        let pipeline = harness.pipeline_with(FakeEngine::succeeding(), FakeConcatenator::new(), transcoder, options);
        let outcome = pipeline.process_document(&document).await.unwrap();

        assert_eq!(harness.output_names(), vec!["01 - Chapter 1.m4b"]);
        assert_eq!(std::fs::read_to_string(&outcome.files[0].path).unwrap(), "audio:Hello.");
    }
}
