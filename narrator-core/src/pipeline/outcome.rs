//! What a document run produced and what it had to give up on.

use serde::Serialize;
use std::path::PathBuf;

/// A final file written to the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProducedChapter {
    pub chapter: usize,
    pub title: String,
    pub path: PathBuf,
}

/// A chunk that could not be synthesized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkFailure {
    pub ordinal: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// The chapter was produced from its remaining chunks
    Partial {
        failed_chunks: Vec<ChunkFailure>,
        total_chunks: usize,
    },
    /// No final file was produced
    Dropped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterFailure {
    pub chapter: usize,
    pub title: String,
    #[serde(flatten)]
    pub kind: FailureKind,
}

/// Final files plus failures for one document, both in chapter order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineOutcome {
    pub files: Vec<ProducedChapter>,
    pub failures: Vec<ChapterFailure>,
}

impl PipelineOutcome {
    /// Every chapter produced with no lost chunks.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn dropped_chapters(&self) -> impl Iterator<Item = &ChapterFailure> {
        self.failures
            .iter()
            .filter(|f| matches!(f.kind, FailureKind::Dropped { .. }))
    }

    pub fn partial_chapters(&self) -> impl Iterator<Item = &ChapterFailure> {
        self.failures
            .iter()
            .filter(|f| matches!(f.kind, FailureKind::Partial { .. }))
    }
}
