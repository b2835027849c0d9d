//! Per-document orchestration: workspace, naming, outcome and the pipeline itself.

pub mod naming;
pub mod orchestrator;
pub mod outcome;
pub mod workspace;

pub use naming::{final_file_name, sanitize_title};
pub use orchestrator::{Pipeline, PipelineEvent, PipelineOptions};
pub use outcome::{ChapterFailure, ChunkFailure, FailureKind, PipelineOutcome, ProducedChapter};
pub use workspace::Workspace;
