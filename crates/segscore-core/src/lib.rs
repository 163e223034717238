//! Submission scoring pipeline for multi-task medical-image-segmentation
//! challenges.
//!
//! Given an archive of predicted label maps and one or two archives of
//! ground-truth label maps, the pipeline pairs cases by scan ID, runs the
//! cohort-specific metric engine per case, penalizes missing cases,
//! aggregates descriptive statistics and emits a bounded JSON result record
//! for the calling orchestration system.

pub mod archive;
pub mod cohort;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod penalty;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod storage;
pub mod subject;
pub mod table;

pub use cohort::{
    Cohort, CohortProfile, CsvLayout, DEFAULT_GOLD_PATTERN, DEFAULT_PRED_PATTERN,
    LABELED_GOLD_PATTERN, LABELED_PRED_PATTERN,
};
pub use engine::{CommandEngine, EngineRegistry, MetricEngine, RawCaseResult};
pub use error::{ScoreError, ScoreResult};
pub use pipeline::{RunConfig, score_submission};
pub use report::{MAX_ANNOTATIONS, MAX_ERROR_CHARS};
pub use storage::{LocalDirStore, ResultStore};
pub use subject::{LabelMapping, MatchedCase};
pub use table::MetricTable;
