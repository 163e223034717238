//! Error types for the scoring pipeline
//!
//! Submission faults are recoverable at run level: the pipeline turns them
//! into an `"INVALID"` result document instead of failing the process.

/// Scoring pipeline errors
#[derive(thiserror::Error, Debug)]
pub enum ScoreError {
    /// Filename from which no scan ID could be extracted
    #[error(
        "filename does not follow the expected naming format: {0}; \
         case identity cannot be established"
    )]
    IdentifierParse(String),

    /// Same scan ID supplied by more than one ground-truth pool
    #[error("duplicate ground-truth id: {0}")]
    DuplicateGroundTruth(String),

    /// Cohort with no registered metric engine, or unresolved cohort
    #[error("no metric engine available for cohort: {0}")]
    UnknownCohort(String),

    /// Archive yielded no scorable predictions
    #[error("submission contains no scorable predictions; it must be a tarball or zipped archive of NIfTI files")]
    EmptySubmission,

    /// Metric engine failed on a specific case
    #[error("metric computation failed for case {scan_id}: {message}")]
    Computation { scan_id: String, message: String },

    /// Annotation subset larger than the downstream system accepts
    #[error("annotation subset has {actual} fields, exceeding the limit of {limit}")]
    AnnotationBound { limit: usize, actual: usize },

    /// Result store rejected an artifact
    #[error("failed to store {path}: {message}")]
    Storage { path: String, message: String },

    /// File I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScoreError {
    /// Whether the error reflects a problem with the submission itself.
    ///
    /// Faults of the submission produce an `"INVALID"` result document;
    /// everything else (I/O, storage, misconfiguration) is fatal for the
    /// process.
    pub fn is_submission_fault(&self) -> bool {
        matches!(
            self,
            ScoreError::IdentifierParse(_)
                | ScoreError::DuplicateGroundTruth(_)
                | ScoreError::UnknownCohort(_)
                | ScoreError::EmptySubmission
                | ScoreError::Computation { .. }
        )
    }
}

/// Result type for scoring operations
pub type ScoreResult<T> = Result<T, ScoreError>;
