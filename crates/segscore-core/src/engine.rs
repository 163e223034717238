//! Metric engines and the cohort-keyed registry
//!
//! Engines are external collaborators: they take a prediction volume and a
//! ground-truth volume and return a nested per-tissue, per-statistic result.
//! The pipeline only depends on the `MetricEngine` trait; adding a cohort
//! means registering an engine, not editing a branch chain.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use crate::cohort::Cohort;
use crate::error::{ScoreError, ScoreResult};

/// Nested engine output: tissue label → statistic name → value.
///
/// JSON `null` stands in for an undefined value (JSON cannot express NaN)
/// and is carried as `f64::NAN` until normalization.
#[derive(Debug, Clone, Default)]
pub struct RawCaseResult {
    tissues: BTreeMap<String, BTreeMap<String, f64>>,
}

impl RawCaseResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, tissue: &str, statistic: &str, value: f64) {
        self.tissues.entry(tissue.to_owned()).or_default().insert(statistic.to_owned(), value);
    }

    pub fn get(&self, tissue: &str, statistic: &str) -> Option<f64> {
        self.tissues.get(tissue).and_then(|stats| stats.get(statistic)).copied()
    }

    /// Parse engine stdout: a JSON object of objects with numeric or null
    /// leaves. Non-numeric leaves are discarded.
    pub fn parse(text: &str) -> Result<RawCaseResult, String> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|err| format!("invalid JSON output: {err}"))?;
        let object = value.as_object().ok_or("engine output is not a JSON object")?;

        let mut result = RawCaseResult::new();
        for (tissue, stats) in object {
            let Some(stats) = stats.as_object() else {
                return Err(format!("entry for tissue {tissue} is not a JSON object"));
            };
            for (statistic, leaf) in stats {
                let value = if leaf.is_null() {
                    f64::NAN
                } else if let Some(number) = leaf.as_f64() {
                    number
                } else {
                    continue;
                };
                result.set(tissue, statistic, value);
            }
        }
        Ok(result)
    }
}

/// A per-case metric computation, stateless from the pipeline's view.
pub trait MetricEngine {
    fn score_case(
        &self,
        prediction: &Path,
        ground_truth: &Path,
        cohort: Cohort,
    ) -> ScoreResult<RawCaseResult>;
}

/// Cohort → engine registry.
#[derive(Default)]
pub struct EngineRegistry {
    engines: BTreeMap<Cohort, Box<dyn MetricEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, cohort: Cohort, engine: Box<dyn MetricEngine>) {
        self.engines.insert(cohort, engine);
    }

    /// An unrecognized cohort is an error, never a silent fallback.
    pub fn get(&self, cohort: Cohort) -> ScoreResult<&dyn MetricEngine> {
        self.engines
            .get(&cohort)
            .map(|engine| engine.as_ref())
            .ok_or_else(|| ScoreError::UnknownCohort(cohort.label().to_owned()))
    }
}

/// Engine adapter that shells out to an external metrics program.
///
/// Invocation: `<program> [extra args] --prediction P --ground-truth G
/// --cohort LABEL`; the program prints the nested result as JSON on stdout.
pub struct CommandEngine {
    program: String,
    extra_args: Vec<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self { program: program.into(), extra_args }
    }
}

impl MetricEngine for CommandEngine {
    fn score_case(
        &self,
        prediction: &Path,
        ground_truth: &Path,
        cohort: Cohort,
    ) -> ScoreResult<RawCaseResult> {
        log::debug!(
            "running {} for {} against {}",
            self.program,
            prediction.display(),
            ground_truth.display()
        );
        // Spawn failures are fatal (misconfigured engine), command failures
        // are a fault of the scored case.
        let output = Command::new(&self.program)
            .args(&self.extra_args)
            .arg("--prediction")
            .arg(prediction)
            .arg("--ground-truth")
            .arg(ground_truth)
            .arg("--cohort")
            .arg(cohort.label())
            .output()?;

        let case = prediction
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| prediction.display().to_string());

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScoreError::Computation {
                scan_id: case,
                message: format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        RawCaseResult::parse(&stdout)
            .map_err(|message| ScoreError::Computation { scan_id: case, message })
    }
}
