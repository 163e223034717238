//! Cohort-specific metric dispatch
//!
//! Selects the cohort's registered engine for each matched case and
//! flattens the engine's nested output through the declared (tissue,
//! statistic) schema. Anything outside the allow-lists is discarded, even
//! if the engine produced it.

use crate::cohort::CohortProfile;
use crate::engine::{EngineRegistry, RawCaseResult};
use crate::error::{ScoreError, ScoreResult};
use crate::subject::MatchedCase;

/// Flatten a raw result into `"{tissue}_{statistic}"` scalars in schema
/// order.
pub fn flatten_case(raw: &RawCaseResult, profile: &CohortProfile) -> Vec<(String, f64)> {
    let mut metrics = Vec::new();
    for tissue in profile.tissues {
        for statistic in profile.statistics {
            if let Some(value) = raw.get(tissue, statistic) {
                metrics.push((format!("{tissue}_{statistic}"), value));
            }
        }
    }
    metrics
}

/// Score one matched case with its cohort's engine.
///
/// A case whose cohort was never resolved (missing mapping entry) fails
/// here rather than silently defaulting to the run cohort.
pub fn score_case(
    registry: &EngineRegistry,
    case: &MatchedCase,
) -> ScoreResult<Vec<(String, f64)>> {
    let cohort = case.cohort.ok_or_else(|| {
        ScoreError::UnknownCohort(format!("no cohort resolved for case {}", case.scan_id))
    })?;
    let engine = registry.get(cohort)?;
    let raw = engine
        .score_case(&case.prediction, &case.ground_truth, cohort)
        .map_err(|err| match err {
            // Re-key engine failures to the matched scan ID.
            ScoreError::Computation { message, .. } => {
                ScoreError::Computation { scan_id: case.scan_id.clone(), message }
            }
            other => other,
        })?;
    Ok(flatten_case(&raw, cohort.profile()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::Cohort;
    use crate::engine::MetricEngine;
    use std::path::{Path, PathBuf};

    struct FixedEngine(RawCaseResult);

    impl MetricEngine for FixedEngine {
        fn score_case(
            &self,
            _prediction: &Path,
            _ground_truth: &Path,
            _cohort: Cohort,
        ) -> ScoreResult<RawCaseResult> {
            Ok(self.0.clone())
        }
    }

    struct FailingEngine;

    impl MetricEngine for FailingEngine {
        fn score_case(
            &self,
            prediction: &Path,
            _ground_truth: &Path,
            _cohort: Cohort,
        ) -> ScoreResult<RawCaseResult> {
            Err(ScoreError::Computation {
                scan_id: prediction.display().to_string(),
                message: "shape mismatch".to_owned(),
            })
        }
    }

    fn case(cohort: Option<Cohort>) -> MatchedCase {
        MatchedCase {
            scan_id: "00001-000".to_owned(),
            prediction: PathBuf::from("pred/x.nii.gz"),
            ground_truth: PathBuf::from("gt/x-seg.nii.gz"),
            cohort,
        }
    }

    #[test]
    fn flattening_honors_allow_lists_and_order() {
        let mut raw = RawCaseResult::new();
        raw.set("wt", "dice", 0.8);
        raw.set("et", "dice", 0.9);
        raw.set("et", "hd95", 2.0);
        raw.set("et", "exotic_stat", 123.0);
        raw.set("brainstem", "dice", 0.7);

        let metrics = flatten_case(&raw, Cohort::Men.profile());
        let keys: Vec<&str> = metrics.iter().map(|(k, _)| k.as_str()).collect();
        // MEN schema order: et, tc, wt; allow-listed statistics only.
        assert_eq!(keys, ["et_dice", "et_hd95", "wt_dice"]);
        assert_eq!(metrics[0].1, 0.9);
    }

    #[test]
    fn unresolved_cohort_fails_dispatch() {
        let registry = EngineRegistry::new();
        let err = score_case(&registry, &case(None)).unwrap_err();
        assert!(matches!(err, ScoreError::UnknownCohort(_)));
    }

    #[test]
    fn computation_failures_carry_the_scan_id() {
        let mut registry = EngineRegistry::new();
        registry.register(Cohort::Gli, Box::new(FailingEngine));
        let err = score_case(&registry, &case(Some(Cohort::Gli))).unwrap_err();
        assert!(
            matches!(err, ScoreError::Computation { scan_id, .. } if scan_id == "00001-000")
        );
    }

    #[test]
    fn fixed_engine_round_trip() {
        let mut raw = RawCaseResult::new();
        raw.set("gtv", "dice", 0.95);
        raw.set("gtv", "hd95", 1.5);
        let mut registry = EngineRegistry::new();
        registry.register(Cohort::MenRt, Box::new(FixedEngine(raw)));

        let metrics = score_case(&registry, &case(Some(Cohort::MenRt))).unwrap();
        assert_eq!(
            metrics,
            [("gtv_dice".to_owned(), 0.95), ("gtv_hd95".to_owned(), 1.5)]
        );
    }
}
