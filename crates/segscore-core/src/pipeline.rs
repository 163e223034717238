//! End-to-end submission scoring
//!
//! Inspect → match → dispatch → normalize → penalize → aggregate → store →
//! report. Purely sequential; no state survives across submissions.
//! Submission faults become an `"INVALID"` result document, everything
//! else propagates to the caller.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde_json::Value;

use crate::archive;
use crate::cohort::{Cohort, CohortProfile, CsvLayout};
use crate::dispatch;
use crate::engine::EngineRegistry;
use crate::error::{ScoreError, ScoreResult};
use crate::penalty;
use crate::report;
use crate::stats;
use crate::storage::ResultStore;
use crate::subject::{self, LabelMapping, MatchConfig};
use crate::table::MetricTable;

pub const SCORES_CSV: &str = "all_scores.csv";
pub const FULL_SCORES_CSV: &str = "all_full_scores.csv";

/// Inputs of one scoring run.
pub struct RunConfig {
    pub predictions: PathBuf,
    pub goldstandard: PathBuf,
    /// Secondary goldstandard pool, merged with the primary before
    /// matching.
    pub second_goldstandard: Option<PathBuf>,
    pub cohort: Cohort,
    /// Case → cohort mapping table for multi-cohort runs.
    pub mapping_file: Option<PathBuf>,
    /// Override of the prediction ID pattern.
    pub pred_pattern: Option<String>,
    /// Override of the ground-truth ID pattern.
    pub gold_pattern: Option<String>,
    /// Scratch directory for extraction and CSV staging.
    pub workdir: PathBuf,
}

/// Score a submission, mapping submission faults to an `"INVALID"`
/// document. Storage and I/O failures are returned as errors: there is no
/// meaningful partial result to report.
pub fn score_submission(
    config: &RunConfig,
    registry: &EngineRegistry,
    store: &dyn ResultStore,
) -> ScoreResult<Value> {
    match run_scoring(config, registry, store) {
        Ok(document) => Ok(document),
        Err(err) if err.is_submission_fault() => {
            log::warn!("submission cannot be scored: {err}");
            Ok(report::invalid_document(&err.to_string()))
        }
        Err(err) => Err(err),
    }
}

fn run_scoring(
    config: &RunConfig,
    registry: &EngineRegistry,
    store: &dyn ResultStore,
) -> ScoreResult<Value> {
    let pred_dir = config.workdir.join("pred");
    let gold_dir = config.workdir.join("gt");

    let predictions = archive::inspect(&config.predictions, Some(&pred_dir), "")?;
    let mut ground_truths = archive::inspect(&config.goldstandard, Some(&gold_dir), "")?;
    if let Some(second) = &config.second_goldstandard {
        ground_truths.extend(archive::inspect(second, Some(&gold_dir), "")?);
    }
    log::info!(
        "inspected archives: {} predictions, {} ground-truth cases",
        predictions.len(),
        ground_truths.len()
    );
    if predictions.is_empty() {
        return Err(ScoreError::EmptySubmission);
    }

    // The mapping table only applies to the multi-cohort task; every other
    // cohort is fixed for the run.
    let mapping = match &config.mapping_file {
        Some(path) if config.cohort == Cohort::Goat => Some(LabelMapping::load(path)?),
        Some(path) => {
            log::warn!(
                "mapping file {} ignored for single-cohort run ({})",
                path.display(),
                config.cohort
            );
            None
        }
        None => None,
    };

    let profile = config.cohort.profile();
    let pred_pattern = config.pred_pattern.as_deref().unwrap_or(profile.pred_pattern);
    let gold_pattern = config.gold_pattern.as_deref().unwrap_or(profile.gold_pattern);

    let gold_index = subject::index_ground_truths(&ground_truths, gold_pattern)?;
    let match_config = MatchConfig {
        pred_pattern,
        gold_pattern,
        run_cohort: config.cohort,
        add_missing_label: profile.add_missing_label,
        mapping: mapping.as_ref(),
    };
    let cases =
        subject::match_cases(&predictions, &gold_index, &pred_dir, &gold_dir, &match_config)?;
    log::info!("matched {} of {} ground-truth cases", cases.len(), gold_index.len());
    if cases.is_empty() {
        return Err(ScoreError::EmptySubmission);
    }

    let mut table = MetricTable::new();
    for case in &cases {
        let metrics = dispatch::score_case(registry, case)?;
        table.push_case(case.scan_id.clone(), metrics);
    }

    penalty::normalize_special_values(&mut table, profile.max_distance);
    let gold_ids: BTreeSet<String> = gold_index.keys().cloned().collect();
    penalty::penalize_missing(&mut table, &gold_ids, profile.max_distance);
    table.sort_cases();

    let cases_evaluated = table.case_count();
    stats::append_summary(&mut table);

    let (scores_id, full_scores_id) = store_artifacts(&table, profile, config, store)?;
    let annotations = report::select_annotations(&table, profile.annotation_markers)?;
    Ok(report::scored_document(
        &annotations,
        cases_evaluated,
        &scores_id,
        full_scores_id.as_deref(),
    ))
}

/// Write and store the per-case CSV artifacts.
///
/// With a split layout, participants see the lesion-wise/count columns and
/// the remaining columns go to an organizer-only CSV.
fn store_artifacts(
    table: &MetricTable,
    profile: &CohortProfile,
    config: &RunConfig,
    store: &dyn ResultStore,
) -> ScoreResult<(String, Option<String>)> {
    let scores_path = config.workdir.join(SCORES_CSV);
    match profile.csv_layout {
        CsvLayout::Single => {
            table.write_csv(&scores_path, |_| true)?;
            Ok((store.store(&scores_path)?, None))
        }
        CsvLayout::Split { participant_markers } => {
            let is_participant = |column: &str| {
                let lower = column.to_ascii_lowercase();
                participant_markers.iter().any(|marker| lower.contains(marker))
            };
            table.write_csv(&scores_path, is_participant)?;
            let full_path = config.workdir.join(FULL_SCORES_CSV);
            table.write_csv(&full_path, |column| !is_participant(column))?;
            let scores_id = store.store(&scores_path)?;
            let full_id = store.store(&full_path)?;
            Ok((scores_id, Some(full_id)))
        }
    }
}
