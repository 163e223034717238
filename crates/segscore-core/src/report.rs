//! Result document for the calling orchestration system
//!
//! A single bounded JSON object: selected mean metrics, case count, storage
//! identifiers and a submission status. Undefined fields are omitted, never
//! emitted as null, and error strings are truncated because the downstream
//! notification channel enforces a size limit.

use serde_json::{Map, Value, json};

use crate::error::{ScoreError, ScoreResult};
use crate::table::MetricTable;

/// Hard upper bound on annotation fields accepted downstream.
pub const MAX_ANNOTATIONS: usize = 100;
/// Character limit of the `submission_errors` field.
pub const MAX_ERROR_CHARS: usize = 500;

pub const STATUS_SCORED: &str = "SCORED";
pub const STATUS_INVALID: &str = "INVALID";

/// Truncate an error string to at most [`MAX_ERROR_CHARS`] characters,
/// keeping the first 496 and appending an ellipsis.
pub fn truncate_errors(message: &str) -> String {
    if message.chars().count() <= MAX_ERROR_CHARS {
        return message.to_owned();
    }
    let mut truncated: String = message.chars().take(MAX_ERROR_CHARS - 4).collect();
    truncated.push_str("...");
    truncated
}

/// Select the annotation subset from the table's mean row.
///
/// Keeps columns whose name contains any marker (case-insensitive),
/// dropping values that are undefined. Exceeding [`MAX_ANNOTATIONS`] is an
/// error: the filter must be verified against the metric vocabulary, not
/// silently trimmed at runtime.
pub fn select_annotations(
    table: &MetricTable,
    markers: &[&str],
) -> ScoreResult<Vec<(String, f64)>> {
    let Some(mean) = table.rows().iter().find(|row| row.summary && row.id == "mean") else {
        return Ok(Vec::new());
    };

    let mut selected = Vec::new();
    for column in table.columns() {
        let lower = column.to_ascii_lowercase();
        if !markers.iter().any(|marker| lower.contains(&marker.to_ascii_lowercase())) {
            continue;
        }
        if let Some(value) = mean.get(column) {
            if value.is_finite() {
                selected.push((column.clone(), value));
            }
        }
    }

    if selected.len() > MAX_ANNOTATIONS {
        return Err(ScoreError::AnnotationBound {
            limit: MAX_ANNOTATIONS,
            actual: selected.len(),
        });
    }
    Ok(selected)
}

/// Document for a successfully scored submission.
pub fn scored_document(
    annotations: &[(String, f64)],
    cases_evaluated: usize,
    scores_id: &str,
    full_scores_id: Option<&str>,
) -> Value {
    let mut fields = Map::new();
    for (name, value) in annotations {
        fields.insert(name.clone(), json!(value));
    }
    fields.insert("cases_evaluated".to_owned(), json!(cases_evaluated));
    fields.insert("submission_scores".to_owned(), json!(scores_id));
    if let Some(id) = full_scores_id {
        fields.insert("submission_scores_full".to_owned(), json!(id));
    }
    fields.insert("submission_status".to_owned(), json!(STATUS_SCORED));
    Value::Object(fields)
}

/// Document for a submission that could not be scored.
pub fn invalid_document(message: &str) -> Value {
    json!({
        "submission_errors": truncate_errors(message),
        "submission_status": STATUS_INVALID,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::Cohort;
    use std::collections::BTreeMap;

    #[test]
    fn truncation_law() {
        let short = "a".repeat(500);
        assert_eq!(truncate_errors(&short), short);

        let long = "b".repeat(501);
        let truncated = truncate_errors(&long);
        assert_eq!(truncated.chars().count(), 499);
        assert_eq!(truncated, format!("{}...", "b".repeat(496)));
    }

    #[test]
    fn annotation_selection_filters_and_drops_undefined() {
        let mut table = MetricTable::new();
        table.push_case(
            "00001-000",
            vec![
                ("et_dice".to_owned(), 0.9),
                ("et_nsd_0_5".to_owned(), 0.8),
                ("et_num_tp".to_owned(), 3.0),
            ],
        );
        let mut mean = BTreeMap::new();
        mean.insert("et_dice".to_owned(), 0.9);
        mean.insert("et_nsd_0_5".to_owned(), f64::NAN);
        mean.insert("et_num_tp".to_owned(), 3.0);
        table.push_summary("mean", mean);

        let selected = select_annotations(&table, &["dice", "nsd"]).unwrap();
        assert_eq!(selected, [("et_dice".to_owned(), 0.9)]);
    }

    #[test]
    fn annotation_bound_holds_for_every_cohort_vocabulary() {
        for &cohort in Cohort::ALL {
            let profile = cohort.profile();
            let count = profile
                .tissues
                .iter()
                .flat_map(|tissue| {
                    profile.statistics.iter().map(move |stat| format!("{tissue}_{stat}"))
                })
                .filter(|column| {
                    profile.annotation_markers.iter().any(|marker| column.contains(marker))
                })
                .count();
            assert!(
                count <= MAX_ANNOTATIONS,
                "{cohort}: {count} annotation fields exceed the bound"
            );
        }
    }

    #[test]
    fn documents_have_expected_shape() {
        let annotations = vec![("et_dice".to_owned(), 0.875)];
        let doc = scored_document(&annotations, 2, "store/all_scores.csv", None);
        assert_eq!(doc["submission_status"], "SCORED");
        assert_eq!(doc["cases_evaluated"], 2);
        assert_eq!(doc["et_dice"], 0.875);
        assert!(doc.get("submission_scores_full").is_none());
        assert!(doc.get("submission_errors").is_none());

        let doc = invalid_document("bad filenames");
        assert_eq!(doc["submission_status"], "INVALID");
        assert_eq!(doc["submission_errors"], "bad filenames");
    }
}
