//! Undefined-value normalization and missing-case penalties
//!
//! Normalization of already-scored cases runs first, synthetic penalty rows
//! for entirely missing cases second; both use the same constants so a
//! partially failed case and a wholly missing case are penalized
//! identically for the metrics they both lack.

use std::collections::BTreeSet;

use crate::table::MetricTable;

/// Column-name suffixes of surface-distance metrics.
pub const DISTANCE_MARKERS: &[&str] = &["hd95", "hausdorff95"];
/// Column-name fragments of similarity/overlap metrics.
pub const SIMILARITY_MARKERS: &[&str] = &["dice", "dsc", "nsd"];

pub fn is_distance_column(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    DISTANCE_MARKERS.iter().any(|marker| lower.ends_with(marker))
}

pub fn is_similarity_column(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    !is_distance_column(name) && SIMILARITY_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Replace undefined values in scored rows.
///
/// Similarity columns: NaN → 1 (empty reference and empty prediction agree
/// perfectly), ∞ → 0. Distance columns: NaN → 0, ∞ → `max_distance`.
/// Other columns (counts, rates) are left as produced. Idempotent.
pub fn normalize_special_values(table: &mut MetricTable, max_distance: f64) {
    table.update_cases(|column, value| {
        if is_distance_column(column) {
            if value.is_nan() {
                *value = 0.0;
            } else if value.is_infinite() {
                *value = max_distance;
            }
        } else if is_similarity_column(column) {
            if value.is_nan() {
                *value = 1.0;
            } else if value.is_infinite() {
                *value = 0.0;
            }
        }
    });
}

/// Inject worst-case rows for every ground-truth case the participant did
/// not submit: `max_distance` in distance columns, 0 everywhere else.
pub fn penalize_missing(
    table: &mut MetricTable,
    ground_truth_ids: &BTreeSet<String>,
    max_distance: f64,
) {
    let scored = table.case_ids();
    let columns: Vec<String> = table.columns().to_vec();
    for id in ground_truth_ids.difference(&scored) {
        let row: Vec<(String, f64)> = columns
            .iter()
            .map(|column| {
                let value = if is_distance_column(column) { max_distance } else { 0.0 };
                (column.clone(), value)
            })
            .collect();
        log::info!("no prediction for case {id}; penalty scores assigned");
        table.push_case(id.clone(), row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
    }

    #[test]
    fn column_classes() {
        assert!(is_distance_column("et_hd95"));
        assert!(is_distance_column("et_lesionwise_hd95"));
        assert!(is_distance_column("gtv_Hausdorff95"));
        assert!(!is_distance_column("et_dice"));

        assert!(is_similarity_column("et_dice"));
        assert!(is_similarity_column("et_lesionwise_nsd_0_5"));
        assert!(is_similarity_column("wt_global_bin_dsc"));
        assert!(!is_similarity_column("et_hd95"));
        assert!(!is_similarity_column("et_num_tp"));
    }

    #[test]
    fn normalization_maps_nan_and_infinity() {
        let mut table = MetricTable::new();
        table.push_case(
            "00001-000",
            metrics(&[
                ("et_dice", f64::NAN),
                ("wt_nsd_0_5", f64::INFINITY),
                ("et_hd95", f64::INFINITY),
                ("wt_hd95", f64::NAN),
                ("et_num_tp", 3.0),
            ]),
        );
        normalize_special_values(&mut table, 374.0);

        let row = table.row("00001-000").unwrap();
        assert_eq!(row.get("et_dice"), Some(1.0));
        assert_eq!(row.get("wt_nsd_0_5"), Some(0.0));
        assert_eq!(row.get("et_hd95"), Some(374.0));
        assert_eq!(row.get("wt_hd95"), Some(0.0));
        assert_eq!(row.get("et_num_tp"), Some(3.0));
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut table = MetricTable::new();
        table.push_case(
            "a",
            metrics(&[("et_dice", f64::NAN), ("et_hd95", f64::INFINITY), ("wt_dice", 0.42)]),
        );
        normalize_special_values(&mut table, 374.0);
        let once: Vec<Option<f64>> = ["et_dice", "et_hd95", "wt_dice"]
            .iter()
            .map(|c| table.row("a").unwrap().get(c))
            .collect();
        normalize_special_values(&mut table, 374.0);
        let twice: Vec<Option<f64>> = ["et_dice", "et_hd95", "wt_dice"]
            .iter()
            .map(|c| table.row("a").unwrap().get(c))
            .collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn penalty_rows_complete_the_ground_truth_set() {
        let mut table = MetricTable::new();
        table.push_case("00001-000", metrics(&[("et_dice", 0.9), ("et_hd95", 2.0)]));

        let gold: BTreeSet<String> =
            ["00001-000", "00002-000"].iter().map(|s| (*s).to_owned()).collect();
        penalize_missing(&mut table, &gold, 374.0);

        assert_eq!(table.case_ids(), gold);
        let penalized = table.row("00002-000").unwrap();
        assert_eq!(penalized.get("et_dice"), Some(0.0));
        assert_eq!(penalized.get("et_hd95"), Some(374.0));

        // Scored rows are untouched.
        let scored = table.row("00001-000").unwrap();
        assert_eq!(scored.get("et_dice"), Some(0.9));
    }
}
