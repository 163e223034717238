//! Descriptive statistics over the per-case rows
//!
//! Appends `mean`, `std`, `25quantile`, `median` and `75quantile` rows to
//! the table. Count/min/max are not retained as output rows.

use std::collections::BTreeMap;

use crate::table::MetricTable;

/// Labels of the synthetic rows, in append order.
pub const SUMMARY_LABELS: &[&str] = &["mean", "std", "25quantile", "median", "75quantile"];

/// Compute per-column statistics over case rows and append the summary
/// rows. Columns with no defined values are left absent in every summary
/// row; `std` is absent for columns with fewer than two values.
pub fn append_summary(table: &mut MetricTable) {
    let columns: Vec<String> = table.columns().to_vec();
    let mut summaries: Vec<BTreeMap<String, f64>> =
        (0..SUMMARY_LABELS.len()).map(|_| BTreeMap::new()).collect();

    for column in &columns {
        let mut values = table.column_values(column);
        if values.is_empty() {
            continue;
        }
        values.sort_by(f64::total_cmp);

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        summaries[0].insert(column.clone(), mean);
        if let Some(std) = sample_std(&values, mean) {
            summaries[1].insert(column.clone(), std);
        }
        summaries[2].insert(column.clone(), quantile(&values, 0.25));
        summaries[3].insert(column.clone(), quantile(&values, 0.5));
        summaries[4].insert(column.clone(), quantile(&values, 0.75));
    }

    for (label, values) in SUMMARY_LABELS.iter().zip(summaries) {
        table.push_summary(label, values);
    }
}

/// Sample standard deviation (ddof = 1); undefined for fewer than two
/// values.
fn sample_std(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Linearly interpolated quantile of pre-sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (h - lo as f64)
}
