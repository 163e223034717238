//! Per-case metric table
//!
//! Rows are case IDs plus synthetic summary rows, columns are flattened
//! metric names in first-insertion order. Cells may be absent (written as
//! empty CSV fields).

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::ScoreResult;

#[derive(Debug, Clone)]
pub struct Row {
    pub id: String,
    /// Synthetic statistics row (mean, std, quantiles) rather than a case.
    pub summary: bool,
    values: BTreeMap<String, f64>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl MetricTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, id: &str) -> Option<&Row> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Case rows only (summary rows excluded).
    pub fn case_count(&self) -> usize {
        self.rows.iter().filter(|row| !row.summary).count()
    }

    pub fn case_ids(&self) -> BTreeSet<String> {
        self.rows.iter().filter(|row| !row.summary).map(|row| row.id.clone()).collect()
    }

    fn intern_column(&mut self, name: &str) {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_owned());
        }
    }

    pub fn push_case(
        &mut self,
        id: impl Into<String>,
        metrics: impl IntoIterator<Item = (String, f64)>,
    ) {
        let mut values = BTreeMap::new();
        for (column, value) in metrics {
            self.intern_column(&column);
            values.insert(column, value);
        }
        self.rows.push(Row { id: id.into(), summary: false, values });
    }

    pub fn push_summary(&mut self, label: &str, values: BTreeMap<String, f64>) {
        for column in values.keys() {
            self.intern_column(column);
        }
        self.rows.push(Row { id: label.to_owned(), summary: true, values });
    }

    /// Apply `f` to every cell of every case row. Summary rows are not
    /// touched (they are derived after normalization and penalties).
    pub fn update_cases(&mut self, mut f: impl FnMut(&str, &mut f64)) {
        for row in self.rows.iter_mut().filter(|row| !row.summary) {
            for (column, value) in row.values.iter_mut() {
                f(column, value);
            }
        }
    }

    /// Finite-or-∞ values of a column over case rows; NaN cells and absent
    /// cells are skipped, matching how the summary statistics treat
    /// undefined values.
    pub fn column_values(&self, column: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter(|row| !row.summary)
            .filter_map(|row| row.get(column))
            .filter(|value| !value.is_nan())
            .collect()
    }

    /// Sort case rows by scan ID. Summary rows keep their append order at
    /// the end; this is a presentation order, not a matching concern.
    pub fn sort_cases(&mut self) {
        self.rows.sort_by(|a, b| match (a.summary, b.summary) {
            (false, false) => a.id.cmp(&b.id),
            (a, b) => a.cmp(&b),
        });
    }

    /// Write rows as CSV, keeping only columns accepted by `keep`.
    pub fn write_csv(&self, path: &Path, keep: impl Fn(&str) -> bool) -> ScoreResult<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let columns: Vec<&str> =
            self.columns.iter().map(String::as_str).filter(|c| keep(c)).collect();
        let mut header = Vec::with_capacity(columns.len() + 1);
        header.push("scan_id".to_owned());
        header.extend(columns.iter().map(|c| (*c).to_owned()));
        write_csv_row(&mut writer, &header)?;

        for row in &self.rows {
            let mut fields = Vec::with_capacity(columns.len() + 1);
            fields.push(row.id.clone());
            for &column in &columns {
                fields.push(row.get(column).map(fmt_cell).unwrap_or_default());
            }
            write_csv_row(&mut writer, &fields)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn fmt_cell(value: f64) -> String {
    if value.is_nan() {
        return String::new();
    }
    format!("{value}")
}

fn write_csv_row<W: Write>(writer: &mut W, row: &[impl AsRef<str>]) -> ScoreResult<()> {
    for (idx, value) in row.iter().enumerate() {
        if idx > 0 {
            writer.write_all(b",")?;
        }
        write_csv_value(writer, value.as_ref())?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}

fn write_csv_value<W: Write>(writer: &mut W, value: &str) -> ScoreResult<()> {
    let needs_quote = value.contains(',') || value.contains('"') || value.contains('\n');
    if !needs_quote {
        writer.write_all(value.as_bytes())?;
        return Ok(());
    }
    writer.write_all(b"\"")?;
    for ch in value.chars() {
        if ch == '"' {
            writer.write_all(b"\"\"")?;
        } else {
            let mut buf = [0_u8; 4];
            writer.write_all(ch.encode_utf8(&mut buf).as_bytes())?;
        }
    }
    writer.write_all(b"\"")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect()
    }

    #[test]
    fn columns_keep_first_insertion_order() {
        let mut table = MetricTable::new();
        table.push_case("b", metrics(&[("et_dice", 0.9), ("et_hd95", 3.0)]));
        table.push_case("a", metrics(&[("wt_dice", 0.8), ("et_dice", 0.7)]));
        assert_eq!(table.columns(), ["et_dice", "et_hd95", "wt_dice"]);

        table.sort_cases();
        let ids: Vec<&str> = table.rows().iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn summary_rows_stay_after_cases() {
        let mut table = MetricTable::new();
        table.push_case("z", metrics(&[("et_dice", 0.9)]));
        table.push_summary("mean", BTreeMap::from([("et_dice".to_owned(), 0.9)]));
        table.push_case("a", metrics(&[("et_dice", 0.5)]));
        table.sort_cases();

        let ids: Vec<&str> = table.rows().iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, ["a", "z", "mean"]);
        assert_eq!(table.case_count(), 2);
    }

    #[test]
    fn column_values_skip_nan_and_missing() {
        let mut table = MetricTable::new();
        table.push_case("a", metrics(&[("et_dice", 0.5)]));
        table.push_case("b", metrics(&[("et_dice", f64::NAN)]));
        table.push_case("c", metrics(&[("wt_dice", 1.0)]));
        assert_eq!(table.column_values("et_dice"), [0.5]);
    }

    #[test]
    fn csv_writes_empty_fields_and_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.csv");

        let mut table = MetricTable::new();
        table.push_case("case,1", metrics(&[("et_dice", 0.5)]));
        table.push_case("case-2", metrics(&[("et_hd95", 374.0)]));
        table.write_csv(&path, |_| true).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "scan_id,et_dice,et_hd95\n\"case,1\",0.5,\ncase-2,,374\n");
    }

    #[test]
    fn csv_column_filter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.csv");

        let mut table = MetricTable::new();
        table.push_case("a", metrics(&[("et_lesionwise_dice", 0.5), ("et_dice", 0.6)]));
        table.write_csv(&path, |c| c.contains("lesionwise")).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "scan_id,et_lesionwise_dice\na,0.5\n");
    }
}
