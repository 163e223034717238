//! Case identity: scan-ID extraction, prediction/ground-truth matching and
//! per-case cohort resolution
//!
//! Scan IDs are extracted with a single capturing pattern anchored to the
//! filename suffix. A filename that does not match is a hard failure for
//! the whole run: case identity would otherwise be ambiguous.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::cohort::Cohort;
use crate::error::{ScoreError, ScoreResult};

/// One prediction joined to its ground-truth case.
#[derive(Debug, Clone)]
pub struct MatchedCase {
    pub scan_id: String,
    pub prediction: PathBuf,
    pub ground_truth: PathBuf,
    /// `None` when the mapping table had no entry for the case; dispatch
    /// must fail such a case instead of defaulting.
    pub cohort: Option<Cohort>,
}

/// Matching parameters for one scoring run.
pub struct MatchConfig<'a> {
    pub pred_pattern: &'a str,
    pub gold_pattern: &'a str,
    pub run_cohort: Cohort,
    /// Rewrite prediction IDs missing the cohort label prefix.
    pub add_missing_label: bool,
    pub mapping: Option<&'a LabelMapping>,
}

fn compile(pattern: &str) -> ScoreResult<Regex> {
    Regex::new(pattern).map_err(|err| {
        ScoreError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid id pattern {pattern:?}: {err}"),
        ))
    })
}

fn extract_id(re: &Regex, filename: &str) -> ScoreResult<String> {
    re.captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
        .ok_or_else(|| ScoreError::IdentifierParse(filename.to_owned()))
}

/// Index ground-truth filenames by scan ID.
///
/// The names may come from more than one goldstandard pool; the same ID
/// appearing twice is a validation error rather than a silent pick.
pub fn index_ground_truths(
    names: &[String],
    gold_pattern: &str,
) -> ScoreResult<BTreeMap<String, String>> {
    let re = compile(gold_pattern)?;
    let mut index = BTreeMap::new();
    for name in names {
        let id = extract_id(&re, name)?;
        if index.insert(id.clone(), name.clone()).is_some() {
            return Err(ScoreError::DuplicateGroundTruth(id));
        }
    }
    Ok(index)
}

/// Inner join of predictions onto the ground-truth index.
///
/// Only cases present on both sides are scored. Predictions with an ID
/// unknown to the ground truth are dropped with a warning, as are duplicate
/// prediction IDs (first one in sorted filename order wins; uniqueness is a
/// validation concern handled upstream).
pub fn match_cases(
    predictions: &[String],
    gold_index: &BTreeMap<String, String>,
    pred_dir: &Path,
    gold_dir: &Path,
    config: &MatchConfig<'_>,
) -> ScoreResult<Vec<MatchedCase>> {
    let re = compile(config.pred_pattern)?;
    let run_label = config.run_cohort.label();

    let mut sorted = predictions.to_vec();
    sorted.sort();

    let mut seen: BTreeMap<String, MatchedCase> = BTreeMap::new();
    for name in &sorted {
        let mut id = extract_id(&re, name)?;
        if config.add_missing_label && !id.contains(run_label) {
            id = format!("{run_label}-{id}");
        }
        if seen.contains_key(&id) {
            log::warn!("duplicate prediction for case {id}: {name} ignored");
            continue;
        }
        let Some(gold_name) = gold_index.get(&id) else {
            log::warn!("prediction {name} has no ground-truth case; dropped");
            continue;
        };
        let cohort = resolve_cohort(&id, config);
        seen.insert(
            id.clone(),
            MatchedCase {
                scan_id: id,
                prediction: pred_dir.join(name),
                ground_truth: gold_dir.join(gold_name),
                cohort,
            },
        );
    }
    Ok(seen.into_values().collect())
}

fn resolve_cohort(scan_id: &str, config: &MatchConfig<'_>) -> Option<Cohort> {
    match config.mapping {
        Some(mapping) => {
            let key = format!("{}-{}", config.run_cohort.label(), scan_id);
            mapping.cohort_for(&key)
        }
        None => Some(config.run_cohort),
    }
}

/// Case → cohort mapping table for multi-cohort challenges.
///
/// Two named columns (`NewID`, `Cohort`); values are short cohort suffixes
/// such as `GLI`. A configured-but-missing file is an error; "no mapping"
/// is expressed by not configuring one.
pub struct LabelMapping {
    entries: BTreeMap<String, String>,
}

pub const MAPPING_KEY_COLUMN: &str = "NewID";
pub const MAPPING_VALUE_COLUMN: &str = "Cohort";

impl LabelMapping {
    pub fn load(path: &Path) -> ScoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_csv(&content).map_err(|message| {
            ScoreError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: {message}", path.display()),
            ))
        })
    }

    fn from_csv(content: &str) -> Result<Self, String> {
        let mut lines = content.lines();
        let header = lines.next().ok_or("mapping file is empty")?;
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        let key_idx = columns
            .iter()
            .position(|c| *c == MAPPING_KEY_COLUMN)
            .ok_or_else(|| format!("missing column {MAPPING_KEY_COLUMN}"))?;
        let value_idx = columns
            .iter()
            .position(|c| *c == MAPPING_VALUE_COLUMN)
            .ok_or_else(|| format!("missing column {MAPPING_VALUE_COLUMN}"))?;

        let mut entries = BTreeMap::new();
        for (line_no, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let cols: Vec<&str> = line.split(',').map(str::trim).collect();
            let (Some(key), Some(value)) = (cols.get(key_idx), cols.get(value_idx)) else {
                return Err(format!("short row at line {}", line_no + 2));
            };
            entries.insert((*key).to_owned(), (*value).to_owned());
        }
        Ok(Self { entries })
    }

    /// Cohort for a composed key, e.g. `BraTS-GoAT-00001-000` → `BraTS-GLI`.
    pub fn cohort_for(&self, key: &str) -> Option<Cohort> {
        let value = self.entries.get(key)?;
        let label = if value.starts_with("BraTS") {
            value.clone()
        } else {
            format!("BraTS-{value}")
        };
        Cohort::from_label(&label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
