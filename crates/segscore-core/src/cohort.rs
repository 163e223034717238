//! Challenge cohorts and their declared metric schemas
//!
//! A cohort decides which tissue labels and which statistics are kept from
//! the raw engine output, which worst-case distance applies to penalties,
//! and how the per-case CSV is split between participants and organizers.

use std::fmt;

/// Fixed statistic vocabulary shared by all cohorts.
///
/// Flattened column keys are `"{tissue}_{statistic}"`, so every name here
/// must stay lowercase and `_`-joined (they end up as annotation keys).
pub const STATISTICS: &[&str] = &[
    "lesionwise_dice",
    "lesionwise_nsd_0_5",
    "lesionwise_nsd_1_0",
    "lesionwise_hd95",
    "dice",
    "nsd_0_5",
    "nsd_1_0",
    "hd95",
    "sensitivity",
    "specificity",
    "num_tp",
    "num_fp",
    "num_fn",
];

/// Challenge sub-task determining tissue labels and metric engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cohort {
    Gli,
    Men,
    MenRt,
    Met,
    Ped,
    Ssa,
    /// Multi-cohort ("generalizability") task; per-case cohorts come from
    /// the mapping table.
    Goat,
}

impl Cohort {
    pub const ALL: &[Cohort] = &[
        Cohort::Gli,
        Cohort::Men,
        Cohort::MenRt,
        Cohort::Met,
        Cohort::Ped,
        Cohort::Ssa,
        Cohort::Goat,
    ];

    /// Canonical challenge label, e.g. `BraTS-GLI`.
    pub fn label(self) -> &'static str {
        match self {
            Cohort::Gli => "BraTS-GLI",
            Cohort::Men => "BraTS-MEN",
            Cohort::MenRt => "BraTS-MEN-RT",
            Cohort::Met => "BraTS-MET",
            Cohort::Ped => "BraTS-PED",
            Cohort::Ssa => "BraTS-SSA",
            Cohort::Goat => "BraTS-GoAT",
        }
    }

    pub fn from_label(label: &str) -> Option<Cohort> {
        Cohort::ALL.iter().copied().find(|c| c.label().eq_ignore_ascii_case(label))
    }

    pub fn profile(self) -> &'static CohortProfile {
        profile_for(self)
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the stored per-case CSV is split between audiences.
#[derive(Debug, Clone, Copy)]
pub enum CsvLayout {
    /// One CSV with every column.
    Single,
    /// Participant CSV keeps columns matching any marker; the remaining
    /// columns go to an organizer-only CSV.
    Split { participant_markers: &'static [&'static str] },
}

/// Declared scoring schema for one cohort.
#[derive(Debug, Clone)]
pub struct CohortProfile {
    pub cohort: Cohort,
    /// Tissue/region labels kept from engine output, in column order.
    pub tissues: &'static [&'static str],
    /// Statistic names kept from engine output, in column order.
    pub statistics: &'static [&'static str],
    /// Worst defined distance; used for ∞ normalization and penalty rows.
    pub max_distance: f64,
    /// Mean-row columns matching any marker become submission annotations.
    pub annotation_markers: &'static [&'static str],
    pub csv_layout: CsvLayout,
    /// Rewrite prediction IDs missing the cohort label prefix before
    /// matching (only meaningful with label-inclusive ID patterns).
    pub add_missing_label: bool,
    /// Default anchored ID pattern for prediction filenames.
    pub pred_pattern: &'static str,
    /// Default anchored ID pattern for ground-truth filenames.
    pub gold_pattern: &'static str,
}

/// Default anchored ID pattern for prediction filenames.
pub const DEFAULT_PRED_PATTERN: &str = r"(\d{4,5}(-\d{1,3})?)\.nii\.gz$";
/// Default anchored ID pattern for ground-truth filenames.
pub const DEFAULT_GOLD_PATTERN: &str = r"(\d{4,5}(-\d{1,3})?)-seg\.nii\.gz$";
/// Label-inclusive ID patterns for cohorts whose scan IDs carry the cohort
/// label. Missing-label correction rewrites bare prediction IDs to
/// `"{label}-{id}"`, so both sides must capture the label for the join to
/// hold.
pub const LABELED_PRED_PATTERN: &str = r"((BraTS-[A-Za-z-]+-)?\d{4,5}(-\d{1,3})?)\.nii\.gz$";
pub const LABELED_GOLD_PATTERN: &str =
    r"((BraTS-[A-Za-z-]+-)?\d{4,5}(-\d{1,3})?)-seg\.nii\.gz$";
/// BraTS-MEN-RT ships GTV volumes instead of SEG as ground truth.
const MEN_RT_GOLD_PATTERN: &str = r"(\d{4,5}(-\d{1,3})?)_gtv\.nii\.gz$";

const ANNOTATION_MARKERS: &[&str] = &["dice", "nsd"];
const PARTICIPANT_MARKERS: &[&str] = &["lesionwise", "num_"];

const SPLIT: CsvLayout = CsvLayout::Split { participant_markers: PARTICIPANT_MARKERS };

macro_rules! profile {
    ($cohort:expr, $tissues:expr, $max_distance:expr, $layout:expr,
     $add_missing_label:expr, $pred_pattern:expr, $gold_pattern:expr) => {
        CohortProfile {
            cohort: $cohort,
            tissues: $tissues,
            statistics: STATISTICS,
            max_distance: $max_distance,
            annotation_markers: ANNOTATION_MARKERS,
            csv_layout: $layout,
            add_missing_label: $add_missing_label,
            pred_pattern: $pred_pattern,
            gold_pattern: $gold_pattern,
        }
    };
}

static GLI: CohortProfile = profile!(
    Cohort::Gli,
    &["et", "netc", "snfh", "rc", "tc", "wt"],
    374.0,
    SPLIT,
    false,
    DEFAULT_PRED_PATTERN,
    DEFAULT_GOLD_PATTERN
);
static MEN: CohortProfile = profile!(
    Cohort::Men,
    &["et", "tc", "wt"],
    374.0,
    SPLIT,
    false,
    DEFAULT_PRED_PATTERN,
    DEFAULT_GOLD_PATTERN
);
static MEN_RT: CohortProfile = profile!(
    Cohort::MenRt,
    &["gtv"],
    337.0,
    CsvLayout::Single,
    false,
    DEFAULT_PRED_PATTERN,
    MEN_RT_GOLD_PATTERN
);
// MET scan IDs carry the cohort label; missing-label correction rewrites
// bare prediction IDs, so both patterns must capture the label or the
// rewritten IDs would never join the gold index.
static MET: CohortProfile = profile!(
    Cohort::Met,
    &["et", "tc", "wt"],
    374.0,
    SPLIT,
    true,
    LABELED_PRED_PATTERN,
    LABELED_GOLD_PATTERN
);
static PED: CohortProfile = profile!(
    Cohort::Ped,
    &["et", "netc", "cc", "ed", "tc", "wt"],
    374.0,
    SPLIT,
    false,
    DEFAULT_PRED_PATTERN,
    DEFAULT_GOLD_PATTERN
);
static SSA: CohortProfile = profile!(
    Cohort::Ssa,
    &["et", "tc", "wt"],
    374.0,
    SPLIT,
    false,
    DEFAULT_PRED_PATTERN,
    DEFAULT_GOLD_PATTERN
);
// Union of the mapped cohorts; per-case schemas come from the resolved
// cohort, this profile supplies run-level constants and patterns.
static GOAT: CohortProfile = profile!(
    Cohort::Goat,
    &["et", "netc", "snfh", "rc", "cc", "ed", "tc", "wt", "gtv"],
    374.0,
    SPLIT,
    false,
    DEFAULT_PRED_PATTERN,
    DEFAULT_GOLD_PATTERN
);

fn profile_for(cohort: Cohort) -> &'static CohortProfile {
    match cohort {
        Cohort::Gli => &GLI,
        Cohort::Men => &MEN,
        Cohort::MenRt => &MEN_RT,
        Cohort::Met => &MET,
        Cohort::Ped => &PED,
        Cohort::Ssa => &SSA,
        Cohort::Goat => &GOAT,
    }
}
