//! `segscore` — score a segmentation-challenge submission.
//!
//! Reads the prediction and goldstandard archives, runs the cohort's
//! metric engine per matched case, penalizes missing cases, stores the
//! per-case CSVs and writes the result document to a file or stdout.
//! Expected validation failures still produce an `"INVALID"` document and
//! exit 0; only unexpected failures (I/O, storage, engine spawn) exit
//! non-zero.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use segscore_core::engine::{CommandEngine, EngineRegistry};
use segscore_core::pipeline::{RunConfig, score_submission};
use segscore_core::storage::LocalDirStore;
use segscore_core::Cohort;

#[derive(Parser, Debug)]
#[command(author, version, about = "Score a segmentation challenge submission")]
struct Cli {
    /// Predictions archive (zip or tar)
    #[arg(short = 'p', long)]
    predictions: PathBuf,

    /// Goldstandard archive
    #[arg(short = 'g', long)]
    goldstandard: PathBuf,

    /// Secondary goldstandard archive, merged into the same pool
    #[arg(long)]
    second_goldstandard: Option<PathBuf>,

    /// Challenge cohort label (e.g. BraTS-GLI)
    #[arg(short = 'l', long, default_value = "BraTS-GLI")]
    label: String,

    /// Case → cohort mapping table (NewID,Cohort) for multi-cohort runs
    #[arg(short = 'm', long)]
    mapping_file: Option<PathBuf>,

    /// Override of the prediction ID pattern
    #[arg(long)]
    pred_pattern: Option<String>,

    /// Override of the ground-truth ID pattern
    #[arg(long)]
    gold_pattern: Option<String>,

    /// Directory receiving the stored CSV artifacts
    #[arg(long)]
    scores_dir: PathBuf,

    /// External metrics program (receives --prediction, --ground-truth,
    /// --cohort and prints the nested result JSON)
    #[arg(long)]
    metrics_cmd: String,

    /// Extra arguments passed to the metrics program
    #[arg(long, num_args = 1..)]
    metrics_args: Option<Vec<String>>,

    /// Scratch directory for extraction (default: a temp directory)
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Result JSON path (omit to print to stdout)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let Some(cohort) = Cohort::from_label(&cli.label) else {
        bail!("unknown cohort label: {}", cli.label);
    };

    // Keep a temp workdir alive for the run when none is given.
    let _tmp;
    let workdir = match &cli.workdir {
        Some(dir) => dir.clone(),
        None => {
            let tmp = tempfile::tempdir().context("failed to create scratch directory")?;
            let path = tmp.path().to_path_buf();
            _tmp = tmp;
            path
        }
    };

    let mut registry = EngineRegistry::new();
    let extra_args = cli.metrics_args.clone().unwrap_or_default();
    for &engine_cohort in Cohort::ALL {
        registry.register(
            engine_cohort,
            Box::new(CommandEngine::new(cli.metrics_cmd.clone(), extra_args.clone())),
        );
    }
    let store = LocalDirStore::new(&cli.scores_dir);

    let config = RunConfig {
        predictions: cli.predictions.clone(),
        goldstandard: cli.goldstandard.clone(),
        second_goldstandard: cli.second_goldstandard.clone(),
        cohort,
        mapping_file: cli.mapping_file.clone(),
        pred_pattern: cli.pred_pattern.clone(),
        gold_pattern: cli.gold_pattern.clone(),
        workdir,
    };

    let document = score_submission(&config, &registry, &store)
        .context("scoring failed before a result document could be produced")?;
    let rendered = serde_json::to_string(&document)?;

    match &cli.output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            log::info!("wrote result document to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    if document["submission_status"] == "INVALID" {
        log::warn!(
            "submission is invalid: {}",
            document["submission_errors"].as_str().unwrap_or("unknown reason")
        );
    }
    Ok(())
}
