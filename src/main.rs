// This file is part of aukernel, an evaluation engine for hypothesized mappings
// between facial action units and emotion categories.
//
// Copyright (C) 2026, the aukernel developers.
//
// You can redistribute aukernel source codes and/or modify it under the terms
// of the BSD 2-Clause License.
//
// You should have received a copy of the BSD 2-Clause License along with the software.
// If not, see < https://opensource.org/licenses/BSD-2-Clause>.

//! Command line front end of the evaluation harness.
//!
//! Every command reads an optional TOML analysis file (see `AnalysisConfig`),
//! writes its long-format table to the output directory and prints a short
//! summary to stdout. Logging goes to stderr.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use aukernel::eval::{self, EvalContext, TrialSet};
use aukernel::{write_mapping, AnalysisConfig, AuVocabulary, MappingRegistry};

#[derive(Parser)]
#[command(name = "aukernel")]
#[command(version)]
#[command(about = "Score hypothesized AU-to-emotion mappings against human emotion judgments")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Analysis configuration (TOML); built-in defaults are used without it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every mapping for every kernel and beta of the grid
    Sweep,
    /// Export per-trial predicted probabilities
    Predict,
    /// Score mappings separately on male and female faces
    Gender,
    /// Rescore exported predictions per intensity quartile
    Intensity {
        /// Predictions table; defaults to predictions.tsv in the output directory
        #[arg(long)]
        predictions: Option<PathBuf>,
    },
    /// Adjust mappings from AU ablation scores and compare against the originals
    Optimize {
        /// Ablation scores table; defaults to scores_ablation.tsv in the output directory
        #[arg(long)]
        ablations: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if let Err(error) = run(cli) {
        eprintln!("Error: {:#}", error);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };

    match cli.command {
        Commands::Sweep => sweep(&config),
        Commands::Predict => predict(&config),
        Commands::Gender => gender(&config),
        Commands::Intensity { predictions } => intensity(&config, predictions),
        Commands::Optimize { ablations } => optimize(&config, ablations),
    }
}

struct Inputs {
    ctx: EvalContext,
    mappings: MappingRegistry,
    trials: TrialSet,
}

fn load_inputs(config: &AnalysisConfig) -> Result<Inputs> {
    let vocabulary = AuVocabulary::load(&config.data.au_names)
        .with_context(|| format!("Failed to read AU names from {}", config.data.au_names.display()))?;
    let ctx = EvalContext::new(config.emotion_set()?, vocabulary);

    let mut trials = TrialSet::load_dir(&config.data.ratings_dir, &ctx.vocabulary)
        .with_context(|| format!("Failed to read ratings under {}", config.data.ratings_dir.display()))?;
    if let Some(split) = &config.data.split {
        trials = eval::select_split(&trials, split);
    }
    info!(trials = trials.len(), "loaded ratings");

    let mappings = MappingRegistry::from_dir(&config.mappings.dir, &config.mappings.names)
        .with_context(|| format!("Failed to load mappings from {}", config.mappings.dir.display()))?;

    Ok(Inputs { ctx, mappings, trials })
}

fn sweep(config: &AnalysisConfig) -> Result<()> {
    let grid = config.sweep_grid()?;
    let inputs = load_inputs(config)?;
    let records = eval::hyperparameter_sweep(&inputs.ctx, &inputs.mappings, &grid, &inputs.trials)?;
    eval::write_tsv(config.output_path("scores_hyperparameters.tsv"), &records)?;

    println!("{:<10} {:>8} {:>8}", "kernel", "beta", "auroc");
    // betas are positive, so their bit patterns sort numerically
    let means = eval::mean_by(&records, |r| (r.kernel.clone(), r.beta.to_bits()), |r| r.score);
    for group in means {
        let (kernel, beta) = group.key;
        println!("{:<10} {:>8} {:>8}", kernel, f64::from_bits(beta), format_score(group.mean));
    }
    Ok(())
}

fn predict(config: &AnalysisConfig) -> Result<()> {
    let options = config.classifier_options()?;
    let inputs = load_inputs(config)?;
    let rows = eval::predict_trials(&inputs.ctx, &inputs.mappings, &options, &inputs.trials)?;
    eval::save_predictions(config.output_path("predictions.tsv"), &inputs.ctx.emotions, &rows)?;
    println!("Wrote {} predictions", rows.len());
    Ok(())
}

fn gender(config: &AnalysisConfig) -> Result<()> {
    let options = config.classifier_options()?;
    let inputs = load_inputs(config)?;
    let records = eval::face_gender_scores(&inputs.ctx, &inputs.mappings, &options, &inputs.trials)?;
    eval::write_tsv(config.output_path("scores_face_gender.tsv"), &records)?;

    let means = eval::mean_by(
        &records,
        |r| (r.mapping.clone(), r.emotion.clone(), r.face_gender.clone()),
        |r| r.score,
    );
    for group in means {
        let (mapping, emotion, gender) = group.key;
        println!("{:<16} {:<10} {:<2} {:>8}", mapping, emotion, gender, format_score(group.mean));
    }
    Ok(())
}

fn intensity(config: &AnalysisConfig, predictions: Option<PathBuf>) -> Result<()> {
    let emotions = config.emotion_set()?;
    let path = predictions.unwrap_or_else(|| config.output_path("predictions.tsv"));
    let rows = eval::load_predictions(&path, &emotions)
        .with_context(|| format!("Failed to read predictions from {}; run `predict` first", path.display()))?;

    let records = eval::intensity_scores(&emotions, &rows)?;
    eval::write_tsv(config.output_path("scores_intensity_stratified.tsv"), &records)?;

    for group in eval::mean_by(&records, |r| (r.mapping.clone(), r.intensity), |r| r.score) {
        println!("{:<16} {:>2} {:>8}", group.key.0, group.key.1, format_score(group.mean));
    }
    Ok(())
}

fn optimize(config: &AnalysisConfig, ablations: Option<PathBuf>) -> Result<()> {
    let options = config.classifier_options()?;
    let path = ablations.unwrap_or_else(|| config.output_path("scores_ablation.tsv"));
    let ablations = eval::load_ablations(&path)
        .with_context(|| format!("Failed to read ablation scores from {}", path.display()))?;

    let inputs = load_inputs(config)?;
    let (records, models) =
        eval::optimized_scores(&inputs.ctx, &inputs.mappings, &options, &inputs.trials, &ablations)?;
    eval::write_tsv(config.output_path("scores_optimal_train.tsv"), &records)?;

    let model_dir = config.output_path("optimized_mappings");
    for model in &models {
        let file_name = format!("{}_ethn-{}.tsv", model.mapping, model.model_ethnicity);
        save_mapping(&model_dir.join(file_name), &model.matrix)?;
    }

    let means = eval::mean_by(
        &records,
        |r| (r.model_ethnicity.clone(), r.sub_ethnicity.clone()),
        |r| r.diff_score,
    );
    for group in means {
        println!("{:<6} {:<6} {:>8}", group.key.0, group.key.1, format_score(group.mean));
    }
    Ok(())
}

fn save_mapping(path: &Path, mapping: &aukernel::MappingMatrix) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_mapping(mapping, file)?;
    Ok(())
}

fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "-".to_string(), |s| format!("{:.3}", s))
}
