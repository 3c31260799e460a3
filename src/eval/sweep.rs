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

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tracing::{debug, info};

use super::predictions::PredictionRow;
use super::records::SweepScore;
use super::trials::TrialSet;
use super::{by_subject, score_trials, EvalContext, INTENSITY_COLUMN};
use crate::classifier::{ClassifierOptions, Kernel, KernelClassifier, Normalization};
use crate::error::{Error, Result};
use crate::model::{MappingConfig, MappingRegistry};

/// Kernels and betas to cross with every mapping.
#[derive(Clone, Debug, PartialEq)]
pub struct SweepGrid {
    pub kernels: Vec<Kernel>,
    pub betas: Vec<f64>,
    pub binarize: bool,
    pub normalization: Normalization,
}

impl Default for SweepGrid {
    fn default() -> Self {
        SweepGrid {
            kernels: Kernel::ALL.to_vec(),
            betas: vec![1.0, 10.0, 100.0, 1000.0, 10000.0],
            binarize: false,
            normalization: Normalization::Softmax,
        }
    }
}

struct Cell<'a> {
    kernel: Kernel,
    beta: f64,
    mapping: &'a str,
    config: &'a MappingConfig,
}

/// Scores every (kernel, beta, mapping, subject) combination.
///
/// Records are ordered kernel, beta, mapping, subject, emotion, whatever
/// order the cells are evaluated in.
pub fn hyperparameter_sweep(
    ctx: &EvalContext,
    mappings: &MappingRegistry,
    grid: &SweepGrid,
    trials: &TrialSet,
) -> Result<Vec<SweepScore>> {
    let trials = trials.scorable(&ctx.emotions);
    let subjects = by_subject(&trials)?;

    let mut cells = vec![];
    for &kernel in &grid.kernels {
        for &beta in &grid.betas {
            for (mapping, config) in mappings.iter() {
                cells.push(Cell {
                    kernel,
                    beta,
                    mapping,
                    config,
                });
            }
        }
    }
    info!(
        cells = cells.len(),
        subjects = subjects.len(),
        "running hyperparameter sweep"
    );

    let run = |cell: &Cell| run_cell(ctx, grid, cell, &subjects);

    #[cfg(feature = "rayon")]
    let scores: Vec<Vec<SweepScore>> = cells.par_iter().map(run).collect::<Result<_>>()?;
    #[cfg(not(feature = "rayon"))]
    let scores: Vec<Vec<SweepScore>> = cells.iter().map(run).collect::<Result<_>>()?;

    Ok(scores.into_iter().flatten().collect())
}

fn run_cell(
    ctx: &EvalContext,
    grid: &SweepGrid,
    cell: &Cell,
    subjects: &[(String, TrialSet)],
) -> Result<Vec<SweepScore>> {
    let options = ClassifierOptions {
        kernel: cell.kernel,
        family: Some(cell.kernel.family()),
        binarize: grid.binarize,
        normalization: grid.normalization,
        beta: cell.beta,
    };
    let mut classifier = KernelClassifier::new(
        Some(cell.config.clone()),
        Some(ctx.vocabulary.clone()),
        ctx.emotions.clone(),
        options,
    )?;

    let mut records = Vec::with_capacity(subjects.len() * ctx.emotions.len());
    for (sub, trials) in subjects {
        classifier.fit(trials.au(), trials.labels())?;
        let scores = score_trials(&classifier, trials)?;
        debug!(kernel = %cell.kernel, beta = cell.beta, mapping = cell.mapping, sub = %sub, "scored subject");

        for (emotion, score) in ctx.emotions.names().iter().zip(scores) {
            records.push(SweepScore {
                sub: sub.clone(),
                emotion: emotion.clone(),
                score,
                mapping: cell.mapping.to_string(),
                kernel: cell.kernel.to_string(),
                beta: cell.beta,
            });
        }
    }
    Ok(records)
}

/// Per-trial predicted distributions for every mapping and subject.
pub fn predict_trials(
    ctx: &EvalContext,
    mappings: &MappingRegistry,
    options: &ClassifierOptions,
    trials: &TrialSet,
) -> Result<Vec<PredictionRow>> {
    let trials = trials.scorable(&ctx.emotions);
    let subjects = by_subject(&trials)?;

    let mut rows = Vec::with_capacity(trials.len() * mappings.len());
    for (mapping, config) in mappings.iter() {
        let mut classifier = KernelClassifier::new(
            Some(config.clone()),
            Some(ctx.vocabulary.clone()),
            ctx.emotions.clone(),
            options.clone(),
        )?;

        for (sub, trials) in &subjects {
            classifier.fit(trials.au(), trials.labels())?;
            let prediction = classifier.predict_proba(trials.au())?;
            for i in 0..trials.len() {
                let intensity = match trials.value(i, INTENSITY_COLUMN) {
                    None | Some("") => None,
                    Some(cell) => Some(cell.trim().parse::<f64>().map_err(|_| {
                        Error::invalid(format!("intensity {:?} is not a number", cell))
                    })?),
                };
                rows.push(PredictionRow {
                    trial: trials.ids()[i].clone(),
                    probs: prediction.row(i).to_vec(),
                    y_true: trials.labels()[i].clone(),
                    sub: sub.clone(),
                    mapping: mapping.to_string(),
                    intensity,
                });
            }
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    fn grid() -> SweepGrid {
        SweepGrid {
            kernels: vec![Kernel::Cosine, Kernel::Euclidean],
            betas: vec![1.0, 10.0],
            ..SweepGrid::default()
        }
    }

    #[test]
    fn test_sweep_layout() {
        let records = hyperparameter_sweep(&context(), &registry(), &grid(), &trials()).unwrap();

        // 2 kernels x 2 betas x 2 mappings x 2 subjects x 3 emotions
        assert_eq!(48, records.len());
        let first = &records[0];
        assert_eq!(("01", "anger", "Good", "cosine", 1.0), (
            first.sub.as_str(),
            first.emotion.as_str(),
            first.mapping.as_str(),
            first.kernel.as_str(),
            first.beta
        ));
        assert_eq!("02", records[3].sub);
        assert_eq!("Swapped", records[6].mapping);
        assert_eq!(10.0, records[12].beta);
        assert_eq!("euclidean", records[24].kernel);
    }

    #[test]
    fn test_sweep_scores() {
        let records = hyperparameter_sweep(&context(), &registry(), &grid(), &trials()).unwrap();
        let good = records
            .iter()
            .filter(|r| r.mapping == "Good" && r.kernel == "cosine" && r.beta == 1.0);
        for record in good {
            assert_eq!(Some(1.0), record.score, "{:?}", record);
        }

        let swapped_anger = records
            .iter()
            .find(|r| r.mapping == "Swapped" && r.kernel == "cosine" && r.sub == "01" && r.emotion == "anger")
            .unwrap();
        assert!(swapped_anger.score.unwrap() < 1.0);
    }

    #[test]
    fn test_sweep_is_deterministic() {
        let first = hyperparameter_sweep(&context(), &registry(), &grid(), &trials()).unwrap();
        let second = hyperparameter_sweep(&context(), &registry(), &grid(), &trials()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_predict_trials() {
        let rows = predict_trials(&context(), &registry(), &ClassifierOptions::default(), &trials()).unwrap();
        // 8 scorable trials x 2 mappings
        assert_eq!(16, rows.len());
        assert_eq!("Good", rows[0].mapping);
        assert_eq!("t1", rows[0].trial);
        assert_eq!(Some(0.9), rows[0].intensity);
        for row in &rows {
            assert!((row.probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }
}
