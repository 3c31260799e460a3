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

//! Scores restricted to subsets of trials: by the gender of the face shown
//! and by the rated intensity of the expression.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{debug, info};

use super::auroc::roc_auc;
use super::predictions::PredictionRow;
use super::records::{GenderScore, IntensityScore};
use super::trials::TrialSet;
use super::{by_subject, first_value, score_trials, EvalContext, ETHNICITY_COLUMN, FACE_GENDER_COLUMN};
use crate::classifier::{ClassifierOptions, KernelClassifier};
use crate::common::EmotionSet;
use crate::error::{Error, Result};
use crate::model::MappingRegistry;

pub const FACE_GENDERS: [&str; 2] = ["M", "F"];

const QUARTILE_EDGES: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Scores every mapping per subject separately on male and female faces.
pub fn face_gender_scores(
    ctx: &EvalContext,
    mappings: &MappingRegistry,
    options: &ClassifierOptions,
    trials: &TrialSet,
) -> Result<Vec<GenderScore>> {
    let trials = trials.scorable(&ctx.emotions);
    let subjects = by_subject(&trials)?;

    let mut records = vec![];
    for (mapping, config) in mappings.iter() {
        let mut classifier = KernelClassifier::new(
            Some(config.clone()),
            Some(ctx.vocabulary.clone()),
            ctx.emotions.clone(),
            options.clone(),
        )?;
        info!(mapping, subjects = subjects.len(), "scoring per face gender");

        for (sub, trials) in &subjects {
            classifier.fit(trials.au(), trials.labels())?;
            let ethnicity = first_value(trials, ETHNICITY_COLUMN);

            for &gender in FACE_GENDERS.iter() {
                let slice = trials.where_eq(FACE_GENDER_COLUMN, gender);
                let scores = score_trials(&classifier, &slice)?;
                debug!(mapping, sub = %sub, gender, trials = slice.len(), "scored face gender");

                for (emotion, score) in ctx.emotions.names().iter().zip(scores) {
                    records.push(GenderScore {
                        sub: sub.clone(),
                        emotion: emotion.clone(),
                        score,
                        sub_ethnicity: ethnicity.clone(),
                        mapping: mapping.to_string(),
                        face_gender: gender.to_string(),
                    });
                }
            }
        }
    }
    Ok(records)
}

/// Rescores exported predictions within intensity quartiles.
///
/// The intensity of a trial is its mean over all rows sharing the trial id.
/// Quartile `k` (1-4) holds the trials whose intensity lies between the
/// `k-1`th and `k`th quartile edges, both inclusive, so trials on an edge
/// count in two bins. Rows without an intensity are left out. Records are
/// sorted by mapping, subject, emotion and quartile.
pub fn intensity_scores(emotions: &EmotionSet, rows: &[PredictionRow]) -> Result<Vec<IntensityScore>> {
    let intensities = trial_intensities(rows);
    let mut present: Vec<f64> = intensities.iter().filter_map(|&v| v).collect();
    if present.is_empty() {
        return Err(Error::invalid("no prediction carries an intensity"));
    }
    present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let edges: Vec<f64> = QUARTILE_EDGES.iter().map(|&q| quantile(&present, q)).collect();
    debug!(?edges, "intensity quartile edges");

    let labels = rows
        .iter()
        .map(|row| {
            emotions
                .index_of(&row.y_true)
                .ok_or_else(|| Error::invalid(format!("label {:?} is not in the emotion set", row.y_true)))
        })
        .collect::<Result<Vec<usize>>>()?;

    let mappings = unique(rows.iter().map(|r| r.mapping.as_str()));
    let mut records = vec![];
    for quartile in 1..QUARTILE_EDGES.len() {
        let (low, high) = (edges[quartile - 1], edges[quartile]);
        for mapping in &mappings {
            let subjects = unique(rows.iter().filter(|r| &r.mapping == mapping).map(|r| r.sub.as_str()));
            for sub in &subjects {
                let slice: Vec<usize> = (0..rows.len())
                    .filter(|&i| {
                        rows[i].mapping == *mapping
                            && rows[i].sub == *sub
                            && intensities[i].map_or(false, |v| low <= v && v <= high)
                    })
                    .collect();

                for (k, emotion) in emotions.names().iter().enumerate() {
                    let scores: Vec<f64> = slice.iter().map(|&i| rows[i].probs[k]).collect();
                    let truth: Vec<bool> = slice.iter().map(|&i| labels[i] == k).collect();
                    records.push(IntensityScore {
                        sub: sub.clone(),
                        emotion: emotion.clone(),
                        mapping: mapping.clone(),
                        intensity: quartile,
                        score: roc_auc(&scores, &truth),
                    });
                }
            }
        }
    }

    records.sort_by(|a, b| {
        (&a.mapping, &a.sub, &a.emotion, a.intensity).cmp(&(&b.mapping, &b.sub, &b.emotion, b.intensity))
    });
    Ok(records)
}

/// Mean intensity of each row's trial id across all rows.
fn trial_intensities(rows: &[PredictionRow]) -> Vec<Option<f64>> {
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for row in rows {
        if let Some(v) = row.intensity {
            let entry = sums.entry(row.trial.as_str()).or_insert((0.0, 0));
            entry.0 += v;
            entry.1 += 1;
        }
    }
    rows.iter()
        .map(|row| sums.get(row.trial.as_str()).map(|&(sum, n)| sum / n as f64))
        .collect()
}

/// Quantile `q` of ascending `sorted`, interpolating linearly between ranks.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

fn unique<'a, I: Iterator<Item = &'a str>>(values: I) -> Vec<String> {
    let mut seen: Vec<String> = vec![];
    for v in values {
        if !seen.iter().any(|s| s == v) {
            seen.push(v.to_string());
        }
    }
    seen
}
