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

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::{debug, info};

use super::records::OptimizedScore;
use super::summary::mean_by;
use super::trials::TrialSet;
use super::{by_subject, first_value, score_trials, EvalContext, ETHNICITY_COLUMN};
use crate::classifier::{ClassifierOptions, KernelClassifier};
use crate::common::EmotionSet;
use crate::error::{Error, Result};
use crate::model::{MappingMatrix, MappingRegistry};

/// Model ethnicity of the mapping optimized on every ablation record.
pub const ALL_ETHNICITIES: &str = "all";

/// Score change observed when one AU is removed from trials of one emotion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AblationRecord {
    /// Emotion whose trials the AU was ablated from.
    pub ablated_from: String,
    /// Emotion the score refers to.
    pub emotion: String,
    pub ablated_au: String,
    pub score: Option<f64>,
    pub sub_ethnicity: String,
}

/// A mapping optimized on the ablations of one group of subjects.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedModel {
    pub mapping: String,
    pub model_ethnicity: String,
    pub matrix: MappingMatrix,
}

pub fn read_ablations<R: Read>(input: R) -> Result<Vec<AblationRecord>> {
    let mut reader = ReaderBuilder::new().delimiter(b'\t').from_reader(input);
    let mut records = vec![];
    for record in reader.deserialize::<AblationRecord>() {
        records.push(record?);
    }
    Ok(records)
}

pub fn load_ablations<P: AsRef<Path>>(path: P) -> Result<Vec<AblationRecord>> {
    let path = path.as_ref();
    read_ablations(File::open(path).map_err(|e| Error::io(path, e))?).map_err(|e| match e {
        Error::Csv(source) => Error::table(path, source),
        other => other,
    })
}

/// Copy of `z` adjusted by ablation scores.
///
/// For every emotion only ablations from that emotion's own trials and with
/// a nonzero score are used. An AU whose removal lowers the score on average
/// is switched on, one whose removal raises it is switched off.
pub fn optimize_mapping(
    z: &MappingMatrix,
    ablations: &[AblationRecord],
    emotions: &EmotionSet,
) -> Result<MappingMatrix> {
    let mut edits: Vec<(String, String, f64)> = vec![];
    for emotion in emotions.names() {
        let relevant: Vec<&AblationRecord> = ablations
            .iter()
            .filter(|r| &r.ablated_from == emotion && &r.emotion == emotion)
            .filter(|r| r.score.map_or(false, |s| s != 0.0))
            .collect();

        for group in mean_by(&relevant, |r| r.ablated_au.clone(), |r| r.score) {
            match group.mean {
                Some(mean) if mean < 0.0 => edits.push((emotion.clone(), group.key, 1.0)),
                Some(mean) if mean > 0.0 => edits.push((emotion.clone(), group.key, 0.0)),
                _ => {}
            }
        }
    }
    debug!(edits = edits.len(), "optimizing mapping");
    z.with_values(edits.iter().map(|(emotion, au, value)| (emotion.as_str(), au.as_str(), *value)))
}

/// Scores original and optimized mappings side by side.
///
/// Each mapping is optimized once on all ablations and once per ethnicity
/// found in them. The per-ethnicity models are scored on subjects of that
/// ethnicity only.
pub fn optimized_scores(
    ctx: &EvalContext,
    mappings: &MappingRegistry,
    options: &ClassifierOptions,
    trials: &TrialSet,
    ablations: &[AblationRecord],
) -> Result<(Vec<OptimizedScore>, Vec<OptimizedModel>)> {
    let trials = trials.scorable(&ctx.emotions);
    let subjects: Vec<(String, String, TrialSet)> = by_subject(&trials)?
        .into_iter()
        .map(|(sub, set)| {
            let ethnicity = first_value(&set, ETHNICITY_COLUMN);
            (sub, ethnicity, set)
        })
        .collect();

    let mut groups = vec![ALL_ETHNICITIES.to_string()];
    for record in ablations {
        if !groups.contains(&record.sub_ethnicity) {
            groups.push(record.sub_ethnicity.clone());
        }
    }

    let mut classifier = KernelClassifier::new(
        None,
        Some(ctx.vocabulary.clone()),
        ctx.emotions.clone(),
        options.clone(),
    )?;
    let mut records = vec![];
    let mut models = vec![];

    for (mapping, config) in mappings.iter() {
        let original = config.resolve(ctx.vocabulary.names(), &ctx.emotions)?;

        for group in &groups {
            let selected: Vec<AblationRecord> = if group == ALL_ETHNICITIES {
                ablations.to_vec()
            } else {
                ablations.iter().filter(|r| &r.sub_ethnicity == group).cloned().collect()
            };
            let optimized = optimize_mapping(&original, &selected, &ctx.emotions)?;
            info!(mapping, model_ethnicity = %group, ablations = selected.len(), "optimized mapping");

            for (sub, ethnicity, set) in &subjects {
                if group != ALL_ETHNICITIES && ethnicity != group {
                    continue;
                }
                classifier.add_mapping(&original)?;
                let orig = score_trials(&classifier, set)?;
                classifier.add_mapping(&optimized)?;
                let opt = score_trials(&classifier, set)?;

                for (k, emotion) in ctx.emotions.names().iter().enumerate() {
                    let diff = match (orig[k], opt[k]) {
                        (Some(o), Some(n)) => Some(n - o),
                        _ => None,
                    };
                    records.push(OptimizedScore {
                        sub: sub.clone(),
                        emotion: emotion.clone(),
                        orig_score: orig[k],
                        opt_score: opt[k],
                        diff_score: diff,
                        sub_ethnicity: ethnicity.clone(),
                        mapping: mapping.to_string(),
                        model_ethnicity: group.clone(),
                    });
                }
            }

            models.push(OptimizedModel {
                mapping: mapping.to_string(),
                model_ethnicity: group.clone(),
                matrix: optimized,
            });
        }
    }
    Ok((records, models))
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;

    fn ablation(from: &str, emotion: &str, au: &str, score: Option<f64>, ethnicity: &str) -> AblationRecord {
        AblationRecord {
            ablated_from: from.into(),
            emotion: emotion.into(),
            ablated_au: au.into(),
            score,
            sub_ethnicity: ethnicity.into(),
        }
    }

    #[test]
    fn test_read_ablations() {
        let table = "\tablated_from\temotion\tablated_au\tscore\tsub_ethnicity\n\
                     0\tanger\tanger\tAU4\t-0.25\tWC\n\
                     1\tanger\tanger\tAU6\t\tEA\n";
        let records = read_ablations(table.as_bytes()).unwrap();
        assert_eq!(
            vec![
                ablation("anger", "anger", "AU4", Some(-0.25), "WC"),
                ablation("anger", "anger", "AU6", None, "EA"),
            ],
            records
        );
    }

    #[test]
    fn test_optimize_mapping() {
        let good = good_mapping();
        let ablations = vec![
            ablation("anger", "anger", "AU15", Some(-0.2), "WC"),
            ablation("anger", "anger", "AU15", Some(-0.1), "EA"),
            ablation("anger", "anger", "AU4", Some(0.3), "WC"),
            ablation("anger", "anger", "AU12", Some(0.0), "WC"),
            ablation("happy", "anger", "AU6", Some(0.5), "WC"),
            ablation("happy", "happy", "AU12", None, "WC"),
            ablation("sadness", "sadness", "AU99", Some(-0.4), "EA"),
        ];
        let optimized = optimize_mapping(&good, &ablations, &context().emotions).unwrap();

        assert_eq!(Some(1.0), optimized.get("anger", "AU15"));
        assert_eq!(Some(0.0), optimized.get("anger", "AU4"));
        assert_eq!(Some(0.0), optimized.get("anger", "AU12"));
        assert_eq!(Some(1.0), optimized.get("happy", "AU6"));
        assert_eq!(Some(1.0), optimized.get("happy", "AU12"));
        assert_eq!(Some(1.0), optimized.get("sadness", "AU99"));
        assert_eq!(Some(0.0), optimized.get("anger", "AU99"));

        // the source matrix is untouched
        assert_eq!(Some(1.0), good.get("anger", "AU4"));
        assert_eq!(None, good.get("sadness", "AU99"));
    }

    #[test]
    fn test_optimized_scores() {
        let ablations = vec![
            ablation("anger", "anger", "AU4", Some(0.5), "WC"),
            ablation("anger", "anger", "AU15", Some(0.0), "EA"),
        ];
        let (records, models) =
            optimized_scores(&context(), &registry(), &ClassifierOptions::default(), &trials(), &ablations).unwrap();

        let labels: Vec<(&str, &str)> = models
            .iter()
            .map(|m| (m.mapping.as_str(), m.model_ethnicity.as_str()))
            .collect();
        assert_eq!(
            vec![
                ("Good", "all"),
                ("Good", "WC"),
                ("Good", "EA"),
                ("Swapped", "all"),
                ("Swapped", "WC"),
                ("Swapped", "EA"),
            ],
            labels
        );
        assert_eq!(Some(0.0), models[1].matrix.get("anger", "AU4"));
        assert_eq!(good_mapping(), models[2].matrix);

        // per mapping: 2 subjects for "all", one each for WC and EA, 3 emotions each
        assert_eq!(24, records.len());
        for record in &records {
            if record.model_ethnicity != ALL_ETHNICITIES {
                assert_eq!(record.model_ethnicity, record.sub_ethnicity);
            }
            if let (Some(o), Some(n)) = (record.orig_score, record.opt_score) {
                assert!((record.diff_score.unwrap() - (n - o)).abs() < 1e-12);
            }
        }
        for record in records.iter().filter(|r| r.model_ethnicity == "EA") {
            assert_eq!(record.orig_score, record.opt_score);
        }
    }
}
