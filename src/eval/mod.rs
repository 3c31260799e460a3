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

//! Evaluation harness: runs the classifier over subjects, mappings and
//! hyperparameters and scores every emotion with one-vs-rest AUROC.

mod auroc;
mod optimize;
mod predictions;
mod records;
mod stratify;
mod summary;
mod sweep;
mod trials;

pub use self::auroc::{per_class_auroc, roc_auc};
pub use self::optimize::{
    load_ablations, optimize_mapping, optimized_scores, read_ablations, AblationRecord, OptimizedModel, ALL_ETHNICITIES,
};
pub use self::predictions::{load_predictions, read_predictions, save_predictions, write_predictions, PredictionRow};
pub use self::records::{write_records, write_tsv, GenderScore, IntensityScore, OptimizedScore, SweepScore};
pub use self::stratify::{face_gender_scores, intensity_scores, FACE_GENDERS};
pub use self::summary::{mean_by, GroupMean};
pub use self::sweep::{hyperparameter_sweep, predict_trials, SweepGrid};
pub use self::trials::{TrialSet, EMPTY_TRIAL, LABEL_COLUMN, OTHER_LABEL, SUBJECT_COLUMN};

use crate::classifier::KernelClassifier;
use crate::common::{AuVocabulary, EmotionSet};
use crate::error::{Error, Result};

pub const SUB_SPLIT_COLUMN: &str = "sub_split";
pub const TRIAL_SPLIT_COLUMN: &str = "trial_split";
pub const ETHNICITY_COLUMN: &str = "sub_ethnicity";
pub const FACE_GENDER_COLUMN: &str = "face_gender";
pub const INTENSITY_COLUMN: &str = "intensity";

/// The fixed label and feature spaces of one evaluation run.
#[derive(Clone, Debug)]
pub struct EvalContext {
    pub emotions: EmotionSet,
    pub vocabulary: AuVocabulary,
}

impl EvalContext {
    pub fn new(emotions: EmotionSet, vocabulary: AuVocabulary) -> Self {
        EvalContext { emotions, vocabulary }
    }
}

/// Per-emotion AUROC of the classifier's current mapping on `trials`.
///
/// Every label in `trials` must belong to the classifier's emotion set.
pub fn score_trials(classifier: &KernelClassifier, trials: &TrialSet) -> Result<Vec<Option<f64>>> {
    let emotions = classifier.emotions();
    if trials.is_empty() {
        return Ok(vec![None; emotions.len()]);
    }
    let labels = trials.label_indices(emotions)?;
    let prediction = classifier.predict_proba(trials.au())?;
    Ok(per_class_auroc(&prediction, &labels))
}

/// Trials of subjects and stimuli both assigned to `split`.
pub fn select_split(trials: &TrialSet, split: &str) -> TrialSet {
    trials.filter(|set, i| {
        set.value(i, SUB_SPLIT_COLUMN) == Some(split) && set.value(i, TRIAL_SPLIT_COLUMN) == Some(split)
    })
}

/// Groups trials per subject, in order of first appearance.
pub(crate) fn by_subject(trials: &TrialSet) -> Result<Vec<(String, TrialSet)>> {
    if !trials.is_empty() && !trials.attribute_names().iter().any(|n| n == SUBJECT_COLUMN) {
        return Err(Error::invalid(format!("trials have no {:?} column", SUBJECT_COLUMN)));
    }
    Ok(trials.group_by(SUBJECT_COLUMN))
}

pub(crate) fn first_value(trials: &TrialSet, name: &str) -> String {
    if trials.is_empty() {
        return String::new();
    }
    trials.value(0, name).unwrap_or("").to_string()
}
