// This file is part of aukernel, an evaluation engine for hypothesized mappings
// between facial action units and emotion categories.
//
// The classifier compares the facial action units (AUs) observed in a trial
// with the AU pattern each emotion is hypothesized to produce, and turns the
// kernel scores into a probability for every emotion. The evaluation harness
// scores mappings against human emotion judgments with per-emotion AUROC.
//
// Copyright (C) 2026, the aukernel developers.
//
// You can redistribute aukernel source codes and/or modify it under the terms
// of the BSD 2-Clause License.
//
// You should have received a copy of the BSD 2-Clause License along with the software.
// If not, see < https://opensource.org/licenses/BSD-2-Clause>.

mod classifier;
mod common;
pub mod math;
pub mod config;
pub mod error;
pub mod eval;
pub mod model;

pub use classifier::{
    ClassifierOptions, Kernel, KernelClassifier, KernelFamily, Normalization, Prediction, BINARIZE_THRESHOLD,
};
pub use common::{AuTable, AuVocabulary, EmotionSet, EMOTIONS};
pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use model::{load_mapping, read_mapping, write_mapping, MappingConfig, MappingMatrix, MappingRegistry};

use std::path::Path;

/// Create a classifier predicting with the mapping table at `path_to_mapping`.
///
/// The classifier predicts the canonical six emotions and takes its AU
/// columns from the mapping.
pub fn create_classifier<P: AsRef<Path>>(path_to_mapping: P, options: ClassifierOptions) -> Result<KernelClassifier> {
    let mapping = load_mapping(path_to_mapping)?;
    create_classifier_with_mapping(&mapping, options)
}

/// Create a classifier predicting with the provided mapping.
///
/// # Examples
///
/// ```rust
/// use aukernel::{AuTable, ClassifierOptions, MappingMatrix, EMOTIONS};
///
/// let rows = (0..EMOTIONS.len())
///     .map(|i| (0..EMOTIONS.len()).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
///     .collect();
/// let aus = vec!["AU4", "AU9", "AU1", "AU12", "AU15", "AU26"];
/// let mapping = MappingMatrix::from_rows(EMOTIONS.to_vec(), aus.clone(), rows).unwrap();
///
/// let classifier = aukernel::create_classifier_with_mapping(&mapping, ClassifierOptions::default()).unwrap();
/// let x = AuTable::from_rows(aus, vec![vec![0.0, 0.0, 0.0, 0.9, 0.0, 0.1]]).unwrap();
/// assert_eq!(vec![3], classifier.predict(&x).unwrap());
/// ```
pub fn create_classifier_with_mapping(mapping: &MappingMatrix, options: ClassifierOptions) -> Result<KernelClassifier> {
    let mut classifier = KernelClassifier::new(None, None, EmotionSet::canonical(), options)?;
    classifier.add_mapping(mapping)?;
    Ok(classifier)
}
