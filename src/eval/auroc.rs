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

//! Area under the ROC curve, one-vs-rest per emotion.

use crate::classifier::Prediction;

/// AUROC of `scores` against binary `labels`.
///
/// Sorts by descending score and walks distinct thresholds, so tied scores
/// contribute half credit (trapezoidal rule). Returns `None` when there are no
/// positive or no negative samples, or when any score is NaN or infinite.
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> Option<f64> {
    debug_assert_eq!(scores.len(), labels.len());

    let total_pos = labels.iter().filter(|&&l| l).count();
    let total_neg = labels.len() - total_pos;
    if total_pos == 0 || total_neg == 0 || scores.iter().any(|s| !s.is_finite()) {
        return None;
    }

    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let p = total_pos as f64;
    let n = total_neg as f64;

    let mut auc = 0.0;
    let (mut tp, mut fp) = (0usize, 0usize);
    let (mut last_tpr, mut last_fpr) = (0.0, 0.0);

    let mut i = 0;
    while i < indices.len() {
        let current = scores[indices[i]];
        while i < indices.len() && scores[indices[i]] == current {
            if labels[indices[i]] {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }

        let tpr = tp as f64 / p;
        let fpr = fp as f64 / n;
        auc += (fpr - last_fpr) * (tpr + last_tpr) / 2.0;
        last_tpr = tpr;
        last_fpr = fpr;
    }

    Some(auc)
}

/// One-vs-rest AUROC for every emotion column of `prediction`.
///
/// `labels[i]` is the true emotion index of trial `i`. Emotions without
/// positive (or without negative) trials are `None`.
pub fn per_class_auroc(prediction: &Prediction, labels: &[usize]) -> Vec<Option<f64>> {
    debug_assert_eq!(prediction.n_trials(), labels.len());

    (0..prediction.n_emotions())
        .map(|emotion| {
            let truth: Vec<bool> = labels.iter().map(|&l| l == emotion).collect();
            roc_auc(&prediction.column(emotion), &truth)
        })
        .collect()
}
