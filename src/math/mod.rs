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

use num::Float;

pub fn vector_inner_product<T: Float>(left: &[T], right: &[T]) -> T {
    debug_assert_eq!(left.len(), right.len());
    left.iter()
        .zip(right)
        .fold(T::zero(), |acc, (&l, &r)| acc + l * r)
}

pub fn norm<T: Float>(src: &[T]) -> T {
    vector_inner_product(src, src).sqrt()
}

pub fn euclidean_distance<T: Float>(left: &[T], right: &[T]) -> T {
    debug_assert_eq!(left.len(), right.len());
    left.iter()
        .zip(right)
        .fold(T::zero(), |acc, (&l, &r)| acc + (l - r).powi(2))
        .sqrt()
}

pub fn manhattan_distance<T: Float>(left: &[T], right: &[T]) -> T {
    debug_assert_eq!(left.len(), right.len());
    left.iter()
        .zip(right)
        .fold(T::zero(), |acc, (&l, &r)| acc + (l - r).abs())
}

/// Cosine of the angle between two vectors; 0 when either has zero length.
pub fn cosine_similarity<T: Float>(left: &[T], right: &[T]) -> T {
    let denom = norm(left) * norm(right);
    if denom == T::zero() {
        return T::zero();
    }
    vector_inner_product(left, right) / denom
}

/// Maps every value strictly above `thresh` to 1 and everything else to 0.
pub fn binarize<T: Float>(src: &mut [T], thresh: T) {
    for value in src.iter_mut() {
        *value = if *value > thresh { T::one() } else { T::zero() };
    }
}

/// In-place softmax of `beta * values`.
///
/// The row maximum is subtracted before exponentiation, so large betas
/// do not overflow.
pub fn softmax<T: Float>(values: &mut [T], beta: T) {
    let max = values
        .iter()
        .fold(T::neg_infinity(), |acc, &v| acc.max(beta * v));

    let mut sum = T::zero();
    for value in values.iter_mut() {
        *value = (beta * *value - max).exp();
        sum = sum + *value;
    }
    for value in values.iter_mut() {
        *value = *value / sum;
    }
}
