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

mod kernel_classifier;
mod prediction;

use std::fmt;
use std::str::FromStr;

pub use self::kernel_classifier::{ClassifierOptions, KernelClassifier};
pub use self::prediction::Prediction;

use crate::error::Error;
use crate::math;

/// Activations above this value count as "on" when inputs are binarized.
pub const BINARIZE_THRESHOLD: f64 = 0.0;

const SIGMOID_COEF0: f64 = 1.0;

/// Whether larger kernel output means "more alike" or "further apart".
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum KernelFamily {
    Similarity,
    Distance,
}

impl KernelFamily {
    /// Puts a raw kernel value on the "larger is more alike" scale.
    #[inline]
    pub fn orient(self, value: f64) -> f64 {
        match self {
            KernelFamily::Similarity => value,
            KernelFamily::Distance => -value,
        }
    }
}

impl FromStr for KernelFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "similarity" => Ok(KernelFamily::Similarity),
            "distance" => Ok(KernelFamily::Distance),
            _ => Err(Error::UnknownKernelFamily(s.to_string())),
        }
    }
}

impl fmt::Display for KernelFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KernelFamily::Similarity => f.write_str("similarity"),
            KernelFamily::Distance => f.write_str("distance"),
        }
    }
}

#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum Kernel {
    Cosine,
    Sigmoid,
    Linear,
    Euclidean,
    L1,
    L2,
}

impl Kernel {
    pub const ALL: [Kernel; 6] = [
        Kernel::Cosine,
        Kernel::Sigmoid,
        Kernel::Linear,
        Kernel::Euclidean,
        Kernel::L1,
        Kernel::L2,
    ];

    pub fn family(self) -> KernelFamily {
        match self {
            Kernel::Cosine | Kernel::Sigmoid | Kernel::Linear => KernelFamily::Similarity,
            Kernel::Euclidean | Kernel::L1 | Kernel::L2 => KernelFamily::Distance,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Kernel::Cosine => "cosine",
            Kernel::Sigmoid => "sigmoid",
            Kernel::Linear => "linear",
            Kernel::Euclidean => "euclidean",
            Kernel::L1 => "l1",
            Kernel::L2 => "l2",
        }
    }

    /// Raw kernel value between an AU vector and a reference pattern.
    ///
    /// The sigmoid kernel is `tanh(x.z / n + 1)` with `n` the vector length.
    /// `l2` is the euclidean distance under another name.
    pub fn compute(self, x: &[f64], z: &[f64]) -> f64 {
        match self {
            Kernel::Cosine => math::cosine_similarity(x, z),
            Kernel::Sigmoid => {
                let gamma = 1.0 / x.len().max(1) as f64;
                (gamma * math::vector_inner_product(x, z) + SIGMOID_COEF0).tanh()
            }
            Kernel::Linear => math::vector_inner_product(x, z),
            Kernel::Euclidean | Kernel::L2 => math::euclidean_distance(x, z),
            Kernel::L1 => math::manhattan_distance(x, z),
        }
    }
}

impl FromStr for Kernel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kernel::ALL
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| Error::UnknownKernel(s.to_string()))
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How oriented kernel scores become a probability distribution.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum Normalization {
    Softmax,
}

impl Normalization {
    pub fn apply(self, scores: &mut [f64], beta: f64) {
        match self {
            Normalization::Softmax => math::softmax(scores, beta),
        }
    }
}

impl FromStr for Normalization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "softmax" => Ok(Normalization::Softmax),
            _ => Err(Error::UnknownNormalization(s.to_string())),
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Normalization::Softmax => f.write_str("softmax"),
        }
    }
}
