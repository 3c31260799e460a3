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

//! Error types shared by the classifier, the mapping loaders and the harness.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for aukernel operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Kernel name not in the fixed kernel set
    #[error("Unknown kernel: {0:?} (expected one of cosine, sigmoid, linear, euclidean, l1, l2)")]
    UnknownKernel(String),

    /// Kernel family tag not recognized
    #[error("Unknown kernel family: {0:?} (expected similarity or distance)")]
    UnknownKernelFamily(String),

    /// Family tag contradicts the family the kernel declares
    #[error("Kernel {kernel} is a {declared} kernel, but was tagged as {requested}")]
    KernelFamilyMismatch {
        kernel: String,
        declared: String,
        requested: String,
    },

    /// Normalization scheme not recognized
    #[error("Unknown normalization: {0:?} (expected softmax)")]
    UnknownNormalization(String),

    /// Named mapping preset not present in the registry
    #[error("Unknown mapping: {0:?}")]
    UnknownMapping(String),

    /// Beta must be positive and finite
    #[error("Illegal beta: {0}")]
    IllegalBeta(f64),

    /// Input AU columns share nothing with the mapping columns
    #[error("Cannot align AU columns: none of {given:?} is in the vocabulary")]
    NoAuOverlap { given: Vec<String> },

    /// Mapping is missing an emotion row the classifier predicts
    #[error("Mapping has no row for emotion {0:?}")]
    MissingEmotion(String),

    /// Predict was called before fit or add-mapping
    #[error("No mapping set; call fit or add_mapping first")]
    NotFitted,

    /// Shape disagreement between two inputs
    #[error("Shape mismatch: {0}")]
    Shape(String),

    /// Malformed value in a table or mapping
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Table parse failure
    #[error("Failed to parse table {path}: {source}")]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Configuration file parse failure
    #[error("Failed to parse config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// IO failure on a named file or directory
    #[error("Failed to access {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error without path context
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for aukernel operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    pub fn table(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Table {
            path: path.into(),
            source,
        }
    }
}
