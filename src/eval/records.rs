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

//! Long-format score records and their tab separated output.
//!
//! Missing scores serialize as empty fields.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// One subject x emotion score of a kernel/beta/mapping sweep cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepScore {
    pub sub: String,
    pub emotion: String,
    pub score: Option<f64>,
    pub mapping: String,
    pub kernel: String,
    pub beta: f64,
}

/// Score of one subject x emotion on trials showing faces of one gender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenderScore {
    pub sub: String,
    pub emotion: String,
    pub score: Option<f64>,
    pub sub_ethnicity: String,
    pub mapping: String,
    pub face_gender: String,
}

/// Score of one subject x emotion on trials of one intensity quartile (1-4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityScore {
    pub sub: String,
    pub emotion: String,
    pub mapping: String,
    pub intensity: usize,
    pub score: Option<f64>,
}

/// Original versus ablation-optimized mapping score of one subject x emotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedScore {
    pub sub: String,
    pub emotion: String,
    pub orig_score: Option<f64>,
    pub opt_score: Option<f64>,
    pub diff_score: Option<f64>,
    pub sub_ethnicity: String,
    pub mapping: String,
    pub model_ethnicity: String,
}

/// Writes records as a tab separated table with a header row.
pub fn write_tsv<T, P>(path: P, records: &[T]) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }
    write_records(File::create(path).map_err(|e| Error::io(path, e))?, records).map_err(|e| match e {
        Error::Csv(source) => Error::table(path, source),
        other => other,
    })?;
    info!(path = %path.display(), rows = records.len(), "wrote table");
    Ok(())
}

pub fn write_records<T: Serialize, W: Write>(output: W, records: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(output);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
