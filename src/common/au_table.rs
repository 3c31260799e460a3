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

use tracing::debug;

use crate::error::{Error, Result};

/// Row-major table of AU activations: one row per trial, one named column per AU.
#[derive(Clone, Debug, PartialEq)]
pub struct AuTable {
    columns: Vec<String>,
    data: Vec<f64>,
}

impl AuTable {
    /// Creates a table from column names and row-major data.
    ///
    /// # Errors
    ///
    /// Fails if `data.len()` is not a multiple of the column count.
    pub fn new(columns: Vec<String>, data: Vec<f64>) -> Result<Self> {
        if columns.is_empty() {
            if data.is_empty() {
                return Ok(AuTable { columns, data });
            }
            return Err(Error::shape("table has values but no columns"));
        }
        if data.len() % columns.len() != 0 {
            return Err(Error::shape(format!(
                "{} values do not fill rows of {} columns",
                data.len(),
                columns.len()
            )));
        }
        Ok(AuTable { columns, data })
    }

    pub fn from_rows<S: Into<String>>(columns: Vec<S>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut data = Vec::with_capacity(rows.len() * columns.len());
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::shape(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
            data.extend(row);
        }
        AuTable::new(columns, data)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn n_rows(&self) -> usize {
        if self.columns.is_empty() {
            0
        } else {
            self.data.len() / self.columns.len()
        }
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let width = self.columns.len();
        &self.data[index * width..(index + 1) * width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.columns.len().max(1))
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Whether any activation in the row is non-zero.
    pub fn has_signal(&self, index: usize) -> bool {
        self.row(index).iter().any(|&v| v != 0.0)
    }

    pub fn select_rows(&self, indices: &[usize]) -> AuTable {
        let mut data = Vec::with_capacity(indices.len() * self.columns.len());
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        AuTable {
            columns: self.columns.clone(),
            data,
        }
    }

    /// Reorders the columns to `target`.
    ///
    /// Columns not in `target` are dropped and target columns absent from the
    /// table are filled with zeros.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NoAuOverlap`] if no column of the table is in `target`.
    pub fn align(&self, target: &[String]) -> Result<AuTable> {
        let sources: Vec<Option<usize>> = target
            .iter()
            .map(|name| self.columns.iter().position(|c| c == name))
            .collect();

        if !target.is_empty() && sources.iter().all(Option::is_none) {
            return Err(Error::NoAuOverlap {
                given: self.columns.clone(),
            });
        }

        let dropped = self.columns.iter().filter(|c| !target.contains(c)).count();
        let missing = sources.iter().filter(|s| s.is_none()).count();
        if dropped > 0 || missing > 0 {
            debug!(dropped, missing, "aligning AU columns");
        }

        let n_rows = self.n_rows();
        let mut data = Vec::with_capacity(n_rows * target.len());
        for i in 0..n_rows {
            let row = self.row(i);
            data.extend(sources.iter().map(|s| s.map_or(0.0, |j| row[j])));
        }

        Ok(AuTable {
            columns: target.to_vec(),
            data,
        })
    }
}
