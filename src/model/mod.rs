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

mod reader;
mod registry;

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

pub use self::reader::{load_mapping, read_mapping, write_mapping};
pub use self::registry::MappingRegistry;

use crate::common::EmotionSet;
use crate::error::{Error, Result};

/// Hypothesized AU pattern per emotion: one row per emotion, one column per AU.
///
/// A matrix never changes after construction. Edits such as
/// [`MappingMatrix::with_values`] return a new matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct MappingMatrix {
    emotions: Vec<String>,
    aus: Vec<String>,
    values: Vec<f64>,
}

impl MappingMatrix {
    /// Creates a matrix from row-major values.
    ///
    /// # Errors
    ///
    /// Fails on a shape mismatch, duplicate row or column names, or
    /// non-finite values.
    pub fn new(emotions: Vec<String>, aus: Vec<String>, values: Vec<f64>) -> Result<Self> {
        if values.len() != emotions.len() * aus.len() {
            return Err(Error::shape(format!(
                "mapping of {} emotions x {} AUs needs {} values, got {}",
                emotions.len(),
                aus.len(),
                emotions.len() * aus.len(),
                values.len()
            )));
        }
        for (i, name) in emotions.iter().enumerate() {
            if emotions[..i].contains(name) {
                return Err(Error::invalid(format!("duplicate mapping row {:?}", name)));
            }
        }
        for (i, name) in aus.iter().enumerate() {
            if aus[..i].contains(name) {
                return Err(Error::invalid(format!("duplicate mapping column {:?}", name)));
            }
        }
        if let Some(v) = values.iter().find(|v| !v.is_finite()) {
            return Err(Error::invalid(format!("mapping value {} is not finite", v)));
        }
        Ok(MappingMatrix {
            emotions,
            aus,
            values,
        })
    }

    pub fn from_rows<E, A>(emotions: Vec<E>, aus: Vec<A>, rows: Vec<Vec<f64>>) -> Result<Self>
    where
        E: Into<String>,
        A: Into<String>,
    {
        let aus: Vec<String> = aus.into_iter().map(Into::into).collect();
        if let Some(row) = rows.iter().find(|r| r.len() != aus.len()) {
            return Err(Error::shape(format!(
                "mapping row has {} values, expected {}",
                row.len(),
                aus.len()
            )));
        }
        MappingMatrix::new(
            emotions.into_iter().map(Into::into).collect(),
            aus,
            rows.into_iter().flatten().collect(),
        )
    }

    pub fn emotions(&self) -> &[String] {
        &self.emotions
    }

    pub fn aus(&self) -> &[String] {
        &self.aus
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let width = self.aus.len();
        &self.values[index * width..(index + 1) * width]
    }

    pub fn get(&self, emotion: &str, au: &str) -> Option<f64> {
        let i = self.emotions.iter().position(|e| e == emotion)?;
        let j = self.aus.iter().position(|a| a == au)?;
        Some(self.values[i * self.aus.len() + j])
    }

    /// Returns a copy with the given `(emotion, au, value)` cells set.
    ///
    /// An AU not yet in the matrix is appended as a zero column first.
    pub fn with_values<'a, I>(&self, edits: I) -> Result<MappingMatrix>
    where
        I: IntoIterator<Item = (&'a str, &'a str, f64)>,
    {
        let mut next = self.clone();
        for (emotion, au, value) in edits {
            let i = next
                .emotions
                .iter()
                .position(|e| e == emotion)
                .ok_or_else(|| Error::MissingEmotion(emotion.to_string()))?;
            let j = match next.aus.iter().position(|a| a == au) {
                Some(j) => j,
                None => {
                    let mut aus = next.aus.clone();
                    aus.push(au.to_string());
                    next = next.align_columns(&aus);
                    aus.len() - 1
                }
            };
            if !value.is_finite() {
                return Err(Error::invalid(format!("mapping value {} is not finite", value)));
            }
            let width = next.aus.len();
            next.values[i * width + j] = value;
        }
        Ok(next)
    }

    /// Reorders columns to `target`, dropping unknown AUs and zero-filling missing ones.
    pub fn align_columns(&self, target: &[String]) -> MappingMatrix {
        let sources: Vec<Option<usize>> = target
            .iter()
            .map(|name| self.aus.iter().position(|a| a == name))
            .collect();

        let dropped: Vec<&String> = self.aus.iter().filter(|a| !target.contains(a)).collect();
        if !dropped.is_empty() {
            debug!(?dropped, "dropping mapping AUs outside the vocabulary");
        }

        let mut values = Vec::with_capacity(self.emotions.len() * target.len());
        for i in 0..self.emotions.len() {
            let row = self.row(i);
            values.extend(sources.iter().map(|s| s.map_or(0.0, |j| row[j])));
        }

        MappingMatrix {
            emotions: self.emotions.clone(),
            aus: target.to_vec(),
            values,
        }
    }

    /// Reorders rows to follow `emotions`; rows for other emotions are dropped.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::MissingEmotion`] if an emotion of the set has no row.
    pub fn align_rows(&self, emotions: &EmotionSet) -> Result<MappingMatrix> {
        let mut values = Vec::with_capacity(emotions.len() * self.aus.len());
        for name in emotions.names() {
            let i = self
                .emotions
                .iter()
                .position(|e| e == name)
                .ok_or_else(|| Error::MissingEmotion(name.clone()))?;
            values.extend_from_slice(self.row(i));
        }
        Ok(MappingMatrix {
            emotions: emotions.names().to_vec(),
            aus: self.aus.clone(),
            values,
        })
    }
}

/// Where a classifier's mapping comes from.
#[derive(Clone, Debug)]
pub enum MappingConfig {
    /// An explicit matrix.
    Matrix(MappingMatrix),
    /// The AUs hypothesized active for each emotion; listed AUs get 1, all others 0.
    AuSets(BTreeMap<String, Vec<String>>),
    /// A mapping table on disk, read on every resolve.
    Table(PathBuf),
}

impl MappingConfig {
    /// Derives the concrete mapping for the given AU column order and emotion set.
    ///
    /// Nothing is learned here: the same inputs always give the same matrix.
    pub fn resolve(&self, columns: &[String], emotions: &EmotionSet) -> Result<MappingMatrix> {
        let matrix = match self {
            MappingConfig::Matrix(matrix) => matrix.clone(),
            MappingConfig::Table(path) => load_mapping(path)?,
            MappingConfig::AuSets(sets) => {
                let mut rows = Vec::with_capacity(emotions.len());
                for name in emotions.names() {
                    let active = sets
                        .get(name)
                        .ok_or_else(|| Error::MissingEmotion(name.clone()))?;
                    rows.push(
                        columns
                            .iter()
                            .map(|au| if active.contains(au) { 1.0 } else { 0.0 })
                            .collect(),
                    );
                }
                MappingMatrix::from_rows(emotions.names().to_vec(), columns.to_vec(), rows)?
            }
        };
        matrix.align_rows(emotions).map(|m| m.align_columns(columns))
    }
}

impl From<MappingMatrix> for MappingConfig {
    fn from(matrix: MappingMatrix) -> Self {
        MappingConfig::Matrix(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn toy() -> MappingMatrix {
        MappingMatrix::from_rows(
            vec!["happy", "sadness"],
            vec!["AU6", "AU12", "AU15"],
            vec![vec![1.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_bad_shape_and_values() {
        assert!(MappingMatrix::new(names(&["a"]), names(&["AU1", "AU2"]), vec![1.0]).is_err());
        assert!(MappingMatrix::new(names(&["a"]), names(&["AU1"]), vec![f64::NAN]).is_err());
        assert!(MappingMatrix::new(names(&["a", "a"]), names(&["AU1"]), vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_get() {
        let z = toy();
        assert_eq!(Some(1.0), z.get("happy", "AU12"));
        assert_eq!(Some(0.0), z.get("sadness", "AU12"));
        assert_eq!(None, z.get("fear", "AU12"));
    }

    #[test]
    fn test_align_columns() {
        let z = toy().align_columns(&names(&["AU15", "AU1", "AU6"]));
        assert_eq!(names(&["AU15", "AU1", "AU6"]), z.aus());
        assert_eq!(&[0.0, 0.0, 1.0], z.row(0));
        assert_eq!(&[1.0, 0.0, 0.0], z.row(1));
    }

    #[test]
    fn test_align_rows() {
        let emotions = EmotionSet::new(vec!["sadness", "happy"]).unwrap();
        let z = toy().align_rows(&emotions).unwrap();
        assert_eq!(names(&["sadness", "happy"]), z.emotions());
        assert_eq!(&[0.0, 0.0, 1.0], z.row(0));

        let emotions = EmotionSet::new(vec!["happy", "fear"]).unwrap();
        match toy().align_rows(&emotions) {
            Err(Error::MissingEmotion(name)) => assert_eq!("fear", name),
            other => panic!("expected MissingEmotion, got {:?}", other),
        }
    }

    #[test]
    fn test_with_values_copies() {
        let z = toy();
        let edited = z
            .with_values(vec![("happy", "AU12", 0.0), ("sadness", "AU4", 1.0)])
            .unwrap();
        assert_eq!(Some(1.0), z.get("happy", "AU12"));
        assert_eq!(Some(0.0), edited.get("happy", "AU12"));
        assert_eq!(Some(1.0), edited.get("sadness", "AU4"));
        assert_eq!(Some(0.0), edited.get("happy", "AU4"));
        assert!(z.with_values(vec![("fear", "AU1", 1.0)]).is_err());
    }

    #[test]
    fn test_resolve_au_sets() {
        let mut sets = BTreeMap::new();
        sets.insert("happy".to_string(), names(&["AU6", "AU12"]));
        sets.insert("sadness".to_string(), names(&["AU1", "AU15", "AU99"]));
        let emotions = EmotionSet::new(vec!["happy", "sadness"]).unwrap();

        let z = MappingConfig::AuSets(sets)
            .resolve(&names(&["AU1", "AU6", "AU12", "AU15"]), &emotions)
            .unwrap();
        assert_eq!(&[0.0, 1.0, 1.0, 0.0], z.row(0));
        assert_eq!(&[1.0, 0.0, 0.0, 1.0], z.row(1));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let config = MappingConfig::from(toy());
        let emotions = EmotionSet::new(vec!["happy", "sadness"]).unwrap();
        let columns = names(&["AU12", "AU15"]);
        assert_eq!(
            config.resolve(&columns, &emotions).unwrap(),
            config.resolve(&columns, &emotions).unwrap()
        );
    }
}
