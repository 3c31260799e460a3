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

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use crate::common::{AuTable, AuVocabulary, EmotionSet};
use crate::error::{Error, Result};

pub const LABEL_COLUMN: &str = "emotion";
pub const SUBJECT_COLUMN: &str = "sub";

/// Label of trials that showed no basic emotion.
pub const OTHER_LABEL: &str = "other";
/// Trial id of stimuli without any AU.
pub const EMPTY_TRIAL: &str = "empty";

/// Rated trials: AU activations, the chosen emotion label, and free-form
/// string attributes such as subject, split, ethnicity or face gender.
#[derive(Clone, Debug, PartialEq)]
pub struct TrialSet {
    ids: Vec<String>,
    au: AuTable,
    labels: Vec<String>,
    attribute_names: Vec<String>,
    attributes: Vec<String>,
}

impl TrialSet {
    pub fn new(
        ids: Vec<String>,
        au: AuTable,
        labels: Vec<String>,
        attribute_names: Vec<String>,
        attributes: Vec<String>,
    ) -> Result<Self> {
        let n = ids.len();
        if au.n_rows() != n || labels.len() != n || attributes.len() != n * attribute_names.len() {
            return Err(Error::shape(format!(
                "trial set with {} ids, {} AU rows, {} labels, {} attribute cells for {} attributes",
                n,
                au.n_rows(),
                labels.len(),
                attributes.len(),
                attribute_names.len()
            )));
        }
        Ok(TrialSet {
            ids,
            au,
            labels,
            attribute_names,
            attributes,
        })
    }

    /// Reads a tab separated rating table.
    ///
    /// The first column holds trial ids. Columns named in `vocabulary` hold
    /// activations, the `emotion` column holds labels, and every other column
    /// is kept as a string attribute.
    pub fn read_tsv<R: Read>(input: R, vocabulary: &AuVocabulary) -> Result<TrialSet> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(input);

        let headers = reader.headers()?.clone();
        let mut au_columns = vec![];
        let mut attribute_columns = vec![];
        let mut label_column = None;
        for (i, name) in headers.iter().enumerate().skip(1) {
            if name == LABEL_COLUMN {
                label_column = Some(i);
            } else if vocabulary.contains(name) {
                au_columns.push(i);
            } else {
                attribute_columns.push(i);
            }
        }
        let label_column =
            label_column.ok_or_else(|| Error::invalid(format!("table has no {:?} column", LABEL_COLUMN)))?;
        if au_columns.is_empty() {
            return Err(Error::NoAuOverlap {
                given: headers.iter().skip(1).map(str::to_string).collect(),
            });
        }

        let mut ids = vec![];
        let mut labels = vec![];
        let mut values = vec![];
        let mut attributes = vec![];
        let mut record = StringRecord::new();
        while reader.read_record(&mut record)? {
            ids.push(record[0].to_string());
            labels.push(record[label_column].to_string());
            for &i in &au_columns {
                values.push(parse_activation(&record[i], &headers[i])?);
            }
            attributes.extend(attribute_columns.iter().map(|&i| record[i].to_string()));
        }

        TrialSet::new(
            ids,
            AuTable::new(au_columns.iter().map(|&i| headers[i].to_string()).collect(), values)?,
            labels,
            attribute_columns.iter().map(|&i| headers[i].to_string()).collect(),
            attributes,
        )
    }

    pub fn load<P: AsRef<Path>>(path: P, vocabulary: &AuVocabulary) -> Result<TrialSet> {
        let path = path.as_ref();
        TrialSet::read_tsv(File::open(path).map_err(|e| Error::io(path, e))?, vocabulary).map_err(|e| match e {
            Error::Csv(source) => Error::table(path, source),
            other => other,
        })
    }

    /// Loads every `.tsv` file below `dir`, in path order, into one set.
    ///
    /// Tables without a `sub` column get one from a `sub-<id>` file name prefix.
    pub fn load_dir<P: AsRef<Path>>(dir: P, vocabulary: &AuVocabulary) -> Result<TrialSet> {
        let mut paths = vec![];
        collect_tables(dir.as_ref(), &mut paths)?;
        paths.sort();

        let mut sets = Vec::with_capacity(paths.len());
        for path in &paths {
            let mut set = TrialSet::load(path, vocabulary)?;
            if set.attribute_index(SUBJECT_COLUMN).is_none() {
                if let Some(sub) = subject_from_path(path) {
                    set = set.with_attribute(SUBJECT_COLUMN, &sub);
                }
            }
            debug!(path = %path.display(), trials = set.len(), "loaded ratings");
            sets.push(set);
        }
        TrialSet::concat(sets)
    }

    /// Stacks sets; AU columns and attributes are unioned, absent cells are zero or empty.
    pub fn concat(sets: Vec<TrialSet>) -> Result<TrialSet> {
        let mut au_columns: Vec<String> = vec![];
        let mut attribute_names: Vec<String> = vec![];
        for set in &sets {
            for c in set.au.columns() {
                if !au_columns.contains(c) {
                    au_columns.push(c.clone());
                }
            }
            for a in &set.attribute_names {
                if !attribute_names.contains(a) {
                    attribute_names.push(a.clone());
                }
            }
        }

        let mut ids = vec![];
        let mut labels = vec![];
        let mut values = vec![];
        let mut attributes = vec![];
        for set in sets {
            let au = if au_columns.is_empty() {
                set.au.clone()
            } else {
                set.au.align(&au_columns)?
            };
            values.extend_from_slice(au.data());
            for i in 0..set.len() {
                attributes.extend(
                    attribute_names
                        .iter()
                        .map(|name| set.value(i, name).unwrap_or("").to_string()),
                );
            }
            ids.extend(set.ids);
            labels.extend(set.labels);
        }

        TrialSet::new(
            ids,
            AuTable::new(au_columns, values)?,
            labels,
            attribute_names,
            attributes,
        )
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn au(&self) -> &AuTable {
        &self.au
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn attribute_names(&self) -> &[String] {
        &self.attribute_names
    }

    fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attribute_names.iter().position(|n| n == name)
    }

    /// Attribute `name` of trial `row`.
    pub fn value(&self, row: usize, name: &str) -> Option<&str> {
        let j = self.attribute_index(name)?;
        Some(&self.attributes[row * self.attribute_names.len() + j])
    }

    /// Copy with attribute `name` set to `value` on every trial.
    pub fn with_attribute(&self, name: &str, value: &str) -> TrialSet {
        let mut next = self.clone();
        match self.attribute_index(name) {
            Some(j) => {
                let width = next.attribute_names.len();
                for row in 0..next.len() {
                    next.attributes[row * width + j] = value.to_string();
                }
            }
            None => {
                let width = self.attribute_names.len();
                next.attributes = Vec::with_capacity(self.len() * (width + 1));
                for row in 0..self.len() {
                    next.attributes
                        .extend_from_slice(&self.attributes[row * width..(row + 1) * width]);
                    next.attributes.push(value.to_string());
                }
                next.attribute_names.push(name.to_string());
            }
        }
        next
    }

    pub fn select(&self, indices: &[usize]) -> TrialSet {
        let width = self.attribute_names.len();
        let mut attributes = Vec::with_capacity(indices.len() * width);
        for &i in indices {
            attributes.extend_from_slice(&self.attributes[i * width..(i + 1) * width]);
        }
        TrialSet {
            ids: indices.iter().map(|&i| self.ids[i].clone()).collect(),
            au: self.au.select_rows(indices),
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
            attribute_names: self.attribute_names.clone(),
            attributes,
        }
    }

    pub fn filter<F>(&self, mut keep: F) -> TrialSet
    where
        F: FnMut(&TrialSet, usize) -> bool,
    {
        let indices: Vec<usize> = (0..self.len()).filter(|&i| keep(self, i)).collect();
        self.select(&indices)
    }

    /// Trials whose attribute `name` equals `value`; none if the attribute is absent.
    pub fn where_eq(&self, name: &str, value: &str) -> TrialSet {
        self.filter(|set, i| set.value(i, name) == Some(value))
    }

    /// Drops trials that cannot be scored against `emotions`: label `other`,
    /// id `empty`, no active AU, or a label outside the set.
    pub fn scorable(&self, emotions: &EmotionSet) -> TrialSet {
        let mut unknown = 0;
        let kept = self.filter(|set, i| {
            let label = set.labels[i].as_str();
            if label == OTHER_LABEL || set.ids[i] == EMPTY_TRIAL || !set.au.has_signal(i) {
                return false;
            }
            if emotions.index_of(label).is_none() {
                unknown += 1;
                return false;
            }
            true
        });
        if unknown > 0 {
            warn!(unknown, "dropping trials with labels outside the emotion set");
        }
        kept
    }

    /// Emotion index of every label.
    pub fn label_indices(&self, emotions: &EmotionSet) -> Result<Vec<usize>> {
        self.labels
            .iter()
            .map(|label| {
                emotions
                    .index_of(label)
                    .ok_or_else(|| Error::invalid(format!("label {:?} is not in the emotion set", label)))
            })
            .collect()
    }

    /// Distinct values of attribute `name`, in order of first appearance.
    pub fn unique(&self, name: &str) -> Vec<String> {
        let mut values: Vec<String> = vec![];
        for i in 0..self.len() {
            if let Some(v) = self.value(i, name) {
                if !values.iter().any(|seen| seen == v) {
                    values.push(v.to_string());
                }
            }
        }
        values
    }

    /// Splits by attribute `name`, groups in order of first appearance.
    pub fn group_by(&self, name: &str) -> Vec<(String, TrialSet)> {
        self.unique(name)
            .into_iter()
            .map(|value| {
                let group = self.where_eq(name, &value);
                (value, group)
            })
            .collect()
    }
}

fn parse_activation(cell: &str, column: &str) -> Result<f64> {
    let value = cell
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::invalid(format!("activation {:?} in column {} is not a number", cell, column)))?;
    if !value.is_finite() {
        return Err(Error::invalid(format!(
            "activation {:?} in column {} is not finite",
            cell, column
        )));
    }
    Ok(value)
}

fn collect_tables(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.is_dir() {
            collect_tables(&path, paths)?;
        } else if path.extension().map_or(false, |e| e == "tsv") {
            paths.push(path);
        }
    }
    Ok(())
}

fn subject_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let rest = stem.strip_prefix("sub-")?;
    let id: String = rest.chars().take_while(|c| c.is_ascii_alphanumeric()).collect();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}
