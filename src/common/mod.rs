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

mod au_table;

use std::fs;
use std::path::Path;

pub use self::au_table::AuTable;

use crate::error::{Error, Result};

/// The six basic emotion categories, in prediction column order.
pub const EMOTIONS: [&str; 6] = ["anger", "disgust", "fear", "happy", "sadness", "surprise"];

/// Ordered set of emotion labels a classifier predicts.
///
/// Prediction columns and mapping rows always follow this order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmotionSet {
    names: Vec<String>,
}

impl Default for EmotionSet {
    fn default() -> Self {
        EmotionSet::canonical()
    }
}

impl EmotionSet {
    /// Creates a set from the given labels.
    ///
    /// # Errors
    ///
    /// Fails if the set is empty or contains a label twice.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(Error::invalid("emotion set must not be empty"));
        }
        check_unique(&names, "emotion")?;
        Ok(EmotionSet { names })
    }

    /// The six basic emotions (see [`EMOTIONS`]).
    pub fn canonical() -> Self {
        EmotionSet {
            names: EMOTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Ordered vocabulary of recognized action unit names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuVocabulary {
    names: Vec<String>,
}

impl AuVocabulary {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(Error::invalid("AU vocabulary must not be empty"));
        }
        check_unique(&names, "AU")?;
        Ok(AuVocabulary { names })
    }

    /// Reads a vocabulary from a whitespace separated list of AU names.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        AuVocabulary::new(text.split_whitespace())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

fn check_unique(names: &[String], what: &str) -> Result<()> {
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(Error::invalid(format!("duplicate {} name {:?}", what, name)));
        }
    }
    Ok(())
}
