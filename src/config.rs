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

//! Analysis configuration read from a TOML file.
//!
//! Every section and field is optional; missing values fall back to the
//! layout of the reference dataset (`data/`, `results/`).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::classifier::{ClassifierOptions, Kernel, Normalization};
use crate::common::{EmotionSet, EMOTIONS};
use crate::error::{Error, Result};
use crate::eval::SweepGrid;

/// Top-level analysis configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub data: DataConfig,
    pub mappings: MappingsConfig,
    pub classifier: ClassifierConfig,
    pub sweep: SweepConfig,
    pub output: OutputConfig,
}

/// Where trials come from and which of them to use.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory searched recursively for `.tsv` rating tables
    pub ratings_dir: PathBuf,
    /// Whitespace separated list of AU names
    pub au_names: PathBuf,
    /// Keep only trials whose subject and stimulus belong to this split
    pub split: Option<String>,
    pub emotions: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            ratings_dir: PathBuf::from("data/ratings/emotion"),
            au_names: PathBuf::from("data/au_names_new.txt"),
            split: Some("train".to_string()),
            emotions: EMOTIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Mapping presets, each stored as `<dir>/<name>.tsv`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MappingsConfig {
    pub dir: PathBuf,
    pub names: Vec<String>,
}

impl Default for MappingsConfig {
    fn default() -> Self {
        MappingsConfig {
            dir: PathBuf::from("data"),
            names: [
                "Cordaro2018IPC",
                "Cordaro2018ref",
                "Darwin",
                "Ekman",
                "Keltner2019",
                "Matsumoto2008",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Classifier used outside of the sweep.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub kernel: String,
    pub family: Option<String>,
    pub normalization: String,
    pub beta: f64,
    pub binarize: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            kernel: "cosine".to_string(),
            family: None,
            normalization: "softmax".to_string(),
            beta: 1.0,
            binarize: false,
        }
    }
}

/// Hyperparameter grid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub kernels: Vec<String>,
    pub betas: Vec<f64>,
    pub normalization: String,
    pub binarize: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        let grid = SweepGrid::default();
        SweepConfig {
            kernels: grid.kernels.iter().map(|k| k.to_string()).collect(),
            betas: grid.betas,
            normalization: grid.normalization.to_string(),
            binarize: grid.binarize,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: PathBuf::from("results"),
        }
    }
}

impl AnalysisConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not valid configuration TOML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        toml::from_str(&text).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn emotion_set(&self) -> Result<EmotionSet> {
        EmotionSet::new(self.data.emotions.iter().map(String::as_str))
    }

    pub fn classifier_options(&self) -> Result<ClassifierOptions> {
        let c = &self.classifier;
        ClassifierOptions::parse(&c.kernel, c.family.as_deref(), &c.normalization, c.beta, c.binarize)
    }

    /// The sweep grid, with every kernel name and beta checked.
    pub fn sweep_grid(&self) -> Result<SweepGrid> {
        let kernels = self
            .sweep
            .kernels
            .iter()
            .map(|name| name.parse::<Kernel>())
            .collect::<Result<Vec<Kernel>>>()?;
        if let Some(&beta) = self.sweep.betas.iter().find(|b| !(**b > 0.0 && b.is_finite())) {
            return Err(Error::IllegalBeta(beta));
        }
        Ok(SweepGrid {
            kernels,
            betas: self.sweep.betas.clone(),
            binarize: self.sweep.binarize,
            normalization: self.sweep.normalization.parse::<Normalization>()?,
        })
    }

    /// Path of an output table named `file_name`.
    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output.dir.join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: AnalysisConfig = toml::from_str("").unwrap();
        assert_eq!(6, config.emotion_set().unwrap().len());
        assert_eq!(Some("train"), config.data.split.as_deref());
        assert_eq!(ClassifierOptions::default().kernel, config.classifier_options().unwrap().kernel);
        assert_eq!(SweepGrid::default(), config.sweep_grid().unwrap());
        assert_eq!(PathBuf::from("results/scores.tsv"), config.output_path("scores.tsv"));
    }

    #[test]
    fn test_partial_sections() {
        let text = r#"
            [data]
            ratings_dir = "ratings"
            emotions = ["happy", "sadness"]

            [mappings]
            names = ["Darwin"]

            [sweep]
            kernels = ["cosine", "l1"]
            betas = [1.0, 5.0]
        "#;
        let config: AnalysisConfig = toml::from_str(text).unwrap();
        assert_eq!(PathBuf::from("ratings"), config.data.ratings_dir);
        assert_eq!(PathBuf::from("data/au_names_new.txt"), config.data.au_names);
        assert_eq!(vec!["Darwin".to_string()], config.mappings.names);
        assert_eq!(PathBuf::from("data"), config.mappings.dir);

        let grid = config.sweep_grid().unwrap();
        assert_eq!(vec![Kernel::Cosine, Kernel::L1], grid.kernels);
        assert_eq!(vec![1.0, 5.0], grid.betas);
        assert_eq!(2, config.emotion_set().unwrap().len());
    }

    #[test]
    fn test_invalid_values() {
        let config: AnalysisConfig = toml::from_str("[sweep]\nkernels = [\"rbf\"]").unwrap();
        assert!(matches!(config.sweep_grid(), Err(Error::UnknownKernel(_))));

        let config: AnalysisConfig = toml::from_str("[sweep]\nbetas = [1.0, 0.0]").unwrap();
        assert!(matches!(config.sweep_grid(), Err(Error::IllegalBeta(_))));

        let config: AnalysisConfig = toml::from_str("[classifier]\nkernel = \"l1\"\nfamily = \"similarity\"").unwrap();
        assert!(matches!(
            config.classifier_options(),
            Err(Error::KernelFamilyMismatch { .. })
        ));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.toml");
        fs::write(&path, "[sweep]\nbetas = \"many\"\n").unwrap();
        match AnalysisConfig::load(&path) {
            Err(Error::Config { path: reported, .. }) => assert_eq!(path, reported),
            other => panic!("expected a config error, got {:?}", other),
        }

        fs::write(&path, "[output]\ndir = \"out\"\n").unwrap();
        assert_eq!(PathBuf::from("out"), AnalysisConfig::load(&path).unwrap().output.dir);
    }
}
