use std::path::Path;

use tracing::debug;

use super::{load_mapping, MappingConfig, MappingMatrix};
use crate::error::{Error, Result};

/// Named mapping presets, kept in insertion order.
#[derive(Clone, Debug, Default)]
pub struct MappingRegistry {
    entries: Vec<(String, MappingConfig)>,
}

impl MappingRegistry {
    pub fn new() -> Self {
        MappingRegistry::default()
    }

    /// Loads `<dir>/<name>.tsv` for every name.
    pub fn from_dir<P, I, S>(dir: P, names: I) -> Result<Self>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = MappingRegistry::new();
        for name in names {
            let name = name.as_ref();
            let path = dir.as_ref().join(format!("{}.tsv", name));
            if !path.is_file() {
                return Err(Error::UnknownMapping(name.to_string()));
            }
            debug!(mapping = name, path = %path.display(), "loading mapping");
            registry.insert(name, load_mapping(&path)?);
        }
        Ok(registry)
    }

    /// Adds or replaces a preset.
    pub fn insert<C: Into<MappingConfig>>(&mut self, name: &str, config: C) {
        let config = config.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = config,
            None => self.entries.push((name.to_string(), config)),
        }
    }

    pub fn get(&self, name: &str) -> Result<&MappingConfig> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
            .ok_or_else(|| Error::UnknownMapping(name.to_string()))
    }

    /// Returns the preset as an explicit matrix, reading it from disk if needed.
    pub fn matrix(&self, name: &str) -> Result<MappingMatrix> {
        match self.get(name)? {
            MappingConfig::Matrix(matrix) => Ok(matrix.clone()),
            MappingConfig::Table(path) => load_mapping(path),
            MappingConfig::AuSets(_) => Err(Error::invalid(format!(
                "mapping {:?} is defined by AU sets and needs a vocabulary to resolve",
                name
            ))),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MappingConfig)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_unknown_mapping() {
        let registry = MappingRegistry::new();
        match registry.get("Darwin") {
            Err(Error::UnknownMapping(name)) => assert_eq!("Darwin", name),
            other => panic!("expected UnknownMapping, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_keeps_order() {
        let z = MappingMatrix::from_rows(vec!["happy"], vec!["AU12"], vec![vec![1.0]]).unwrap();
        let mut registry = MappingRegistry::new();
        registry.insert("Ekman", z.clone());
        registry.insert("Darwin", z.clone());
        registry.insert("Ekman", z);
        assert_eq!(vec!["Ekman", "Darwin"], registry.names().collect::<Vec<_>>());
    }

    #[test]
    fn test_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Ekman.tsv"), "\tAU12\nhappy\t1\n").unwrap();

        let registry = MappingRegistry::from_dir(dir.path(), ["Ekman"]).unwrap();
        assert_eq!(Some(1.0), registry.matrix("Ekman").unwrap().get("happy", "AU12"));

        assert!(matches!(
            MappingRegistry::from_dir(dir.path(), ["Ekman", "Darwin"]),
            Err(Error::UnknownMapping(_))
        ));
    }
}
