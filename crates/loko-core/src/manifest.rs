//! Rendered manifest sets

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Relative file path to manifest text, ordered by path
///
/// Ordering by key keeps output stable between runs, which the apply
/// step relies on to detect changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ManifestSet(BTreeMap<String, String>);

impl ManifestSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a manifest, replacing any previous content at `path`
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.0.insert(path.into(), content.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Merge another set under `prefix/`
    pub fn extend_prefixed(&mut self, prefix: &str, other: ManifestSet) {
        for (path, content) in other.0 {
            self.0.insert(format!("{}/{}", prefix, path), content);
        }
    }

    /// All manifests as one multi-document YAML stream
    pub fn to_multi_document(&self) -> String {
        let mut output = String::new();
        for (path, content) in &self.0 {
            output.push_str("---\n");
            output.push_str(&format!("# Source: {}\n", path));
            output.push_str(content.trim_start_matches("---\n").trim_end());
            output.push('\n');
        }
        output
    }

    /// Write every manifest below `dir`, creating directories as needed
    pub fn write_to_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.0.len());
        for (path, content) in &self.0 {
            let target = dir.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, content)?;
            written.push(target);
        }
        Ok(written)
    }
}

impl FromIterator<(String, String)> for ManifestSet {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ManifestSet {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
