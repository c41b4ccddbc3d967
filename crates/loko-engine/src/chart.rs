//! Chart loading
//!
//! A chart is a directory with:
//! - `Chart.yaml`: name, version and optional app version
//! - `values.yaml`: default values
//! - `templates/`: MiniJinja templates, `_`-prefixed files are helpers
//! - `crds/`: custom resource definitions, emitted verbatim
//!
//! Charts are loaded either from directories embedded in the binary or
//! from the filesystem.

use include_dir::{Dir, DirEntry};
use loko_core::{ChartInfo, Values};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{EngineError, Result};

/// Chart.yaml contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    pub name: String,

    pub version: Version,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A fully loaded chart
#[derive(Debug, Clone)]
pub struct Chart {
    pub metadata: ChartMetadata,

    /// Defaults from values.yaml
    pub values: Values,

    /// Template sources keyed by path relative to `templates/`
    pub templates: BTreeMap<String, String>,

    /// CRD manifests keyed by path relative to `crds/`
    pub crds: BTreeMap<String, String>,
}

impl Chart {
    /// Load a chart embedded with `include_dir!`
    pub fn from_embedded(dir: &Dir<'_>) -> Result<Self> {
        let mut files = Vec::new();
        collect_embedded(dir, dir.path(), &mut files)?;
        Self::from_files(files)
    }

    /// Load a chart from a directory on disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref();
        if !root.is_dir() {
            return Err(EngineError::Chart {
                message: format!("chart directory not found: {}", root.display()),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| EngineError::Chart {
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let content = std::fs::read_to_string(entry.path())?;
            files.push((normalize(rel), content));
        }

        Self::from_files(files)
    }

    /// Build a chart from `(relative path, content)` pairs
    pub fn from_files(files: Vec<(String, String)>) -> Result<Self> {
        let mut metadata = None;
        let mut values = Values::new();
        let mut templates = BTreeMap::new();
        let mut crds = BTreeMap::new();

        for (path, content) in files {
            if path == "Chart.yaml" {
                metadata = Some(serde_yaml::from_str::<ChartMetadata>(&content)?);
            } else if path == "values.yaml" {
                values = Values::from_yaml(&content)?;
            } else if let Some(name) = path.strip_prefix("templates/") {
                templates.insert(name.to_string(), content);
            } else if let Some(name) = path.strip_prefix("crds/") {
                crds.insert(name.to_string(), content);
            }
        }

        let metadata = metadata.ok_or_else(|| EngineError::Chart {
            message: "Chart.yaml is missing".to_string(),
        })?;

        Ok(Self {
            metadata,
            values,
            templates,
            crds,
        })
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Chart information exposed to templates
    pub fn info(&self) -> ChartInfo {
        ChartInfo {
            name: self.metadata.name.clone(),
            version: self.metadata.version.to_string(),
            app_version: self.metadata.app_version.clone(),
        }
    }
}

fn collect_embedded(dir: &Dir<'_>, root: &Path, files: &mut Vec<(String, String)>) -> Result<()> {
    for entry in dir.entries() {
        match entry {
            DirEntry::Dir(sub) => collect_embedded(sub, root, files)?,
            DirEntry::File(file) => {
                let rel = file.path().strip_prefix(root).unwrap_or(file.path());
                let content = file.contents_utf8().ok_or_else(|| EngineError::Chart {
                    message: format!("{} is not valid UTF-8", file.path().display()),
                })?;
                files.push((normalize(rel), content.to_string()));
            }
        }
    }
    Ok(())
}

/// Forward-slash relative path
fn normalize(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
