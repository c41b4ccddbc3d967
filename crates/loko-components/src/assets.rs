//! Charts and manifests embedded in the binary

use include_dir::{Dir, DirEntry, include_dir};
use loko_engine::{Chart, EngineError};

static ASSETS: Dir = include_dir!("$CARGO_MANIFEST_DIR/assets");

/// Asset directory of a component, `components/<name>`
pub fn component_dir(name: &str) -> Option<&'static Dir<'static>> {
    ASSETS.get_dir(format!("components/{}", name))
}

/// Load the chart a component ships with
pub fn load_chart(name: &str) -> Result<Chart, EngineError> {
    let dir = component_dir(name).ok_or_else(|| EngineError::Chart {
        message: format!("no embedded chart for component '{}'", name),
    })?;
    Chart::from_embedded(dir)
}

/// Every file with `extension` below `components/<name>/<subdir>`
///
/// Keys are paths relative to `subdir`, sorted.
pub fn component_files(
    name: &str,
    subdir: &str,
    extension: &str,
) -> Result<Vec<(String, String)>, EngineError> {
    let root = ASSETS
        .get_dir(format!("components/{}/{}", name, subdir))
        .ok_or_else(|| EngineError::Chart {
            message: format!("no embedded '{}' directory for component '{}'", subdir, name),
        })?;

    let mut files = Vec::new();
    collect(root, root, extension, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect(
    root: &Dir<'_>,
    dir: &Dir<'_>,
    extension: &str,
    files: &mut Vec<(String, String)>,
) -> Result<(), EngineError> {
    for entry in dir.entries() {
        match entry {
            DirEntry::Dir(sub) => collect(root, sub, extension, files)?,
            DirEntry::File(file) => {
                if file.path().extension().and_then(|e| e.to_str()) != Some(extension) {
                    continue;
                }
                let rel = file.path().strip_prefix(root.path()).unwrap_or(file.path());
                let content = file.contents_utf8().ok_or_else(|| EngineError::Chart {
                    message: format!("{} is not valid UTF-8", file.path().display()),
                })?;
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                files.push((key, content.to_string()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charts_load() {
        for name in ["cluster-autoscaler", "contour"] {
            let chart = load_chart(name).unwrap();
            assert_eq!(chart.name(), name);
            assert!(!chart.templates.is_empty());
        }
    }

    #[test]
    fn test_missing_component() {
        assert!(load_chart("nope").is_err());
    }

    #[test]
    fn test_component_files_filters_extension() {
        let files = component_files("flatcar-linux-update-operator", "manifests", "yaml").unwrap();
        let names: Vec<_> = files.iter().map(|(name, _)| name.as_str()).collect();

        assert_eq!(
            names,
            vec![
                "cluster-role-binding.yaml",
                "cluster-role.yaml",
                "service-account.yaml",
                "update-agent.yaml",
                "update-operator.yaml",
            ]
        );
    }
}
