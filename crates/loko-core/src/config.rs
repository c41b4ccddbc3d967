//! Cluster configuration file
//!
//! ```yaml
//! variables:
//!   cluster_name: demo
//! components:
//!   contour:
//!     service_type: NodePort
//!   flatcar-linux-update-operator:
//! ```
//!
//! A component listed with no value is declared without a configuration
//! block; `{}` declares it with an empty one.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::path::Path;

use crate::ast::{Body, SourceRef};
use crate::error::{CoreError, Result};
use crate::eval::EvalContext;
use crate::values::Values;

const TOP_LEVEL_KEYS: &[&str] = &["variables", "components"];

#[derive(Debug, Clone, Default)]
pub struct ClusterConfig {
    /// File the configuration was read from
    pub file: Option<String>,

    /// Values exposed to expressions as `var`
    pub variables: Values,

    /// Declared components in file order
    components: IndexMap<String, Option<Body>>,
}

impl ClusterConfig {
    /// Load a cluster configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content, Some(path.display().to_string()))
    }

    /// Parse a cluster configuration from YAML
    pub fn from_yaml(yaml: &str, file: Option<String>) -> Result<Self> {
        let invalid = |message: String| CoreError::InvalidConfig {
            file: file.clone().unwrap_or_else(|| "<input>".to_string()),
            message,
        };

        let root: YamlValue = serde_yaml::from_str(yaml)?;
        let mapping = match root {
            YamlValue::Null => {
                return Ok(Self {
                    file: file.clone(),
                    ..Default::default()
                });
            }
            YamlValue::Mapping(mapping) => mapping,
            _ => return Err(invalid("top level must be a mapping".to_string())),
        };

        let mut config = Self {
            file: file.clone(),
            ..Default::default()
        };

        for (key, value) in &mapping {
            let key = key
                .as_str()
                .ok_or_else(|| invalid(format!("top-level keys must be strings, found {:?}", key)))?;

            match key {
                "variables" => {
                    let variables: JsonValue = serde_yaml::from_value(value.clone())?;
                    config.variables = match variables {
                        JsonValue::Null => Values::new(),
                        JsonValue::Object(_) => Values(variables),
                        _ => return Err(invalid("'variables' must be a mapping".to_string())),
                    };
                }
                "components" => {
                    let components = match value {
                        YamlValue::Null => continue,
                        YamlValue::Mapping(components) => components,
                        _ => return Err(invalid("'components' must be a mapping".to_string())),
                    };
                    for (name, body) in components {
                        let name = name.as_str().ok_or_else(|| {
                            invalid(format!("component names must be strings, found {:?}", name))
                        })?;
                        if config.components.contains_key(name) {
                            return Err(invalid(format!("component '{}' is declared twice", name)));
                        }
                        let range = SourceRef::new(file.clone(), format!("components.{}", name));
                        let body = match body {
                            YamlValue::Null => None,
                            other => Some(Body::from_yaml(other, range)?),
                        };
                        config.components.insert(name.to_string(), body);
                    }
                }
                other => {
                    return Err(invalid(format!(
                        "unknown top-level key '{}', expected one of: {}",
                        other,
                        TOP_LEVEL_KEYS.join(", ")
                    )));
                }
            }
        }

        Ok(config)
    }

    /// Override variables, e.g. from `--var key=value`
    pub fn merge_variables(&mut self, overrides: &Values) {
        self.variables.merge(overrides);
    }

    /// Names of the declared components in file order
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Configuration of a declared component
    ///
    /// `None` if the component is not declared, `Some(None)` if it is
    /// declared without a block.
    pub fn component(&self, name: &str) -> Option<Option<&Body>> {
        self.components.get(name).map(Option::as_ref)
    }

    /// Context for evaluating component expressions
    pub fn eval_context(&self) -> EvalContext {
        EvalContext::with_variables(self.variables.inner().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLUSTER: &str = r#"
variables:
  cluster_name: demo
components:
  cluster-autoscaler:
    cluster_name: ${var.cluster_name}
    worker_pool: pool-1
  contour: {}
  flatcar-linux-update-operator:
"#;

    #[test]
    fn test_parse_cluster_config() {
        let config = ClusterConfig::from_yaml(CLUSTER, Some("cluster.yaml".into())).unwrap();

        let names: Vec<_> = config.component_names().collect();
        assert_eq!(
            names,
            vec!["cluster-autoscaler", "contour", "flatcar-linux-update-operator"]
        );
        assert_eq!(config.variables.get("cluster_name").unwrap(), "demo");
    }

    #[test]
    fn test_declared_without_block() {
        let config = ClusterConfig::from_yaml(CLUSTER, None).unwrap();

        assert_eq!(config.component("flatcar-linux-update-operator"), Some(None));
        let contour = config.component("contour").unwrap().unwrap();
        assert!(contour.is_empty());
        assert_eq!(config.component("missing"), None);
    }

    #[test]
    fn test_body_ranges_include_file() {
        let config = ClusterConfig::from_yaml(CLUSTER, Some("cluster.yaml".into())).unwrap();
        let body = config.component("cluster-autoscaler").unwrap().unwrap();

        let attr = body.attribute("worker_pool").unwrap();
        assert_eq!(attr.range.file.as_deref(), Some("cluster.yaml"));
        assert_eq!(attr.range.path, "components.cluster-autoscaler.worker_pool");
    }

    #[test]
    fn test_eval_context_with_overrides() {
        let mut config = ClusterConfig::from_yaml(CLUSTER, None).unwrap();
        let mut overrides = Values::new();
        overrides
            .set("cluster_name", JsonValue::String("prod".into()))
            .unwrap();
        config.merge_variables(&overrides);

        let ctx = config.eval_context();
        assert_eq!(ctx.namespace("var").unwrap()["cluster_name"], "prod");
    }

    #[test]
    fn test_unknown_top_level_key() {
        let err = ClusterConfig::from_yaml("clusters: {}\n", None).unwrap_err();
        assert!(err.to_string().contains("unknown top-level key 'clusters'"));
    }

    #[test]
    fn test_empty_file() {
        let config = ClusterConfig::from_yaml("", None).unwrap();
        assert_eq!(config.component_names().count(), 0);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClusterConfig::from_file(dir.path().join("cluster.yaml")).unwrap_err();
        assert!(matches!(err, CoreError::ConfigNotFound { .. }));
    }
}
