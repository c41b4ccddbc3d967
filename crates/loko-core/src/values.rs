//! Nested values: configuration variables and chart values
//!
//! Both are JSON trees. Overrides are applied with [`Values::merge`], where
//! mappings merge key by key and anything else is replaced wholesale.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    pub fn new() -> Self {
        Self(JsonValue::Object(Map::new()))
    }

    /// Parse a YAML document, an empty one yields empty values
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::new());
        }
        Ok(match serde_yaml::from_str::<JsonValue>(yaml)? {
            JsonValue::Null => Self::new(),
            value => Self(value),
        })
    }

    /// Apply `overlay` on top of these values
    pub fn merge(&mut self, overlay: &Values) {
        merge_into(&mut self.0, &overlay.0);
    }

    /// Set a value by dotted path (e.g. `packet.facility`), creating
    /// intermediate mappings
    pub fn set(&mut self, path: &str, value: JsonValue) -> Result<()> {
        if path.split('.').any(str::is_empty) {
            return Err(CoreError::ValuesMerge {
                message: format!("Invalid path '{}'", path),
            });
        }

        let keys: Vec<&str> = path.split('.').collect();
        set_path(&mut self.0, &keys, value);
        Ok(())
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        path.split('.')
            .try_fold(&self.0, |node, key| node.as_object()?.get(key))
    }

    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    pub fn into_inner(self) -> JsonValue {
        self.0
    }
}

fn merge_into(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                base_map
                    .entry(key.clone())
                    .and_modify(|existing| merge_into(existing, value))
                    .or_insert_with(|| value.clone());
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Scalars on the way are replaced by mappings
fn set_path(node: &mut JsonValue, keys: &[&str], value: JsonValue) {
    let Some((key, rest)) = keys.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        *node = JsonValue::Object(Map::new());
    }
    if let JsonValue::Object(map) = node {
        set_path(map.entry(*key).or_insert(JsonValue::Null), rest, value);
    }
}

/// Parse `--var key=value` arguments
///
/// Values are read as YAML, so `3`, `true` and `[a, b]` keep their type.
/// Anything that fails to parse is taken as a plain string.
pub fn parse_set_values(args: &[String]) -> Result<Values> {
    let mut values = Values::new();

    for arg in args {
        let (key, raw) = arg.split_once('=').ok_or_else(|| CoreError::ValuesMerge {
            message: format!("Invalid --var format: '{}'. Expected key=value", arg),
        })?;

        let value = match serde_yaml::from_str::<JsonValue>(raw) {
            Ok(JsonValue::Null) if raw.is_empty() => JsonValue::String(String::new()),
            Ok(value) => value,
            Err(_) => JsonValue::String(raw.to_string()),
        };
        values.set(key, value)?;
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deep_merge() {
        let mut base = Values::from_yaml(
            r#"
image:
  repository: envoyproxy/envoy
  tag: v1.14.1
replicas: 1
"#,
        )
        .unwrap();

        let overlay = Values::from_yaml(
            r#"
image:
  tag: v1.16.0
  pullPolicy: Always
replicas: 3
"#,
        )
        .unwrap();

        base.merge(&overlay);

        assert_eq!(base.get("image.repository").unwrap(), "envoyproxy/envoy");
        assert_eq!(base.get("image.tag").unwrap(), "v1.16.0");
        assert_eq!(base.get("image.pullPolicy").unwrap(), "Always");
        assert_eq!(base.get("replicas").unwrap(), 3);
    }

    #[test]
    fn test_arrays_are_replaced() {
        let mut base = Values::from_yaml("hosts: [a, b]").unwrap();
        base.merge(&Values::from_yaml("hosts: [c]").unwrap());
        assert_eq!(base.get("hosts").unwrap(), &serde_json::json!(["c"]));
    }

    #[test]
    fn test_set_nested() {
        let mut values = Values::new();
        values.set("image.tag", JsonValue::String("v1".into())).unwrap();
        values.set("replicas", JsonValue::Number(3.into())).unwrap();

        assert_eq!(values.get("image.tag").unwrap(), "v1");
        assert_eq!(values.get("replicas").unwrap(), 3);
        assert!(values.set("a..b", JsonValue::Null).is_err());
    }

    #[test]
    fn test_empty_yaml() {
        assert_eq!(Values::from_yaml("").unwrap(), Values::new());
    }

    #[test]
    fn test_set_replaces_scalar_parent() {
        let mut values = Values::from_yaml("packet: disabled").unwrap();
        values.set("packet.facility", "ams1".into()).unwrap();
        assert_eq!(values.get("packet.facility").unwrap(), "ams1");
        assert!(values.get("packet.facility.code").is_none());
    }

    #[test]
    fn test_parse_set_values() {
        let values = parse_set_values(&[
            "cluster_name=demo".to_string(),
            "workers=3".to_string(),
            "packet.enabled=true".to_string(),
            "zones=[\"ams1\"]".to_string(),
            "domain=example.org".to_string(),
            "suffix=".to_string(),
        ])
        .unwrap();

        assert_eq!(values.get("cluster_name").unwrap(), "demo");
        assert_eq!(values.get("workers").unwrap(), 3);
        assert_eq!(values.get("packet.enabled").unwrap(), true);
        assert_eq!(values.get("zones").unwrap(), &serde_json::json!(["ams1"]));
        assert_eq!(values.get("domain").unwrap(), "example.org");
        assert_eq!(values.get("suffix").unwrap(), "");
    }

    #[test]
    fn test_parse_set_values_rejects_missing_equals() {
        assert!(parse_set_values(&["oops".to_string()]).is_err());
    }
}
