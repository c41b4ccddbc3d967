//! Kubernetes-specific template filters
//!
//! These filters extend MiniJinja with the Helm-style helpers component
//! charts rely on.

use base64::Engine as _;
use minijinja::{Error, ErrorKind, Value};

fn invalid(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidOperation, message.into())
}

/// Convert a value to YAML format
///
/// Usage: {{ values.tolerations | toyaml }}
pub fn toyaml(value: Value) -> Result<String, Error> {
    let json_value: serde_json::Value =
        serde_json::to_value(&value).map_err(|e| invalid(e.to_string()))?;

    let yaml = serde_yaml::to_string(&json_value).map_err(|e| invalid(e.to_string()))?;

    // Remove trailing newline and leading "---\n" if present
    Ok(yaml.trim_start_matches("---\n").trim_end().to_string())
}

/// Convert a value to JSON format
///
/// Usage: {{ values.config | tojson }}
pub fn tojson(value: Value) -> Result<String, Error> {
    let json_value: serde_json::Value =
        serde_json::to_value(&value).map_err(|e| invalid(e.to_string()))?;

    serde_json::to_string(&json_value).map_err(|e| invalid(e.to_string()))
}

/// Base64 encode a string
///
/// Usage: {{ values.packetApiKey | b64encode }}
#[must_use]
pub fn b64encode(value: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

/// Quote a string with double quotes
///
/// Usage: {{ name | quote }}
#[must_use]
pub fn quote(value: Value) -> String {
    let s = match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    };
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Indent text with a newline prefix (like Helm's nindent)
///
/// Usage: {{ content | nindent(4) }}
#[must_use]
pub fn nindent(value: String, spaces: usize) -> String {
    format!("\n{}", indent(value, spaces))
}

#[must_use]
fn indent(value: String, spaces: usize) -> String {
    let indent_str = " ".repeat(spaces);
    value
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", indent_str, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Require a value, fail if undefined or empty
///
/// Usage: {{ values.clusterName | required("clusterName is required") }}
pub fn required(value: Value, message: Option<String>) -> Result<Value, Error> {
    if value.is_undefined() || value.is_none() {
        return Err(invalid(
            message.unwrap_or_else(|| "required value is missing".to_string()),
        ));
    }
    if value.as_str().is_some_and(str::is_empty) {
        return Err(invalid(
            message.unwrap_or_else(|| "required value is empty".to_string()),
        ));
    }
    Ok(value)
}

/// SHA256 hash of a string
///
/// Usage: {{ values | tojson | sha256 }}
pub fn sha256sum(value: String) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Truncate a string to a maximum number of characters
///
/// Usage: {{ name | trunc(63) }}
pub fn trunc(value: String, length: usize) -> String {
    if value.chars().count() <= length {
        value
    } else {
        value.chars().take(length).collect()
    }
}
