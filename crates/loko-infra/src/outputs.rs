//! Infrastructure outputs
//!
//! The provisioning phase leaves JSON outputs behind (for example the DNS
//! entries the operator must create). They are read either by running
//! `terraform output -json <key>` in the assets directory or from a saved
//! `terraform output -json` dump.

use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::error::OutputError;

/// Synchronous key to JSON value source
pub trait OutputSource {
    fn output(&self, key: &str) -> Result<JsonValue, OutputError>;
}

/// Runs the terraform binary in a working directory
#[derive(Debug, Clone)]
pub struct TerraformOutputs {
    binary: String,
    workdir: PathBuf,
}

impl TerraformOutputs {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            binary: "terraform".to_string(),
            workdir: workdir.into(),
        }
    }

    /// Use another executable, e.g. a wrapper script
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl OutputSource for TerraformOutputs {
    fn output(&self, key: &str) -> Result<JsonValue, OutputError> {
        let command = format!("{} output -json {}", self.binary, key);
        debug!(command = %command, workdir = %self.workdir.display(), "reading output");

        let output = Command::new(&self.binary)
            .args(["output", "-json", key])
            .current_dir(&self.workdir)
            .output()
            .map_err(|source| OutputError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(OutputError::Command {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|source| OutputError::Json {
            key: key.to_string(),
            source,
        })
    }
}

/// Reads a saved `terraform output -json` dump
///
/// The dump maps every key to `{"sensitive": .., "type": .., "value": ..}`.
#[derive(Debug, Clone)]
pub struct FileOutputs {
    path: PathBuf,
}

impl FileOutputs {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutputSource for FileOutputs {
    fn output(&self, key: &str) -> Result<JsonValue, OutputError> {
        let content = std::fs::read_to_string(&self.path)?;
        let dump: JsonValue =
            serde_json::from_str(&content).map_err(|source| OutputError::Json {
                key: key.to_string(),
                source,
            })?;

        dump.get(key)
            .and_then(|entry| entry.get("value"))
            .cloned()
            .ok_or_else(|| OutputError::Missing {
                key: key.to_string(),
            })
    }
}
