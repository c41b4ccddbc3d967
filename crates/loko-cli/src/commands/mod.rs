//! CLI commands

pub mod dns;
pub mod list;
pub mod render;
pub mod validate;

use loko_components::registry;
use loko_core::{ClusterConfig, Component, parse_set_values};
use std::path::Path;
use tracing::debug;

use crate::display::DiagnosticReport;
use crate::error::{CliError, Result};

/// Read the cluster configuration and apply `--var` overrides
pub fn load_cluster_config(path: &Path, vars: &[String]) -> Result<ClusterConfig> {
    let mut config = ClusterConfig::from_file(path)?;

    if !vars.is_empty() {
        let overrides = parse_set_values(vars)
            .map_err(|e| CliError::validation_with_help(e.to_string(), "Use --var key=value"))?;
        config.merge_variables(&overrides);
        debug!(count = vars.len(), "applied variable overrides");
    }

    Ok(config)
}

/// Look up and load the selected components, every configured one by default
///
/// Unknown names fail before anything is loaded. Loading itself never
/// fails: its diagnostics are collected in the report.
pub fn load_components(
    config: &ClusterConfig,
    names: &[String],
) -> Result<(Vec<Box<dyn Component>>, DiagnosticReport)> {
    let registry = registry().map_err(|e| CliError::other(e.to_string()))?;

    let selected: Vec<&str> = if names.is_empty() {
        config.component_names().collect()
    } else {
        names.iter().map(String::as_str).collect()
    };
    if selected.is_empty() {
        return Err(CliError::validation_with_help(
            "no components configured",
            "Declare components under the 'components' key of the cluster configuration",
        ));
    }

    let mut components = Vec::with_capacity(selected.len());
    for name in &selected {
        components.push(registry.lookup(name)?);
    }

    let ctx = config.eval_context();
    let mut report = DiagnosticReport::new();
    for component in &mut components {
        let name = component.name();
        let body = config.component(name).ok_or_else(|| {
            CliError::validation_with_help(
                format!("component '{}' is not configured", name),
                format!("Add a 'components.{}' entry to the cluster configuration", name),
            )
        })?;

        let diags = component.load_config(body, &ctx);
        debug!(component = name, diagnostics = diags.len(), "loaded configuration");
        report.add(name, diags);
    }

    Ok((components, report))
}
