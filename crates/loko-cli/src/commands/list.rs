//! List command - show the built-in components

use console::style;
use loko_components::registry;
use loko_core::Metadata;

use crate::error::{CliError, Result};

pub fn run(json: bool) -> Result<()> {
    let registry = registry().map_err(|e| CliError::other(e.to_string()))?;

    let mut metadata = Vec::with_capacity(registry.len());
    for name in registry.names() {
        metadata.push(registry.lookup(name)?.metadata());
    }

    if json {
        let output =
            serde_json::to_string_pretty(&metadata).map_err(|e| CliError::other(e.to_string()))?;
        println!("{}", output);
        return Ok(());
    }

    let width = metadata.iter().map(|m| m.name.len()).max().unwrap_or(0);
    println!(
        "{:width$}  {}",
        style("NAME").bold(),
        style("NAMESPACE").bold(),
        width = width
    );
    for Metadata { name, namespace, .. } in &metadata {
        println!("{:width$}  {}", name, namespace, width = width);
    }
    Ok(())
}
