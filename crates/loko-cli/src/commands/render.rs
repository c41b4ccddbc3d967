//! Render command - produce the manifests of the configured components

use console::style;
use loko_core::ManifestSet;
use std::io;
use std::path::Path;
use tracing::debug;

use crate::display::pluralize;
use crate::error::{CliError, Result};

pub fn run(
    config_path: &Path,
    vars: &[String],
    names: &[String],
    output_dir: Option<&Path>,
) -> Result<()> {
    let config = super::load_cluster_config(config_path, vars)?;
    let (components, report) = super::load_components(&config, names)?;

    if report.has_errors() {
        let mut stderr = io::stderr().lock();
        report.write(&mut stderr)?;
        report.write_summary(&mut stderr)?;
        return Err(CliError::validation_with_help(
            format!("cannot render {}", report.failed().join(", ")),
            "Run 'lokoctl component validate' for details",
        ));
    }

    let mut manifests = ManifestSet::new();
    for component in &components {
        let rendered = component.render_manifests()?;
        debug!(component = component.name(), manifests = rendered.len(), "rendered");
        manifests.extend_prefixed(component.name(), rendered);
    }

    match output_dir {
        Some(dir) => {
            let written = manifests.write_to_dir(dir)?;
            println!(
                "{} Wrote {} to {}",
                style("✓").green(),
                pluralize(written.len(), "manifest", "manifests"),
                dir.display()
            );
        }
        None => print!("{}", manifests.to_multi_document()),
    }
    Ok(())
}
