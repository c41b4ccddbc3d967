//! Validate command - load component configuration and report diagnostics

use std::io;
use std::path::Path;

use crate::display::pluralize;
use crate::error::{CliError, Result};

pub fn run(config_path: &Path, vars: &[String], names: &[String], json: bool) -> Result<()> {
    let config = super::load_cluster_config(config_path, vars)?;
    let (_, report) = super::load_components(&config, names)?;

    if json {
        let output = serde_json::to_string_pretty(&report.to_json())
            .map_err(|e| CliError::other(e.to_string()))?;
        println!("{}", output);
    } else {
        let mut stdout = io::stdout().lock();
        report.write(&mut stdout)?;
        report.write_summary(&mut stdout)?;
    }

    if report.has_errors() {
        let (errors, _) = report.summary();
        return Err(CliError::validation(format!(
            "{} in {}",
            pluralize(errors, "error", "errors"),
            report.failed().join(", ")
        )));
    }
    Ok(())
}
