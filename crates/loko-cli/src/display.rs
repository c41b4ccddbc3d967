//! Display formatting for CLI output
//!
//! Diagnostics are grouped by component, each followed by its detail as a
//! hint, then a one-line summary.

use console::style;
use loko_core::{Diagnostic, Diagnostics, Severity};
use std::io::{self, Write};

/// Diagnostics of every loaded component, in load order
#[derive(Debug, Default)]
pub struct DiagnosticReport {
    components: Vec<(String, Diagnostics)>,
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of loading `component`
    pub fn add(&mut self, component: &str, diagnostics: Diagnostics) {
        self.components.push((component.to_string(), diagnostics));
    }

    /// Get summary counts
    pub fn summary(&self) -> (usize, usize) {
        self.components
            .iter()
            .fold((0, 0), |(errors, warnings), (_, diags)| {
                (
                    errors + diags.errors().count(),
                    warnings + diags.warnings().count(),
                )
            })
    }

    pub fn has_errors(&self) -> bool {
        self.components.iter().any(|(_, diags)| diags.has_errors())
    }

    /// Names of components that failed to load
    pub fn failed(&self) -> Vec<&str> {
        self.components
            .iter()
            .filter(|(_, diags)| diags.has_errors())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Write every component with its diagnostics
    pub fn write(&self, out: &mut dyn Write) -> io::Result<()> {
        for (component, diags) in &self.components {
            let icon = if diags.has_errors() {
                style("✗").red()
            } else if diags.is_empty() {
                style("✓").green()
            } else {
                style("⚠").yellow()
            };
            writeln!(out, "{} {}", icon, style(component).cyan().bold())?;

            for diag in diags {
                write_diagnostic(diag, out)?;
            }
        }
        Ok(())
    }

    /// Write the summary line
    pub fn write_summary(&self, out: &mut dyn Write) -> io::Result<()> {
        let (errors, warnings) = self.summary();
        if errors > 0 {
            writeln!(
                out,
                "{} Validation failed: {}, {}",
                style("✗").red().bold(),
                pluralize(errors, "error", "errors"),
                pluralize(warnings, "warning", "warnings")
            )
        } else if warnings > 0 {
            writeln!(
                out,
                "{} Validation passed with {}",
                style("⚠").yellow().bold(),
                pluralize(warnings, "warning", "warnings")
            )
        } else {
            writeln!(out, "{} Validation passed!", style("✓").green().bold())
        }
    }

    /// All diagnostics as a JSON document keyed by component
    pub fn to_json(&self) -> serde_json::Value {
        let components: serde_json::Map<_, _> = self
            .components
            .iter()
            .map(|(name, diags)| (name.clone(), serde_json::json!(diags)))
            .collect();
        let (errors, warnings) = self.summary();

        serde_json::json!({
            "valid": errors == 0,
            "errors": errors,
            "warnings": warnings,
            "components": components,
        })
    }
}

fn write_diagnostic(diag: &Diagnostic, out: &mut dyn Write) -> io::Result<()> {
    let icon = match diag.severity {
        Severity::Error => style("✗").red(),
        Severity::Warning => style("⚠").yellow(),
    };
    let location = match &diag.subject {
        Some(subject) => format!(" at {}", style(subject).dim()),
        None => String::new(),
    };

    writeln!(out, "  {} {}{}", icon, diag.summary, location)?;
    if !diag.detail.is_empty() {
        writeln!(out, "    {} {}", style("hint:").blue(), diag.detail)?;
    }
    Ok(())
}

/// Format count with proper pluralization
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}
