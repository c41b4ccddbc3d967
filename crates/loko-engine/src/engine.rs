//! Template engine based on MiniJinja

use loko_core::{ManifestSet, ReleaseInfo, TemplateContext, Values};
use minijinja::{Environment, Value};
use serde::Serialize;
use tracing::debug;

use crate::chart::Chart;
use crate::error::{EngineError, Result, TemplateError};
use crate::filters;

/// The template engine
///
/// Undefined values are always an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    /// Create a configured MiniJinja environment
    fn create_environment(&self) -> Environment<'static> {
        let mut env = Environment::new();

        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        // Manifests are whitespace sensitive
        env.set_keep_trailing_newline(true);
        env.set_trim_blocks(true);

        env.add_filter("toyaml", filters::toyaml);
        env.add_filter("tojson", filters::tojson);
        env.add_filter("b64encode", filters::b64encode);
        env.add_filter("quote", filters::quote);
        env.add_filter("nindent", filters::nindent);
        env.add_filter("required", filters::required);
        env.add_filter("sha256", filters::sha256sum);
        env.add_filter("trunc", filters::trunc);

        env
    }

    /// Render a single template string against arbitrary data
    pub fn render_string<S: Serialize>(
        &self,
        template: &str,
        data: &S,
        template_name: &str,
    ) -> Result<String> {
        let mut env = self.create_environment();
        env.add_template_owned(template_name.to_string(), template.to_string())
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template))?;

        let tmpl = env
            .get_template(template_name)
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template))?;

        tmpl.render(Value::from_serialize(data))
            .map_err(|e| TemplateError::from_minijinja(e, template_name, template).into())
    }

    /// Render a values template and parse the result as YAML values
    ///
    /// This is how a component turns its typed configuration into chart
    /// values: the template sees the configuration, the output is merged
    /// over the chart's defaults.
    pub fn render_values<S: Serialize>(
        &self,
        template: &str,
        data: &S,
        template_name: &str,
    ) -> Result<Values> {
        let rendered = self.render_string(template, data, template_name)?;
        let value: serde_json::Value =
            serde_yaml::from_str(&rendered).map_err(|source| EngineError::ValuesYaml {
                template: template_name.to_string(),
                source,
            })?;

        Ok(match value {
            serde_json::Value::Null => Values::new(),
            value => Values(value),
        })
    }

    /// Render all templates of a chart
    ///
    /// Output keys are `<chart>/templates/<file>` and `<chart>/crds/<file>`.
    /// Helper templates and templates rendering to nothing are left out.
    pub fn render_chart(
        &self,
        chart: &Chart,
        release: &ReleaseInfo,
        values: &Values,
    ) -> Result<ManifestSet> {
        let mut merged = chart.values.clone();
        merged.merge(values);
        let context = TemplateContext::new(merged, release.clone(), chart.info());

        // Load every template first so helpers can be imported
        let mut env = self.create_environment();
        for (name, source) in &chart.templates {
            env.add_template_owned(name.clone(), source.clone())
                .map_err(|e| TemplateError::from_minijinja(e, name, source))?;
        }

        let ctx = minijinja::context! {
            values => &context.values,
            release => &context.release,
            chart => &context.chart,
        };

        let mut manifests = ManifestSet::new();
        let chart_name = chart.name();

        for (name, source) in &chart.templates {
            let file_name = name.rsplit('/').next().unwrap_or(name);
            if file_name.starts_with('_') {
                continue;
            }

            let tmpl = env
                .get_template(name)
                .map_err(|e| TemplateError::from_minijinja(e, name, source))?;
            let rendered = tmpl
                .render(&ctx)
                .map_err(|e| TemplateError::from_minijinja(e, name, source))?;

            // Skip empty rendered templates
            let trimmed = rendered.trim();
            if trimmed.is_empty() || trimmed == "---" {
                debug!(chart = chart_name, template = %name, "template rendered empty, skipping");
                continue;
            }

            let output_name = name.trim_end_matches(".j2");
            manifests.insert(format!("{}/templates/{}", chart_name, output_name), rendered);
        }

        for (name, source) in &chart.crds {
            manifests.insert(format!("{}/crds/{}", chart_name, name), source.clone());
        }

        debug!(
            chart = chart_name,
            release = %release.name,
            manifests = manifests.len(),
            "rendered chart"
        );
        Ok(manifests)
    }
}
