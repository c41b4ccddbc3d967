//! flatcar-linux-update-operator
//!
//! Coordinates node reboots after OS updates. Takes no configuration and
//! ships plain manifests instead of a chart.

use loko_core::{
    Body, Component, Diagnostics, EvalContext, HelmMetadata, ManifestSet, Metadata, RenderError,
    RenderPhase, Schema, decode_optional,
};
use tracing::debug;

use crate::assets;

pub const NAME: &str = "flatcar-linux-update-operator";

pub const NAMESPACE: &str = "reboot-coordinator";

#[derive(Debug, Default)]
pub struct FlatcarLinuxUpdateOperator {
    loaded: bool,
}

impl FlatcarLinuxUpdateOperator {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn boxed() -> Box<dyn Component> {
        Box::new(Self::new())
    }
}

impl Component for FlatcarLinuxUpdateOperator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
    }

    fn load_config(&mut self, body: Option<&Body>, ctx: &EvalContext) -> Diagnostics {
        // Still decoded so stray settings are reported
        let (_, diags) = decode_optional(body, &self.schema(), ctx);
        self.loaded = !diags.has_errors();
        diags
    }

    fn render_manifests(&self) -> Result<ManifestSet, RenderError> {
        if !self.loaded {
            return Err(RenderError::not_loaded(NAME));
        }

        let files = assets::component_files(NAME, "manifests", "yaml")
            .map_err(|e| RenderError::phase(NAME, RenderPhase::ReadAssets, e))?;
        debug!(component = NAME, files = files.len(), "read manifests");

        Ok(files.into_iter().collect())
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(NAME, NAMESPACE).with_helm(HelmMetadata::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_body() {
        let mut component = FlatcarLinuxUpdateOperator::new();
        assert!(component.load_config(None, &EvalContext::new()).is_empty());
    }

    #[test]
    fn test_rejects_settings() {
        let mut component = FlatcarLinuxUpdateOperator::new();
        let body = Body::from_yaml_str("reboot_window: 02:00\n").unwrap();
        let diags = component.load_config(Some(&body), &EvalContext::new());

        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().summary, "Unsupported argument");
        assert!(component.render_manifests().is_err());
    }

    #[test]
    fn test_render_manifests() {
        let mut component = FlatcarLinuxUpdateOperator::new();
        component.load_config(Some(&Body::default()), &EvalContext::new());
        let manifests = component.render_manifests().unwrap();

        assert_eq!(manifests.len(), 5);
        assert!(manifests.contains("update-agent.yaml"));
        assert!(manifests.paths().all(|p| p.ends_with(".yaml")));
        assert!(
            manifests
                .get("update-operator.yaml")
                .unwrap()
                .contains("namespace: reboot-coordinator")
        );
    }

    #[test]
    fn test_metadata_requests_chart_packaging() {
        let metadata = FlatcarLinuxUpdateOperator::new().metadata();
        assert_eq!(metadata.namespace, "reboot-coordinator");
        assert_eq!(metadata.helm, Some(HelmMetadata { wait: false }));
    }

    #[test]
    fn test_render_without_load() {
        let component = FlatcarLinuxUpdateOperator::new();
        assert!(matches!(
            component.render_manifests(),
            Err(RenderError::NotLoaded { .. })
        ));
    }
}
