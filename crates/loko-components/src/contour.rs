//! contour
//!
//! Ingress controller with an Envoy data plane, installed in the
//! `projectcontour` namespace.

use k8s_openapi::api::core::v1::{Affinity, Toleration};
use loko_core::{
    BlockSpec, Body, Component, Diagnostics, EvalContext, FieldSpec, ManifestSet, Metadata,
    ReleaseInfo, RenderError, RenderPhase, Schema, decode_optional,
};
use loko_engine::Engine;
use serde::Serialize;
use tracing::debug;

use crate::assets;
use crate::util;

pub const NAME: &str = "contour";

pub const NAMESPACE: &str = "projectcontour";

/// Label carrying the namespace name, used by network policies
pub const NAMESPACE_NAME_LABEL: &str = "lokomotive.kinvolk.io/name";

/// Envoy service annotation read by external-dns
pub const EXTERNAL_DNS_HOSTNAME: &str = "external-dns.alpha.kubernetes.io/hostname";

pub const SERVICE_TYPES: &[&str] = &["LoadBalancer", "NodePort"];

const CHART_VALUES_TMPL: &str = r#"monitoring:
  enable: {{ enable_monitoring | tojson }}
envoy:
  serviceType: {{ service_type | tojson }}
{% if ingress_hosts %}
  serviceAnnotations:
    {{ external_dns_annotation }}: {{ ingress_hosts | join(",") | tojson }}
{% endif %}
nodeAffinity: {{ node_affinity | tojson }}
tolerations: {{ tolerations | tojson }}
"#;

/// Validated configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContourConfig {
    pub enable_monitoring: bool,
    pub ingress_hosts: Vec<String>,
    pub service_type: String,
    pub node_affinity: Option<Affinity>,
    pub tolerations: Vec<Toleration>,
}

#[derive(Serialize)]
struct ValuesContext<'a> {
    #[serde(flatten)]
    config: &'a ContourConfig,
    external_dns_annotation: &'static str,
}

/// The contour component
#[derive(Debug, Default)]
pub struct Contour {
    config: Option<ContourConfig>,
}

impl Contour {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn boxed() -> Box<dyn Component> {
        Box::new(Self::new())
    }

    pub fn config(&self) -> Option<&ContourConfig> {
        self.config.as_ref()
    }
}

impl Component for Contour {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .field(FieldSpec::bool("enable_monitoring").default(false))
            .field(FieldSpec::string_list("ingress_hosts"))
            .field(
                FieldSpec::string("service_type")
                    .default("LoadBalancer")
                    .one_of(SERVICE_TYPES),
            )
            .block(BlockSpec::repeated("node_affinity", util::node_affinity_schema()))
            .block(BlockSpec::repeated("toleration", util::toleration_schema()))
    }

    fn load_config(&mut self, body: Option<&Body>, ctx: &EvalContext) -> Diagnostics {
        let (decoded, mut diags) = decode_optional(body, &self.schema(), ctx);
        diags.append(util::validate_node_affinity(decoded.blocks("node_affinity")));
        diags.append(util::validate_tolerations(decoded.blocks("toleration")));

        self.config = if diags.has_errors() {
            None
        } else {
            Some(ContourConfig {
                enable_monitoring: decoded.bool("enable_monitoring").unwrap_or_default(),
                ingress_hosts: decoded
                    .string_list("ingress_hosts")
                    .map(<[String]>::to_vec)
                    .unwrap_or_default(),
                service_type: decoded
                    .string("service_type")
                    .unwrap_or("LoadBalancer")
                    .to_string(),
                node_affinity: util::node_affinity(decoded.blocks("node_affinity")),
                tolerations: util::tolerations(decoded.blocks("toleration")),
            })
        };
        debug!(component = NAME, loaded = self.config.is_some(), "loaded configuration");
        diags
    }

    fn render_manifests(&self) -> Result<ManifestSet, RenderError> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| RenderError::not_loaded(NAME))?;

        let chart =
            assets::load_chart(NAME).map_err(|e| RenderError::phase(NAME, RenderPhase::LoadChart, e))?;

        let context = ValuesContext {
            config,
            external_dns_annotation: EXTERNAL_DNS_HOSTNAME,
        };
        let engine = Engine::default();
        let values = engine
            .render_values(CHART_VALUES_TMPL, &context, "contour/values.yaml.tmpl")
            .map_err(|e| RenderError::phase(NAME, RenderPhase::RenderValues, e))?;

        let release = ReleaseInfo::for_install(NAME, NAMESPACE);
        engine
            .render_chart(&chart, &release, &values)
            .map_err(|e| RenderError::phase(NAME, RenderPhase::RenderChart, e))
    }

    fn metadata(&self) -> Metadata {
        Metadata::new(NAME, NAMESPACE).with_namespace_label(NAMESPACE_NAME_LABEL, NAMESPACE)
    }
}
