//! cluster-autoscaler
//!
//! Scales a Packet worker pool. Rendering needs the bootstrap user data of
//! an existing worker, which is looked up in the project's device inventory.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use loko_core::{
    Body, Component, DecodedBody, Diagnostic, Diagnostics, EvalContext, FieldSpec, ManifestSet,
    Metadata, ReleaseInfo, RenderError, RenderPhase, Schema, VariantSpec, decode_optional,
    format_duration,
};
use loko_engine::Engine;
use loko_infra::{DeviceInventory, InventoryError, PacketClient, find_worker_userdata};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::assets;

pub const NAME: &str = "cluster-autoscaler";

const DEFAULT_NAMESPACE: &str = "kube-system";

const CHART_VALUES_TMPL: &str = r#"cloudProvider: {{ provider | tojson }}
image:
  tag: v1.17.0
nodeSelector:
  node.kubernetes.io/controller: "true"
tolerations:
- effect: NoSchedule
  key: node-role.kubernetes.io/master
  operator: Exists
rbac:
  create: true
cloudConfigPath: /config

packetClusterName: {{ cluster_name | tojson }}
packetAuthToken: {{ packet.auth_token | tojson }}
packetCloudInit: {{ packet.user_data | tojson }}
packetProjectID: {{ packet.project_id | tojson }}
packetFacility: {{ packet.facility | tojson }}
packetOSChannel: {{ packet.worker_channel | tojson }}
packetNodeType: {{ packet.worker_type | tojson }}
autoscalingGroups:
- name: {{ worker_pool | tojson }}
  maxSize: {{ max_workers }}
  minSize: {{ min_workers }}

extraArgs:
  scale-down-unneeded-time: {{ scale_down_unneeded_time }}
  scale-down-delay-after-add: {{ scale_down_delay_after_add }}
  scale-down-unready-time: {{ scale_down_unready_time }}

podDisruptionBudget: []
kubeTargetVersionOverride: v1.17.2
{% if service_monitor %}

serviceMonitor:
  enabled: true
  namespace: {{ namespace | tojson }}
  selector:
    release: prometheus-operator
{% endif %}
"#;

/// Packet-specific settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketConfig {
    pub project_id: String,
    pub facility: String,
    pub worker_type: String,
    pub worker_channel: String,
}

/// Cloud the autoscaler talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    Packet(PacketConfig),
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Packet(_) => "packet",
        }
    }
}

/// Validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoscalerConfig {
    pub provider: Provider,
    pub worker_pool: String,
    pub cluster_name: String,
    pub namespace: String,
    pub min_workers: i64,
    pub max_workers: i64,
    pub scale_down_unneeded_time: Duration,
    pub scale_down_delay_after_add: Duration,
    pub scale_down_unready_time: Duration,
    pub service_monitor: bool,
}

impl AutoscalerConfig {
    /// Build from a body that decoded without errors
    fn from_decoded(decoded: &DecodedBody) -> Option<Self> {
        let provider = match decoded.variant()? {
            ("packet", packet) => Provider::Packet(PacketConfig {
                project_id: packet.string("project_id")?.to_string(),
                facility: packet.string("facility")?.to_string(),
                worker_type: packet.string("worker_type")?.to_string(),
                worker_channel: packet.string("worker_channel")?.to_string(),
            }),
            _ => return None,
        };

        Some(Self {
            provider,
            worker_pool: decoded.string("worker_pool")?.to_string(),
            cluster_name: decoded.string("cluster_name")?.to_string(),
            namespace: decoded.string("namespace")?.to_string(),
            min_workers: decoded.integer("min_workers")?,
            max_workers: decoded.integer("max_workers")?,
            scale_down_unneeded_time: decoded.duration("scale_down_unneeded_time")?,
            scale_down_delay_after_add: decoded.duration("scale_down_delay_after_add")?,
            scale_down_unready_time: decoded.duration("scale_down_unready_time")?,
            service_monitor: decoded.bool("service_monitor")?,
        })
    }
}

#[derive(Serialize)]
struct PacketValues {
    project_id: String,
    facility: String,
    worker_type: String,
    worker_channel: String,
    user_data: String,
    auth_token: String,
}

#[derive(Serialize)]
struct ValuesContext<'a> {
    provider: &'static str,
    cluster_name: &'a str,
    worker_pool: &'a str,
    namespace: &'a str,
    min_workers: i64,
    max_workers: i64,
    scale_down_unneeded_time: String,
    scale_down_delay_after_add: String,
    scale_down_unready_time: String,
    service_monitor: bool,
    packet: PacketValues,
}

/// The cluster-autoscaler component
pub struct ClusterAutoscaler {
    config: Option<AutoscalerConfig>,
    inventory: Option<Arc<dyn DeviceInventory>>,
    auth_token: Option<String>,
}

impl std::fmt::Debug for ClusterAutoscaler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterAutoscaler")
            .field("config", &self.config)
            .field("inventory", &self.inventory.as_ref().map(|_| "<injected>"))
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for ClusterAutoscaler {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterAutoscaler {
    /// Component using the Packet API configured from the environment
    pub fn new() -> Self {
        Self {
            config: None,
            inventory: None,
            auth_token: None,
        }
    }

    /// Component using the given inventory and API token
    pub fn with_inventory(inventory: Arc<dyn DeviceInventory>, auth_token: impl Into<String>) -> Self {
        Self {
            config: None,
            inventory: Some(inventory),
            auth_token: Some(auth_token.into()),
        }
    }

    pub(crate) fn boxed() -> Box<dyn Component> {
        Box::new(Self::new())
    }

    /// Loaded configuration, if the last load succeeded
    pub fn config(&self) -> Option<&AutoscalerConfig> {
        self.config.as_ref()
    }

    fn packet_values(
        &self,
        config: &AutoscalerConfig,
        packet: &PacketConfig,
    ) -> Result<PacketValues, InventoryError> {
        let (inventory, token): (Arc<dyn DeviceInventory>, String) = match &self.inventory {
            Some(inventory) => (
                Arc::clone(inventory),
                self.auth_token.clone().unwrap_or_default(),
            ),
            None => {
                let client = PacketClient::from_env()?;
                let token = client.auth_token().to_string();
                (Arc::new(client), token)
            }
        };

        let devices = inventory.list_devices(&packet.project_id)?;
        let user_data = find_worker_userdata(&config.cluster_name, &packet.facility, &devices)?;

        Ok(PacketValues {
            project_id: packet.project_id.clone(),
            facility: packet.facility.clone(),
            worker_type: packet.worker_type.clone(),
            worker_channel: packet.worker_channel.clone(),
            user_data,
            auth_token: STANDARD.encode(token.as_bytes()),
        })
    }
}

fn validate_worker_bounds(decoded: &DecodedBody) -> Diagnostics {
    let mut diags = Diagnostics::new();
    let min = decoded.integer("min_workers");
    let max = decoded.integer("max_workers");

    for (name, value) in [("min_workers", min), ("max_workers", max)] {
        if value.is_some_and(|v| v < 0) {
            diags.push(
                Diagnostic::error(
                    format!("'{}' must not be negative", name),
                    format!("'{}' is {} but must be 0 or more", name, value.unwrap_or_default()),
                )
                .with_subject(decoded.range().child(name)),
            );
        }
    }

    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            diags.push(
                Diagnostic::error(
                    "'min_workers' must not exceed 'max_workers'",
                    format!("'min_workers' is {} but 'max_workers' is {}", min, max),
                )
                .with_subject(decoded.range().child("min_workers")),
            );
        }
    }

    diags
}

impl Component for ClusterAutoscaler {
    fn name(&self) -> &'static str {
        NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .field(FieldSpec::string("provider").default("packet"))
            .field(FieldSpec::string("worker_pool").required())
            .field(FieldSpec::string("cluster_name").required())
            .field(FieldSpec::string("namespace").default(DEFAULT_NAMESPACE))
            .field(FieldSpec::integer("min_workers").default(1))
            .field(FieldSpec::integer("max_workers").default(4))
            .field(FieldSpec::duration("scale_down_unneeded_time").default("10m"))
            .field(FieldSpec::duration("scale_down_delay_after_add").default("10m"))
            .field(FieldSpec::duration("scale_down_unready_time").default("20m"))
            .field(FieldSpec::bool("service_monitor").default(false))
            .variants(
                VariantSpec::new("provider").variant(
                    "packet",
                    Schema::new()
                        .field(FieldSpec::string("project_id").required())
                        .field(FieldSpec::string("facility").required())
                        .field(FieldSpec::string("worker_type").default("baremetal_0"))
                        .field(FieldSpec::string("worker_channel").default("stable")),
                ),
            )
    }

    fn load_config(&mut self, body: Option<&Body>, ctx: &EvalContext) -> Diagnostics {
        let (decoded, mut diags) = decode_optional(body, &self.schema(), ctx);
        diags.append(validate_worker_bounds(&decoded));

        self.config = if diags.has_errors() {
            None
        } else {
            AutoscalerConfig::from_decoded(&decoded)
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

        let packet = match &config.provider {
            Provider::Packet(packet) => self
                .packet_values(config, packet)
                .map_err(|e| RenderError::phase(NAME, RenderPhase::DeriveValues, e))?,
        };

        let context = ValuesContext {
            provider: config.provider.name(),
            cluster_name: &config.cluster_name,
            worker_pool: &config.worker_pool,
            namespace: &config.namespace,
            min_workers: config.min_workers,
            max_workers: config.max_workers,
            scale_down_unneeded_time: format_duration(config.scale_down_unneeded_time),
            scale_down_delay_after_add: format_duration(config.scale_down_delay_after_add),
            scale_down_unready_time: format_duration(config.scale_down_unready_time),
            service_monitor: config.service_monitor,
            packet,
        };

        let engine = Engine::default();
        let values = engine
            .render_values(CHART_VALUES_TMPL, &context, "cluster-autoscaler/values.yaml.tmpl")
            .map_err(|e| RenderError::phase(NAME, RenderPhase::RenderValues, e))?;

        let release = ReleaseInfo::for_install(NAME, &config.namespace);
        engine
            .render_chart(&chart, &release, &values)
            .map_err(|e| RenderError::phase(NAME, RenderPhase::RenderChart, e))
    }

    fn metadata(&self) -> Metadata {
        let namespace = self
            .config
            .as_ref()
            .map_or(DEFAULT_NAMESPACE, |c| c.namespace.as_str());
        Metadata::new(NAME, namespace)
    }
}
