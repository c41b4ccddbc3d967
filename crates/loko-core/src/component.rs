//! The uniform component contract

use miette::Diagnostic as MietteDiagnostic;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::ast::Body;
use crate::diagnostic::Diagnostics;
use crate::eval::EvalContext;
use crate::manifest::ManifestSet;
use crate::schema::Schema;

/// A pluggable, independently configurable cluster add-on
///
/// Loading is the only step that mutates a component. Rendering reads the
/// loaded configuration and may consult external collaborators, so two
/// renders against the same external state return the same manifests.
pub trait Component: Send {
    /// Registered name of the component
    fn name(&self) -> &'static str;

    /// Description of the accepted configuration
    fn schema(&self) -> Schema;

    /// Decode and validate configuration
    ///
    /// `body` is `None` when the component was declared without a
    /// configuration block. Never performs network calls.
    fn load_config(&mut self, body: Option<&Body>, ctx: &EvalContext) -> Diagnostics;

    /// Render the manifests of a successfully loaded component
    fn render_manifests(&self) -> Result<ManifestSet, RenderError>;

    /// Derived deployment metadata
    fn metadata(&self) -> Metadata;
}

/// Deployment metadata of a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub name: String,
    pub namespace: String,
    pub namespace_labels: BTreeMap<String, String>,
    /// Set when the manifests should be installed as a chart release
    pub helm: Option<HelmMetadata>,
}

impl Metadata {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            namespace_labels: BTreeMap::new(),
            helm: None,
        }
    }

    pub fn with_namespace_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.namespace_labels.insert(key.into(), value.into());
        self
    }

    pub fn with_helm(mut self, helm: HelmMetadata) -> Self {
        self.helm = Some(helm);
        self
    }
}

/// Packaging hints for the apply step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HelmMetadata {
    /// Wait for all resources to become ready after install
    pub wait: bool,
}

/// Rendering step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    LoadChart,
    DeriveValues,
    RenderValues,
    RenderChart,
    ReadAssets,
}

impl fmt::Display for RenderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RenderPhase::LoadChart => "load chart",
            RenderPhase::DeriveValues => "derive values",
            RenderPhase::RenderValues => "render values template",
            RenderPhase::RenderChart => "render chart",
            RenderPhase::ReadAssets => "read assets",
        };
        f.write_str(s)
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Rendering failure, never accompanied by partial output
#[derive(Error, Debug, MietteDiagnostic)]
pub enum RenderError {
    #[error("component '{component}' has no valid configuration loaded")]
    #[diagnostic(
        code(loko::render::not_loaded),
        help("Configuration must load without errors before manifests can be rendered")
    )]
    NotLoaded { component: String },

    #[error("component '{component}': failed to {phase}: {source}")]
    #[diagnostic(code(loko::render::failed))]
    Phase {
        component: String,
        phase: RenderPhase,
        #[source]
        source: BoxError,
    },
}

impl RenderError {
    pub fn not_loaded(component: &str) -> Self {
        Self::NotLoaded {
            component: component.to_string(),
        }
    }

    /// Wrap a failure with the component name and the phase it happened in
    pub fn phase(component: &str, phase: RenderPhase, source: impl Into<BoxError>) -> Self {
        Self::Phase {
            component: component.to_string(),
            phase,
            source: source.into(),
        }
    }

    pub fn component(&self) -> &str {
        match self {
            RenderError::NotLoaded { component } | RenderError::Phase { component, .. } => {
                component
            }
        }
    }
}
