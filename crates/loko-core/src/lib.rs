//! Loko Core - Component contract and configuration pipeline
//!
//! This crate provides the foundational types used throughout Loko:
//! - `Body`: The configuration AST a component is loaded from
//! - `Schema`: Explicit description of a component's configuration
//! - `decode`: The generic routine turning a `Body` into typed values
//! - `Diagnostics`: Accumulated, user-facing decode and validation feedback
//! - `Component`: The uniform contract every add-on implements
//! - `Registry`: Name to constructor mapping, built once at startup
//! - `ManifestSet`: Deterministic rendering output

pub mod ast;
pub mod component;
pub mod config;
pub mod context;
pub mod decode;
pub mod diagnostic;
pub mod duration;
pub mod error;
pub mod eval;
pub mod manifest;
pub mod registry;
pub mod schema;
pub mod suggest;
pub mod values;

pub use ast::{Attribute, Block, Body, Expression, SourceRef};
pub use component::{Component, HelmMetadata, Metadata, RenderError, RenderPhase};
pub use config::ClusterConfig;
pub use context::{ChartInfo, ReleaseInfo, TemplateContext};
pub use decode::{DecodedBody, FieldValue, decode, decode_optional};
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use duration::{DurationError, format_duration, parse_duration};
pub use error::{CoreError, Result};
pub use eval::{EvalContext, EvalError};
pub use manifest::ManifestSet;
pub use registry::{Constructor, Registry, RegistryError};
pub use schema::{BlockSpec, FieldKind, FieldSpec, Schema, VariantSpec};
pub use values::{Values, parse_set_values};
