//! Loko Engine - MiniJinja chart rendering for components
//!
//! Components render in two steps: their typed configuration goes through
//! a values template, and the resulting values are merged over a chart's
//! defaults and rendered into manifests.

pub mod chart;
pub mod engine;
pub mod error;
pub mod filters;

pub use chart::{Chart, ChartMetadata};
pub use engine::Engine;
pub use error::{EngineError, Result, TemplateError, TemplateErrorKind};
