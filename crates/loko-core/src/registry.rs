//! Component registry
//!
//! Components are registered during sequential start-up and looked up by
//! name afterwards. Each lookup returns a fresh instance, so no state is
//! shared between callers.

use miette::Diagnostic;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use crate::component::Component;
use crate::suggest::closest_match;

/// Creates a fresh, unconfigured component
pub type Constructor = fn() -> Box<dyn Component>;

#[derive(Error, Debug, Diagnostic, PartialEq, Eq)]
pub enum RegistryError {
    #[error("component '{name}' is already registered")]
    #[diagnostic(code(loko::registry::duplicate))]
    Duplicate { name: String },

    #[error("unknown component '{name}'")]
    #[diagnostic(code(loko::registry::not_found))]
    NotFound {
        name: String,
        #[help]
        suggestion: Option<String>,
    },
}

#[derive(Default)]
pub struct Registry {
    constructors: BTreeMap<&'static str, Constructor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under `name`
    ///
    /// Registering the same name twice is an error; the first registration stays.
    pub fn register(&mut self, name: &'static str, constructor: Constructor) -> Result<(), RegistryError> {
        if self.constructors.contains_key(name) {
            return Err(RegistryError::Duplicate {
                name: name.to_string(),
            });
        }
        debug!(component = name, "registered component");
        self.constructors.insert(name, constructor);
        Ok(())
    }

    /// Create a fresh instance of the named component
    pub fn lookup(&self, name: &str) -> Result<Box<dyn Component>, RegistryError> {
        match self.constructors.get(name) {
            Some(constructor) => Ok(constructor()),
            None => Err(RegistryError::NotFound {
                name: name.to_string(),
                suggestion: closest_match(name, self.constructors.keys().copied())
                    .map(|s| format!("Did you mean '{}'?", s)),
            }),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        self.constructors.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("components", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Body;
    use crate::component::{Metadata, RenderError};
    use crate::diagnostic::Diagnostics;
    use crate::eval::EvalContext;
    use crate::manifest::ManifestSet;
    use crate::schema::Schema;

    struct Noop;

    impl Component for Noop {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn schema(&self) -> Schema {
            Schema::new()
        }

        fn load_config(&mut self, _body: Option<&Body>, _ctx: &EvalContext) -> Diagnostics {
            Diagnostics::new()
        }

        fn render_manifests(&self) -> Result<ManifestSet, RenderError> {
            Ok(ManifestSet::new())
        }

        fn metadata(&self) -> Metadata {
            Metadata::new("noop", "default")
        }
    }

    fn noop() -> Box<dyn Component> {
        Box::new(Noop)
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        registry.register("noop", noop).unwrap();

        let component = registry.lookup("noop").unwrap();
        assert_eq!(component.name(), "noop");
        assert!(registry.contains("noop"));
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let mut registry = Registry::new();
        registry.register("noop", noop).unwrap();

        let err = registry.register("noop", noop).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate {
                name: "noop".to_string()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_component() {
        let mut registry = Registry::new();
        registry.register("noop", noop).unwrap();

        let err = registry.lookup("nop").err().unwrap();
        assert_eq!(
            err,
            RegistryError::NotFound {
                name: "nop".to_string(),
                suggestion: Some("Did you mean 'noop'?".to_string()),
            }
        );
        assert_eq!(err.to_string(), "unknown component 'nop'");

        let err = registry.lookup("something-else").err().unwrap();
        assert!(matches!(err, RegistryError::NotFound { suggestion: None, .. }));
    }

    #[test]
    fn test_names_are_sorted() {
        let mut registry = Registry::new();
        registry.register("zeta", noop).unwrap();
        registry.register("alpha", noop).unwrap();

        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }
}
