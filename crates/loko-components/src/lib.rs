//! Loko Components - built-in cluster add-ons
//!
//! Every component implements [`loko_core::Component`]. The built-in
//! registry is created on first use, registering components in the order
//! of [`BUILTIN`].

pub mod assets;
pub mod cluster_autoscaler;
pub mod contour;
pub mod flatcar_linux_update_operator;
pub mod util;

use loko_core::{Constructor, Registry, RegistryError};
use once_cell::sync::Lazy;

pub use cluster_autoscaler::ClusterAutoscaler;
pub use contour::Contour;
pub use flatcar_linux_update_operator::FlatcarLinuxUpdateOperator;

/// Built-in components in registration order
pub const BUILTIN: &[(&str, Constructor)] = &[
    (cluster_autoscaler::NAME, ClusterAutoscaler::boxed),
    (contour::NAME, Contour::boxed),
    (
        flatcar_linux_update_operator::NAME,
        FlatcarLinuxUpdateOperator::boxed,
    ),
];

static REGISTRY: Lazy<Result<Registry, RegistryError>> = Lazy::new(new_registry);

/// Build a fresh registry holding the built-in components
pub fn new_registry() -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    for &(name, constructor) in BUILTIN {
        registry.register(name, constructor)?;
    }
    Ok(registry)
}

/// The process-wide registry of built-in components
pub fn registry() -> Result<&'static Registry, &'static RegistryError> {
    REGISTRY.as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names() {
        let registry = registry().unwrap();
        assert_eq!(
            registry.names(),
            vec!["cluster-autoscaler", "contour", "flatcar-linux-update-operator"]
        );
    }

    #[test]
    fn test_lookup_returns_fresh_instances() {
        let registry = registry().unwrap();
        let component = registry.lookup("contour").unwrap();
        assert_eq!(component.name(), "contour");

        for (name, _) in BUILTIN {
            assert_eq!(registry.lookup(name).unwrap().name(), *name);
        }
    }

    #[test]
    fn test_unknown_component_suggestion() {
        let err = registry().unwrap().lookup("contuor").err().unwrap();
        assert_eq!(
            err,
            RegistryError::NotFound {
                name: "contuor".to_string(),
                suggestion: Some("Did you mean 'contour'?".to_string()),
            }
        );
    }

    #[test]
    fn test_duplicate_builtin_registration() {
        let mut registry = new_registry().unwrap();
        let err = registry
            .register(contour::NAME, Contour::boxed)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate { .. }));
    }
}
