//! CLI error types with exit code handling

use loko_core::{CoreError, RegistryError, RenderError};
use loko_infra::DnsError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Configuration decoding or validation failed
    #[error("Validation failed: {message}")]
    #[diagnostic(code(loko::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A component failed to render
    #[error("Render failed: {message}")]
    #[diagnostic(code(loko::cli::render))]
    Render {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Unknown component '{name}'")]
    #[diagnostic(code(loko::cli::unknown_component))]
    UnknownComponent {
        name: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(loko::cli::io))]
    Io { message: String },

    #[error("{message}")]
    #[diagnostic(code(loko::cli::error))]
    Other {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Render { .. } => exit_codes::RENDER_ERROR,
            CliError::UnknownComponent { .. } => exit_codes::UNKNOWN_COMPONENT,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    /// Create a validation error with help text
    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConfigNotFound { .. } | CoreError::Io(_) => CliError::Io {
                message: err.to_string(),
            },
            _ => CliError::validation(err.to_string()),
        }
    }
}

impl From<RegistryError> for CliError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { name, suggestion } => CliError::UnknownComponent {
                name,
                help: suggestion,
            },
            RegistryError::Duplicate { .. } => CliError::other(err.to_string()),
        }
    }
}

impl From<RenderError> for CliError {
    fn from(err: RenderError) -> Self {
        let help = match &err {
            RenderError::NotLoaded { .. } => {
                Some("Load the component configuration before rendering".to_string())
            }
            _ => None,
        };
        CliError::Render {
            message: err.to_string(),
            help,
        }
    }
}

impl From<DnsError> for CliError {
    fn from(err: DnsError) -> Self {
        match err {
            DnsError::InvalidProvider(_) => CliError::validation_with_help(
                err.to_string(),
                "Supported providers: manual, route53, cloudflare",
            ),
            DnsError::Io(_) => CliError::Io {
                message: err.to_string(),
            },
            DnsError::InputClosed => CliError::Other {
                message: err.to_string(),
                help: Some("Type \"skip\" to continue without checking the entries".to_string()),
            },
            _ => CliError::other(err.to_string()),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::validation("x").exit_code(), 2);
        assert_eq!(CliError::other("x").exit_code(), 1);
        assert_eq!(
            CliError::from(std::io::Error::other("disk")).exit_code(),
            exit_codes::IO_ERROR
        );
    }

    #[test]
    fn test_registry_not_found_maps_to_unknown_component() {
        let err = CliError::from(RegistryError::NotFound {
            name: "contuor".to_string(),
            suggestion: Some("Did you mean 'contour'?".to_string()),
        });

        assert_eq!(err.exit_code(), exit_codes::UNKNOWN_COMPONENT);
        assert_eq!(err.to_string(), "Unknown component 'contuor'");
    }

    #[test]
    fn test_missing_config_is_io() {
        let err = CliError::from(CoreError::ConfigNotFound {
            path: "cluster.yaml".to_string(),
        });
        assert_eq!(err.exit_code(), exit_codes::IO_ERROR);
    }

    #[test]
    fn test_render_error_maps_to_render_code() {
        let err = CliError::from(RenderError::not_loaded("contour"));
        assert_eq!(err.exit_code(), exit_codes::RENDER_ERROR);
    }
}
