//! Error types for external collaborators

use miette::Diagnostic;
use thiserror::Error;

/// Errors from the machine inventory and worker selection
#[derive(Error, Debug, Diagnostic)]
pub enum InventoryError {
    #[error(
        "having two devices with the same name ({hostname:?}) in the same facility is not supported"
    )]
    #[diagnostic(
        code(loko::inventory::duplicate),
        help("Rename or remove one of the devices in facility '{facility}'")
    )]
    DuplicateHostname { hostname: String, facility: String },

    #[error("cluster {cluster:?} must have at least one worker node but no worker was found")]
    #[diagnostic(
        code(loko::inventory::not_found),
        help("Worker hostnames must contain both the cluster name and 'worker'")
    )]
    WorkerNotFound { cluster: String },

    #[error("environment variable {var} is not set")]
    #[diagnostic(code(loko::inventory::credentials))]
    MissingToken { var: &'static str },

    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("listing devices in project {project_id:?}: HTTP {status}: {body}")]
    #[diagnostic(code(loko::inventory::http))]
    Status {
        project_id: String,
        status: u16,
        body: String,
    },

    #[error("listing devices in project {project_id:?}: {source}")]
    #[diagnostic(code(loko::inventory::http))]
    Http {
        project_id: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Errors reading infrastructure outputs
#[derive(Error, Debug, Diagnostic)]
pub enum OutputError {
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}: {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("output '{key}' not found")]
    #[diagnostic(help("Run the infrastructure phase before reading its outputs"))]
    Missing { key: String },

    #[error("output '{key}' is not valid JSON: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors of the DNS verification loop
#[derive(Error, Debug, Diagnostic)]
pub enum DnsError {
    #[error("invalid DNS provider {0:?}")]
    #[diagnostic(help("Supported providers: manual, route53, cloudflare"))]
    InvalidProvider(String),

    #[error("failed to get DNS entries: {0}")]
    Outputs(#[from] OutputError),

    #[error("failed to parse DNS entries file: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("operator input closed before the DNS entries were confirmed")]
    #[diagnostic(help("Type \"skip\" to continue without checking the entries"))]
    InputClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
