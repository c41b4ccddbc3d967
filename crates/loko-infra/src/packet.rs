//! Packet device inventory
//!
//! Components that run on Packet derive part of their configuration from
//! the machines of a project. [`DeviceInventory`] is the seam: the HTTP
//! client talks to the Packet API, tests use [`crate::mock::StaticInventory`].

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::InventoryError;

/// Default Packet API endpoint
pub const DEFAULT_API_URL: &str = "https://api.packet.net/";

/// Environment variable holding the API token
pub const AUTH_TOKEN_ENV: &str = "PACKET_AUTH_TOKEN";

/// Environment variable overriding the API endpoint
pub const API_URL_ENV: &str = "PACKET_API_URL";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Facility a device lives in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    pub code: String,
}

/// A machine record as returned by the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub hostname: String,
    pub facility: Facility,
    #[serde(default, rename = "userdata")]
    pub user_data: String,
}

impl Device {
    pub fn new(hostname: &str, facility: &str, user_data: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            facility: Facility {
                code: facility.to_string(),
            },
            user_data: user_data.to_string(),
        }
    }
}

/// Source of machine records for a project
pub trait DeviceInventory: Send + Sync {
    /// List every device of a project
    fn list_devices(&self, project_id: &str) -> Result<Vec<Device>, InventoryError>;
}

#[derive(Deserialize)]
struct DevicesPage {
    #[serde(default)]
    devices: Vec<Device>,
    #[serde(default)]
    meta: Option<PageMeta>,
}

#[derive(Deserialize)]
struct PageMeta {
    #[serde(default)]
    next: Option<PageLink>,
}

#[derive(Deserialize)]
struct PageLink {
    href: String,
}

/// Blocking Packet API client
pub struct PacketClient {
    client: Client,
    api_url: Url,
    auth_token: String,
}

impl std::fmt::Debug for PacketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketClient")
            .field("api_url", &self.api_url.as_str())
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

impl PacketClient {
    /// Create a client for an API endpoint
    pub fn new(api_url: &str, auth_token: impl Into<String>) -> Result<Self, InventoryError> {
        let mut api_url = Url::parse(api_url)?;
        // Relative joins must append to the base path
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| InventoryError::Http {
                project_id: String::new(),
                source,
            })?;

        Ok(Self {
            client,
            api_url,
            auth_token: auth_token.into(),
        })
    }

    /// Create a client from `PACKET_AUTH_TOKEN` and optionally `PACKET_API_URL`
    pub fn from_env() -> Result<Self, InventoryError> {
        let token = std::env::var(AUTH_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or(InventoryError::MissingToken {
                var: AUTH_TOKEN_ENV,
            })?;
        let api_url = std::env::var(API_URL_ENV)
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Self::new(&api_url, token)
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    fn fetch_page(&self, url: &Url, project_id: &str) -> Result<DevicesPage, InventoryError> {
        let http_err = |source| InventoryError::Http {
            project_id: project_id.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .header("X-Auth-Token", &self.auth_token)
            .header("Accept", "application/json")
            .send()
            .map_err(http_err)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(InventoryError::Status {
                project_id: project_id.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json::<DevicesPage>().map_err(http_err)
    }
}

impl DeviceInventory for PacketClient {
    fn list_devices(&self, project_id: &str) -> Result<Vec<Device>, InventoryError> {
        let mut url = self.api_url.join(&format!("projects/{}/devices", project_id))?;
        let mut visited = HashSet::new();
        let mut devices = Vec::new();

        loop {
            visited.insert(url.to_string());
            let page = self.fetch_page(&url, project_id)?;
            devices.extend(page.devices);

            let next = page.meta.and_then(|m| m.next).map(|link| link.href);
            match next {
                Some(href) => {
                    let next_url = self.api_url.join(&href)?;
                    if visited.contains(next_url.as_str()) {
                        break;
                    }
                    url = next_url;
                }
                None => break,
            }
        }

        debug!(project_id, devices = devices.len(), "listed devices");
        Ok(devices)
    }
}

/// Find the bootstrap user data of a cluster's worker nodes
///
/// Devices outside `facility` are ignored. A hostname appearing twice in
/// the facility is an error even after a worker has been selected. The
/// first device whose hostname contains both the cluster name and `worker`
/// wins, and its user data is returned base64 encoded.
pub fn find_worker_userdata(
    cluster_name: &str,
    facility: &str,
    devices: &[Device],
) -> Result<String, InventoryError> {
    let mut seen = HashSet::new();
    let mut selected: Option<&Device> = None;

    for device in devices.iter().filter(|d| d.facility.code == facility) {
        if !seen.insert(device.hostname.as_str()) {
            return Err(InventoryError::DuplicateHostname {
                hostname: device.hostname.clone(),
                facility: facility.to_string(),
            });
        }

        if selected.is_none()
            && device.hostname.contains(cluster_name)
            && device.hostname.contains("worker")
        {
            selected = Some(device);
        }
    }

    let device = selected.ok_or_else(|| InventoryError::WorkerNotFound {
        cluster: cluster_name.to_string(),
    })?;

    debug!(hostname = %device.hostname, facility, "selected worker user data");
    Ok(STANDARD.encode(device.user_data.as_bytes()))
}
