//! In-memory collaborators for testing
//!
//! These stand in for the Packet API, the provisioning outputs, name
//! resolution and the operator, so pipelines can be exercised without a
//! network or a terminal.

use serde_json::Value as JsonValue;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::dns::{Prompter, Resolver};
use crate::error::{InventoryError, OutputError};
use crate::outputs::OutputSource;
use crate::packet::{Device, DeviceInventory};

/// Inventory returning a fixed device list for every project
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    devices: Vec<Device>,
    /// Track list calls for assertions
    calls: Arc<AtomicUsize>,
}

impl StaticInventory {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `list_devices` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DeviceInventory for StaticInventory {
    fn list_devices(&self, _project_id: &str) -> Result<Vec<Device>, InventoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.devices.clone())
    }
}

/// Outputs held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticOutputs {
    values: BTreeMap<String, JsonValue>,
}

impl StaticOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: JsonValue) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }
}

impl OutputSource for StaticOutputs {
    fn output(&self, key: &str) -> Result<JsonValue, OutputError> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| OutputError::Missing {
                key: key.to_string(),
            })
    }
}

/// Resolver with scripted answers
///
/// Each name answers in the order answers were added; the last answer
/// repeats. Unknown names fail like an NXDOMAIN.
#[derive(Debug, Default)]
pub struct FixedResolver {
    answers: RefCell<HashMap<String, VecDeque<Vec<IpAddr>>>>,
    lookups: Cell<usize>,
}

impl FixedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for `name`; unparsable addresses are ignored
    pub fn answer(self, name: &str, ips: &[&str]) -> Self {
        let ips = ips.iter().filter_map(|ip| ip.parse().ok()).collect();
        self.answers
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .push_back(ips);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.get()
    }
}

impl Resolver for FixedResolver {
    fn lookup(&self, name: &str) -> io::Result<Vec<IpAddr>> {
        self.lookups.set(self.lookups.get() + 1);

        let mut answers = self.answers.borrow_mut();
        let queue = answers
            .get_mut(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no such host {name}")))?;

        let answer = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        Ok(answer.unwrap_or_default())
    }
}

/// Operator replaying fixed lines, closing input when they run out
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    lines: VecDeque<String>,
    prompts: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            prompts: Vec::new(),
        }
    }

    /// Prompts shown so far
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

impl Prompter for ScriptedPrompter {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.lines.pop_front())
    }
}
