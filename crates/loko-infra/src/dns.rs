//! DNS entry verification
//!
//! With manual DNS the operator must create the records the provisioning
//! phase asks for. The loop prints the expected entries, waits for the
//! operator, and checks live DNS until the entries match or the operator
//! skips:
//!
//! ```text
//! Prompting --(empty line)--> Checking --(match)----> Confirmed
//!     ^  |                       |
//!     |  +--("skip")--> Skipped  |
//!     +------(mismatch)----------+
//! ```
//!
//! Any other input re-prompts. There is no timeout.

use console::{Term, style};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::net::{IpAddr, ToSocketAddrs};
use std::str::FromStr;
use tracing::debug;

use crate::error::DnsError;
use crate::outputs::OutputSource;

/// Output key holding the required entries
pub const DNS_ENTRIES_OUTPUT: &str = "dns_entries";

const SEPARATOR: &str = "------------------------------------------------------------------------";
const PROMPT: &str = "Press Enter to check the entries or type \"skip\" to continue the installation: ";
const MISMATCH: &str = "Entries are not correctly configured, please verify.";

/// Where the cluster's DNS zone is hosted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsProvider {
    Manual,
    Route53,
    Cloudflare,
}

impl DnsProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            DnsProvider::Manual => "manual",
            DnsProvider::Route53 => "route53",
            DnsProvider::Cloudflare => "cloudflare",
        }
    }

    /// Only manual zones need the operator to create records
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, DnsProvider::Manual)
    }
}

impl FromStr for DnsProvider {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(DnsProvider::Manual),
            "route53" => Ok(DnsProvider::Route53),
            "cloudflare" => Ok(DnsProvider::Cloudflare),
            other => Err(DnsError::InvalidProvider(other.to_string())),
        }
    }
}

impl fmt::Display for DnsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record the operator has to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsEntry {
    pub name: String,
    pub ttl: u32,
    #[serde(rename = "type")]
    pub record_type: String,
    pub records: Vec<String>,
}

/// Read the required entries from the infrastructure outputs
pub fn read_dns_entries(outputs: &dyn OutputSource) -> Result<Vec<DnsEntry>, DnsError> {
    let value = outputs.output(DNS_ENTRIES_OUTPUT)?;
    serde_json::from_value(value).map_err(DnsError::Parse)
}

/// Name resolution capability
pub trait Resolver {
    fn lookup(&self, name: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the system's `getaddrinfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
    fn lookup(&self, name: &str) -> io::Result<Vec<IpAddr>> {
        let mut ips: Vec<IpAddr> = (name, 0).to_socket_addrs()?.map(|a| a.ip()).collect();
        ips.sort();
        ips.dedup();
        Ok(ips)
    }
}

/// Operator input capability
pub trait Prompter {
    /// Show `prompt` and read one line, `None` once input is closed
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Prompts on the terminal and reads standard input
#[derive(Debug, Clone)]
pub struct TermPrompter {
    term: Term,
}

impl Default for TermPrompter {
    fn default() -> Self {
        Self {
            term: Term::stdout(),
        }
    }
}

impl Prompter for TermPrompter {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.term.write_str(&style(prompt).bold().to_string())?;
        self.term.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// What the operator asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorInput {
    Check,
    Skip,
    Other,
}

impl OperatorInput {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => OperatorInput::Check,
            "skip" => OperatorInput::Skip,
            _ => OperatorInput::Other,
        }
    }
}

/// States of the verification loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    Prompting,
    Checking,
    Confirmed,
    Skipped,
}

impl VerificationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, VerificationState::Confirmed | VerificationState::Skipped)
    }

    /// Transition on operator input, only taken while prompting
    pub fn on_input(self, input: OperatorInput) -> Self {
        match (self, input) {
            (VerificationState::Prompting, OperatorInput::Check) => VerificationState::Checking,
            (VerificationState::Prompting, OperatorInput::Skip) => VerificationState::Skipped,
            (state, _) => state,
        }
    }

    /// Transition on the outcome of a check
    pub fn on_check(self, matched: bool) -> Self {
        match self {
            VerificationState::Checking if matched => VerificationState::Confirmed,
            VerificationState::Checking => VerificationState::Prompting,
            state => state,
        }
    }
}

/// Whether every entry resolves to exactly its expected records
///
/// Order does not matter. A failed lookup counts as a mismatch.
pub fn check_entries(entries: &[DnsEntry], resolver: &dyn Resolver) -> bool {
    entries.iter().all(|entry| {
        let resolved = match resolver.lookup(&entry.name) {
            Ok(ips) => ips,
            Err(err) => {
                debug!(name = %entry.name, error = %err, "lookup failed");
                return false;
            }
        };

        let mut actual: Vec<String> = resolved.iter().map(IpAddr::to_string).collect();
        let mut expected = entry.records.clone();
        actual.sort();
        expected.sort();

        if actual != expected {
            debug!(name = %entry.name, ?expected, ?actual, "records do not match");
            return false;
        }
        true
    })
}

/// Write the entries in the block format shown to the operator
pub fn print_entries(entries: &[DnsEntry], out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{}", SEPARATOR)?;
    for entry in entries {
        writeln!(out, "Name: {}", entry.name)?;
        writeln!(out, "Type: {}", entry.record_type)?;
        writeln!(out, "Ttl: {}", entry.ttl)?;
        writeln!(out, "Records:")?;
        for record in &entry.records {
            writeln!(out, "- {}", record)?;
        }
        writeln!(out, "{}", SEPARATOR)?;
    }
    Ok(())
}

/// Ask the operator to configure `entries` in `zone` and wait until they match
///
/// Returns [`VerificationState::Confirmed`] or [`VerificationState::Skipped`].
pub fn verify(
    entries: &[DnsEntry],
    zone: &str,
    resolver: &dyn Resolver,
    prompter: &mut dyn Prompter,
    out: &mut dyn Write,
) -> Result<VerificationState, DnsError> {
    writeln!(
        out,
        "Please configure the following DNS entries at the DNS provider which hosts {:?}:",
        zone
    )?;
    print_entries(entries, out)?;

    let mut state = VerificationState::Prompting;
    while !state.is_terminal() {
        state = match state {
            VerificationState::Prompting => {
                let line = prompter.read_line(PROMPT)?.ok_or(DnsError::InputClosed)?;
                state.on_input(OperatorInput::parse(&line))
            }
            VerificationState::Checking => {
                let matched = check_entries(entries, resolver);
                if !matched {
                    writeln!(out, "{}", MISMATCH)?;
                }
                state.on_check(matched)
            }
            terminal => terminal,
        };
        debug!(?state, "dns verification");
    }

    Ok(state)
}

/// Read `dns_entries` from the outputs and run [`verify`]
pub fn ask_to_configure(
    outputs: &dyn OutputSource,
    zone: &str,
    resolver: &dyn Resolver,
    prompter: &mut dyn Prompter,
    out: &mut dyn Write,
) -> Result<VerificationState, DnsError> {
    let entries = read_dns_entries(outputs)?;
    verify(&entries, zone, resolver, prompter, out)
}
