//! Loko Infra - collaborators outside the rendering pipeline
//!
//! - [`packet`]: Packet device inventory and worker selection
//! - [`outputs`]: provisioning outputs (`terraform output -json`)
//! - [`dns`]: operator-driven DNS entry verification
//! - [`mock`]: in-memory stand-ins for all of the above

pub mod dns;
pub mod error;
pub mod mock;
pub mod outputs;
pub mod packet;

pub use dns::{
    DnsEntry, DnsProvider, OperatorInput, Prompter, Resolver, SystemResolver, TermPrompter,
    VerificationState, ask_to_configure, check_entries, read_dns_entries, verify,
};
pub use error::{DnsError, InventoryError, OutputError};
pub use outputs::{FileOutputs, OutputSource, TerraformOutputs};
pub use packet::{Device, DeviceInventory, Facility, PacketClient, find_worker_userdata};
