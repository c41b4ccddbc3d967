//! DNS verify command - wait until the cluster DNS entries resolve

use console::style;
use loko_infra::{
    DnsProvider, FileOutputs, OutputSource, SystemResolver, TermPrompter, TerraformOutputs,
    VerificationState, ask_to_configure,
};
use std::io;
use std::path::Path;

use crate::error::Result;

pub fn run(
    provider: &str,
    zone: &str,
    outputs_file: Option<&Path>,
    assets_dir: &Path,
    terraform: &str,
) -> Result<()> {
    let provider: DnsProvider = provider.parse()?;
    if !provider.requires_confirmation() {
        println!(
            "{} DNS entries for {} are managed by {}",
            style("✓").green(),
            zone,
            provider
        );
        return Ok(());
    }

    let outputs: Box<dyn OutputSource> = match outputs_file {
        Some(path) => Box::new(FileOutputs::new(path)),
        None => Box::new(TerraformOutputs::new(assets_dir).with_binary(terraform)),
    };

    let mut prompter = TermPrompter::default();
    let state = ask_to_configure(
        outputs.as_ref(),
        zone,
        &SystemResolver,
        &mut prompter,
        &mut io::stdout(),
    )?;

    match state {
        VerificationState::Confirmed => {
            println!("{} DNS entries are configured", style("✓").green())
        }
        VerificationState::Skipped => println!(
            "{} Skipped checking the DNS entries",
            style("⚠").yellow()
        ),
        VerificationState::Prompting | VerificationState::Checking => {}
    }
    Ok(())
}
