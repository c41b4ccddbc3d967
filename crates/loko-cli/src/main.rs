//! lokoctl - render and validate Lokomotive cluster components

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;

use error::Result;

#[derive(Parser)]
#[command(name = "lokoctl")]
#[command(version)]
#[command(about = "Render and validate Lokomotive cluster components", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage cluster components
    #[command(subcommand)]
    Component(ComponentCommands),

    /// DNS entries of the cluster
    #[command(subcommand)]
    Dns(DnsCommands),
}

#[derive(Subcommand)]
enum ComponentCommands {
    /// List the available components
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate component configuration
    Validate {
        #[command(flatten)]
        config: ConfigArgs,

        /// Components to validate (default: every configured component)
        components: Vec<String>,

        /// Output diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render component manifests
    Render {
        #[command(flatten)]
        config: ConfigArgs,

        /// Components to render (default: every configured component)
        components: Vec<String>,

        /// Output directory (if not set, outputs to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum DnsCommands {
    /// Ask for the cluster DNS entries and wait until they resolve
    Verify {
        /// DNS provider hosting the zone
        #[arg(long, default_value = "manual")]
        provider: String,

        /// DNS zone of the cluster
        #[arg(long)]
        zone: String,

        /// Saved `terraform output -json` file to read entries from
        #[arg(long)]
        outputs_file: Option<PathBuf>,

        /// Terraform working directory
        #[arg(long, default_value = ".")]
        assets_dir: PathBuf,

        /// Terraform executable
        #[arg(long, default_value = "terraform")]
        terraform: String,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// Cluster configuration file
    #[arg(short, long, env = "LOKO_CONFIG", default_value = "cluster.yaml")]
    config: PathBuf,

    /// Override configuration variables (key=value)
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("LOKO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Component(command) => match command {
            ComponentCommands::List { json } => commands::list::run(json),

            ComponentCommands::Validate {
                config,
                components,
                json,
            } => commands::validate::run(&config.config, &config.vars, &components, json),

            ComponentCommands::Render {
                config,
                components,
                output,
            } => commands::render::run(
                &config.config,
                &config.vars,
                &components,
                output.as_deref(),
            ),
        },

        Commands::Dns(DnsCommands::Verify {
            provider,
            zone,
            outputs_file,
            assets_dir,
            terraform,
        }) => commands::dns::run(
            &provider,
            &zone,
            outputs_file.as_deref(),
            &assets_dir,
            &terraform,
        ),
    }
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
