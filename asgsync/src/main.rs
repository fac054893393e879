mod commands;
mod console;
mod formatting;
mod net;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use asgsync_core::monitor::DEFAULT_FAILURE_MARKER;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use commands::{JoinArgs, PruneArgs};

const DEFAULT_CONFIG: &str = "/opt/autoscale/autoscaler.toml";

#[derive(Parser)]
#[command(name = "asgsync")]
#[command(about = "Set up and manage autoscale groups and their load balancer membership")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(short, long, action)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the scaling group or bring it in line with the config file.
    Apply {
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config_file: PathBuf,
        /// Fail rather than prompt for missing config variables.
        #[arg(long, action)]
        no_create_config: bool,
        /// Apply differences without asking.
        #[arg(short, long, action)]
        yes: bool,
    },
    /// Drain and delete load balancer nodes that left the scaling group.
    PruneNodes {
        #[arg(long)]
        group: String,
        #[arg(long = "load-balancer", required = true)]
        load_balancers: Vec<u64>,
        /// TOML file with a [rackspace_cloud] or [cloud] section; quote the values.
        #[arg(long)]
        credentials: PathBuf,
        #[arg(long)]
        region: Option<String>,
        /// Addresses that are never removed, even outside the group.
        #[arg(long)]
        whitelist: Vec<String>,
        /// Also remove nodes that are still ONLINE.
        #[arg(long, action)]
        delete_online: bool,
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Health-check this server and add it to load balancers.
    JoinLb {
        #[arg(long = "load-balancer", required = true)]
        load_balancers: Vec<u64>,
        /// TOML file with a [rackspace_cloud] or [cloud] section; quote the values.
        #[arg(long)]
        credentials: PathBuf,
        #[arg(long)]
        region: Option<String>,
        #[arg(long, conflicts_with = "interface", required_unless_present = "interface")]
        address: Option<String>,
        #[arg(long)]
        interface: Option<String>,
        #[arg(long)]
        host_header: Option<String>,
        /// Scheme for the HTTP check, overriding the monitor type.
        #[arg(long)]
        protocol: Option<String>,
    },
    /// Write the external autoscaler's JSON config.
    ExportConfig {
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config_file: PathBuf,
        #[arg(long, default_value = "rax-autoscaler-config.json")]
        output: PathBuf,
    },
    /// Print the bootstrap failure metric for the monitoring agent.
    FailMetric {
        #[arg(long, default_value = DEFAULT_FAILURE_MARKER)]
        marker: PathBuf,
    },
}

fn init_logging(level: Level, log_file: Option<&Path>) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_max_level(level);
    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(std::io::stdout.and(Mutex::new(file)))
                .init();
        }
        None => builder.init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let log_file = match &cli.command {
        Commands::PruneNodes { log_file, .. } => log_file.as_deref(),
        _ => None,
    };
    init_logging(log_level, log_file)?;

    match cli.command {
        Commands::Apply {
            config_file,
            no_create_config,
            yes,
        } => commands::cmd_apply(config_file, no_create_config, yes).await?,
        Commands::PruneNodes {
            group,
            load_balancers,
            credentials,
            region,
            whitelist,
            delete_online,
            log_file: _,
        } => {
            commands::cmd_prune(PruneArgs {
                group,
                load_balancers,
                credentials,
                region,
                whitelist,
                delete_online,
            })
            .await?
        }
        Commands::JoinLb {
            load_balancers,
            credentials,
            region,
            address,
            interface,
            host_header,
            protocol,
        } => {
            commands::cmd_join(JoinArgs {
                load_balancers,
                credentials,
                region,
                address,
                interface,
                host_header,
                protocol,
            })
            .await?
        }
        Commands::ExportConfig {
            config_file,
            output,
        } => commands::cmd_export(config_file, output)?,
        Commands::FailMetric { marker } => commands::cmd_fail_metric(marker),
    }

    Ok(())
}
