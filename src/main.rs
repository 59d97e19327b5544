use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod command;
mod commands;
mod config;
mod discovery;
mod env;
mod error;
mod executor;
mod log;
mod report;
mod topology;

use command::{BuildOptions, DescriptorTable, Operation};

#[derive(Parser)]
#[command(name = "pxf")]
#[command(about = "Manage PXF across the hosts of a Greenplum cluster", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Perform <command> on each host in the cluster
    Cluster {
        #[command(subcommand)]
        action: ClusterAction,
    },
}

#[derive(Subcommand)]
enum ClusterAction {
    /// Initialize the PXF server instances on master, standby master, and the segment hosts
    Init,

    /// Start the PXF server instances on master, standby master, and the segment hosts
    Start,

    /// Stop the PXF server instances on master, standby master, and the segment hosts
    Stop,

    /// Restart the PXF server instances on master, standby master, and the segment hosts
    Restart,

    /// Get status of PXF servers on master, standby master, and the segment hosts
    Status,

    /// Sync PXF configs from master to standby master and the segment hosts
    Sync {
        /// Delete files on the targets that no longer exist on the master
        #[arg(long)]
        delete: bool,
    },

    /// Install the PXF extension on master, standby master, and the segment hosts
    Register,

    /// Prepare a new PXF_RUN directory on master, standby master, and the segment hosts
    Prepare,

    /// Migrate PXF_CONF configuration into PXF_RUN on master, standby master, and the segment hosts
    Migrate,

    /// Reset PXF (undo initialization) on master, standby master, and the segment hosts
    Reset,
}

impl ClusterAction {
    fn into_parts(self) -> (Operation, BuildOptions) {
        let operation = match self {
            ClusterAction::Init => Operation::Init,
            ClusterAction::Start => Operation::Start,
            ClusterAction::Stop => Operation::Stop,
            ClusterAction::Restart => Operation::Restart,
            ClusterAction::Status => Operation::Status,
            ClusterAction::Sync { delete } => {
                return (
                    Operation::Sync,
                    BuildOptions {
                        delete_on_sync: delete,
                    },
                )
            }
            ClusterAction::Register => Operation::Register,
            ClusterAction::Prepare => Operation::Prepare,
            ClusterAction::Migrate => Operation::Migrate,
            ClusterAction::Reset => Operation::Reset,
        };
        (operation, BuildOptions::default())
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config() -> Result<config::ClusterConfig> {
    let dir = std::env::var("PXF_CLUSTER_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    config::ClusterConfig::load(&dir)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config()?;

    match cli.command {
        Commands::Cluster { action } => {
            let (operation, options) = action.into_parts();
            let table = DescriptorTable::new();
            let process_env = env::ProcessEnv;
            let topology = discovery::from_environment(&process_env, &config.psql);
            let executor = executor::SshExecutor::new(&config);
            let mut console = log::ConsoleLog;

            let mut session = commands::cluster::Session {
                env: &process_env,
                topology: topology.as_ref(),
                executor: &executor,
                log: &mut console,
            };
            let stdin = io::stdin();
            let result = commands::cluster::run(
                &table,
                operation,
                options,
                &mut session,
                &mut stdin.lock(),
                &mut io::stdout(),
            );
            // Already reported through the console log.
            if let Err(e) = result {
                if let error::ClusterError::PartialFleetFailure { failed, total, .. } = e {
                    tracing::debug!(failed, total, "cluster run finished with failures");
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
