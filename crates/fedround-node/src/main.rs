//! The fedround binary: run one participant of the round protocol.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use fedround_node::{ByteModel, Coordinator, NodeConfig, Worker};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Role {
    Coordinator,
    Worker,
}

#[derive(Debug, Parser)]
#[command(name = "fedround", about = "Round-structured model exchange node")]
struct Cli {
    /// Which state machine to run.
    #[arg(long, value_enum)]
    role: Role,

    /// Participant id. Defaults to "0" for the coordinator role.
    #[arg(long)]
    id: Option<String>,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listener bind address, host:port.
    #[arg(long)]
    bind: Option<String>,

    /// Coordinator rendezvous address, host:port.
    #[arg(long)]
    coordinator: Option<String>,

    /// Worker count the coordinator waits for.
    #[arg(long)]
    workers: Option<usize>,

    /// Number of broadcast/collect rounds.
    #[arg(long)]
    rounds: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };
    if let Some(id) = cli.id {
        config.id = id;
    }
    if let Some(bind) = cli.bind {
        config.transport.bind_address = bind;
    }
    if let Some(coordinator) = cli.coordinator {
        config.coordinator_address = coordinator;
    }
    if let Some(workers) = cli.workers {
        config.worker_count = workers;
    }
    if let Some(rounds) = cli.rounds {
        config.round_budget = rounds;
    }

    // The demo payload; a real deployment plugs its own ModelState in.
    let model = ByteModel::seeded(vec![0u8; 1024]);

    match cli.role {
        Role::Coordinator => {
            let summary = Coordinator::new(config, model).run().await?;
            tracing::info!(
                workers = summary.workers,
                rounds = summary.rounds_completed,
                "coordinator finished"
            );
        }
        Role::Worker => {
            let summary = Worker::new(config, model).run().await?;
            tracing::info!(rounds_served = summary.rounds_served, "worker finished");
        }
    }
    Ok(())
}
