//! RelayVote Node Binary

use anyhow::Context;
use clap::{Parser, Subcommand};
use relayvote_core::{Address, NodeConfig};
use relayvote_crypto::keys::{KeyFile, KeyPair};
use relayvote_node::NodeBuilder;
use relayvote_voting::GenesisState;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "relayvote-node")]
#[command(about = "RelayVote Node - threshold voting for relayed observations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the node
    Run {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Genesis file path
        #[arg(short, long)]
        genesis: Option<PathBuf>,

        /// API listen address, overrides the config file
        #[arg(long)]
        api_addr: Option<String>,

        /// Data directory, overrides the config file
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Keep state on disk under the data directory
        #[arg(long)]
        persistent: bool,
    },

    /// Generate a new keypair
    Keygen {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a genesis file
    Genesis {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Admin address (hex), repeatable
        #[arg(long = "admin", required = true)]
        admins: Vec<String>,

        /// Denom of the initial relayer set
        #[arg(long)]
        denom: Option<String>,

        /// Relayer address (hex) for `--denom`, repeatable
        #[arg(long = "relayer")]
        relayers: Vec<String>,

        /// Votes needed to approve a `--denom` proposal
        #[arg(long, default_value = "1")]
        threshold: u32,

        /// Proposal life in heights
        #[arg(long)]
        proposal_life: Option<u64>,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn parse_addresses(values: &[String]) -> anyhow::Result<Vec<Address>> {
    values
        .iter()
        .map(|s| Address::from_hex(s).with_context(|| format!("invalid address {}", s)))
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            genesis,
            api_addr,
            data_dir,
            persistent,
        } => {
            let mut node_config = match config {
                Some(path) => NodeConfig::load(&path)?,
                None => NodeConfig::default(),
            };
            init_logging(&node_config.log_level);
            info!("Starting RelayVote Node...");

            let genesis_state = match genesis {
                Some(path) => {
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    GenesisState::from_json(&content)?
                }
                None => GenesisState::default(),
            };

            if let Some(addr) = api_addr {
                node_config.api.listen_addr = addr;
            }
            if let Some(dir) = data_dir {
                node_config.data_dir = dir;
            }
            if persistent {
                node_config.engine.persistent = true;
            }

            let node = NodeBuilder::new()
                .config(node_config)
                .genesis(genesis_state)
                .build()?;

            node.start().await?;
        }

        Commands::Keygen { output } => {
            let keypair = KeyPair::generate();
            let key_file = KeyFile::from(&keypair);

            match output {
                Some(path) => {
                    key_file.save(&path)?;
                    println!("Address: {}", keypair.address());
                    println!("Keypair saved to: {}", path.display());
                }
                None => {
                    println!("{}", serde_json::to_string_pretty(&key_file)?);
                }
            }
        }

        Commands::Genesis {
            output,
            admins,
            denom,
            relayers,
            threshold,
            proposal_life,
        } => {
            let mut genesis = GenesisState {
                proposal_life,
                admins: parse_addresses(&admins)?,
                ..Default::default()
            };
            if let Some(denom) = denom {
                genesis = genesis.with_relayers(&denom, parse_addresses(&relayers)?, threshold);
            }
            genesis.validate()?;

            std::fs::write(&output, genesis.to_json()?)?;

            println!("Genesis saved to: {}", output.display());
        }
    }

    Ok(())
}
