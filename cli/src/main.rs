//! RelayVote CLI - Command Line Interface

use clap::{Parser, Subcommand};
use colored::Colorize;
use relayvote_cli::{
    describe_action, parse_amount, resolve_principal, truncate, ApiClient, EventInfo,
    ProposalInfo,
};
use relayvote_core::{Action, Address};
use relayvote_crypto::keys::{KeyFile, KeyPair};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "relayvote")]
#[command(about = "RelayVote - threshold voting CLI for relayers and admins")]
#[command(version)]
struct Cli {
    /// Node URL
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new keypair
    Keygen {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Submit (or vote for) a proposal
    SubmitProposal {
        /// Submitting principal: hex address or key file
        #[arg(short, long)]
        from: String,

        /// Asset key selecting relayer set and threshold
        #[arg(short, long)]
        denom: String,

        #[command(subcommand)]
        action: ActionArgs,
    },

    /// Set the proposal life (admin)
    SetProposalLife {
        #[arg(short, long)]
        from: String,

        /// Life in heights
        value: u64,
    },

    /// Add a relayer for a denom (admin)
    AddRelayer {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        denom: String,

        /// Relayer address (hex)
        address: String,
    },

    /// Remove a relayer from a denom (admin)
    RemoveRelayer {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        denom: String,

        /// Relayer address (hex)
        address: String,
    },

    /// Set the approval threshold of a denom (admin)
    SetThreshold {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        denom: String,

        value: u32,
    },

    /// Show a proposal
    Proposal {
        /// Proposal ID (hex)
        id: String,
    },

    /// List all proposals
    Proposals,

    /// Show relayers and threshold of a denom
    Relayers { denom: String },

    /// Show a bridged balance
    Balance { denom: String, address: String },

    /// Node status
    Status,
}

#[derive(Subcommand)]
enum ActionArgs {
    /// Funds deposited on the source chain
    Deposit {
        #[arg(long)]
        recipient: String,

        #[arg(long)]
        amount: String,

        /// Transaction hash on the source chain
        #[arg(long)]
        source_tx: String,
    },

    /// New era of the source chain
    ChainEra {
        #[arg(long)]
        era: u32,
    },

    /// Exchange rate scaled by 10^18
    ExchangeRate {
        #[arg(long)]
        rate: String,
    },
}

impl ActionArgs {
    fn into_action(self) -> anyhow::Result<Action> {
        Ok(match self {
            ActionArgs::Deposit {
                recipient,
                amount,
                source_tx,
            } => Action::Deposit {
                recipient: Address::from_hex(&recipient)
                    .map_err(|e| anyhow::anyhow!("invalid recipient {}: {}", recipient, e))?,
                amount: parse_amount(&amount)?,
                source_tx,
            },
            ActionArgs::ChainEra { era } => Action::SetChainEra { era },
            ActionArgs::ExchangeRate { rate } => Action::SetExchangeRate {
                rate: parse_amount(&rate)?,
            },
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let api_client = ApiClient::new(&cli.node)?;

    match cli.command {
        Commands::Keygen { output } => {
            let keypair = KeyPair::generate();
            let key_file = KeyFile::from(&keypair);

            match output {
                Some(path) => {
                    key_file.save(&path)?;
                    println!("{} Key saved to {}", "✔".green(), path.display());
                    println!("Address: {}", key_file.address);
                }
                None => println!("{}", serde_json::to_string_pretty(&key_file)?),
            }
        }

        Commands::SubmitProposal {
            from,
            denom,
            action,
        } => {
            let proposer = resolve_principal(&from)?;
            let action = action.into_action()?;

            let result = api_client.submit_proposal(&proposer, &denom, action).await?;
            println!("Proposal: {}", result.proposal_id);
            println!("Status:   {}", colored_status(&result.status));
            println!("Height:   {}", result.height);
            print_events(&result.events);
        }

        Commands::SetProposalLife { from, value } => {
            let admin = resolve_principal(&from)?;
            let life = api_client.set_proposal_life(&admin, value).await?;
            println!(
                "{} Proposal life set to {} (version {})",
                "✔".green(),
                life.value,
                life.version
            );
        }

        Commands::AddRelayer {
            from,
            denom,
            address,
        } => {
            let admin = resolve_principal(&from)?;
            let relayer = resolve_principal(&address)?;
            api_client
                .update_relayer(&admin, &denom, &relayer, false)
                .await?;
            println!("{} Relayer {} added for {}", "✔".green(), relayer, denom);
        }

        Commands::RemoveRelayer {
            from,
            denom,
            address,
        } => {
            let admin = resolve_principal(&from)?;
            let relayer = resolve_principal(&address)?;
            api_client
                .update_relayer(&admin, &denom, &relayer, true)
                .await?;
            println!("{} Relayer {} removed from {}", "✔".green(), relayer, denom);
        }

        Commands::SetThreshold { from, denom, value } => {
            let admin = resolve_principal(&from)?;
            api_client.set_threshold(&admin, &denom, value).await?;
            println!("{} Threshold for {} set to {}", "✔".green(), denom, value);
        }

        Commands::Proposal { id } => {
            let proposal = api_client.proposal(&id).await?;
            print_proposal(&proposal);
        }

        Commands::Proposals => {
            let proposals = api_client.proposals().await?;
            if proposals.is_empty() {
                println!("No proposals found.");
            } else {
                println!("{:<20} {:<10} {:<14} {:<9} {}", "ID", "Denom", "Route", "Votes", "Status");
                println!("{:-<20} {:-<10} {:-<14} {:-<9} {:-<10}", "", "", "", "", "");
                for p in proposals {
                    println!(
                        "{:<20} {:<10} {:<14} {:<9} {}",
                        truncate(&p.id, 16),
                        p.denom,
                        p.route,
                        p.voters.len(),
                        display_status(&p)
                    );
                }
            }
        }

        Commands::Relayers { denom } => {
            let set = api_client.relayers(&denom).await?;
            match set.threshold {
                Some(t) => println!("Denom: {} (threshold {})", set.denom, t),
                None => println!("Denom: {} (no threshold)", set.denom),
            }
            for relayer in set.relayers {
                println!("  {}", relayer);
            }
        }

        Commands::Balance { denom, address } => {
            let address = resolve_principal(&address)?;
            let info = api_client.balance(&denom, &address).await?;
            println!("Address: {}", info.address);
            println!("Balance: {} {}", info.balance, info.denom);
        }

        Commands::Status => {
            let status = api_client.status().await?;
            let life = api_client.proposal_life().await?;
            println!("RelayVote Node Status");
            println!("=====================");
            println!("Name:          {}", status.name);
            println!("Height:        {}", status.height);
            println!("State Version: {}", status.state_version);
            println!("State Root:    {}", truncate(&status.state_root, 16));
            println!("Proposal Life: {} (version {})", life.value, life.version);
            println!("Persistent:    {}", if status.persistent { "Yes" } else { "No" });
            println!("Uptime:        {}s", status.uptime_secs);
        }
    }

    Ok(())
}

fn colored_status(status: &str) -> String {
    match status {
        "approved" => status.green().to_string(),
        "expired" => status.red().to_string(),
        _ => status.yellow().to_string(),
    }
}

fn display_status(proposal: &ProposalInfo) -> String {
    if proposal.expired && proposal.status == "active" {
        "expired (pending)".red().to_string()
    } else {
        colored_status(&proposal.status)
    }
}

fn print_proposal(p: &ProposalInfo) {
    println!("Proposal:   {}", p.id);
    println!("Denom:      {}", p.denom);
    println!("Route:      {}", p.route);
    println!("Action:     {}", describe_action(&p.action));
    println!("Status:     {}", display_status(p));
    println!("Created at: {}", p.created_at);
    println!("Life:       {} (votes accepted through {})", p.life, p.expire_height);
    println!("Voters:     {}", p.voters.len());
    for voter in &p.voters {
        println!("  {}", voter);
    }
}

fn print_events(events: &[EventInfo]) {
    for event in events {
        let attrs: Vec<String> = event
            .attributes
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        println!("  {} {}", event.kind.cyan(), attrs.join(" "));
    }
}
