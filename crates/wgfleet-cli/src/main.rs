//! wgfleet CLI - manage VPN peers and two-region DNS failover

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

use wgfleet_cli::config::ConfigManager;
use wgfleet_cli::service::{Fleet, Secrets};
use wgfleet_proto::{FleetError, Region};

/// Manage WireGuard peers across two regional gateways with DNS failover
#[derive(Parser, Debug)]
#[command(name = "wgfleet")]
#[command(about = "Peer lifecycle and regional failover for a two-gateway VPN fleet", long_about = None)]
#[command(version = env!("GIT_TAG"))]
#[command(long_version = concat!(env!("GIT_TAG"), "\nCommit: ", env!("GIT_HASH"), "\nBuilt: ", env!("BUILD_TIME")))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the fleet config file (defaults to ~/.wgfleet/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gateway management password
    #[arg(long, global = true, env = "WGFLEET_GATEWAY_PASSWORD", hide_env_values = true)]
    gateway_password: Option<String>,

    /// DNS provider API token
    #[arg(long, global = true, env = "WGFLEET_DNS_TOKEN", hide_env_values = true)]
    dns_token: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new peer and print its id
    CreatePeer {
        /// Pin the peer to one region instead of following failover
        #[arg(long)]
        region: Option<Region>,
    },
    /// Print a peer's client configuration
    ExportPeer {
        /// Peer id
        id: String,
    },
    /// Revoke a peer and drop its gateway sessions
    RevokePeer {
        /// Peer id
        id: String,
    },
    /// Probe and persist the path MTU for a peer
    TuneMtu {
        /// Peer id
        id: String,
    },
    /// Force the DNS record onto a region
    ForceFailover {
        /// Target region (west or east)
        region: Region,
    },
    /// Show fleet state
    Status,
    /// Run the health prober and failover controller
    Run,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    std::process::exit(match execute(cli).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            e.exit_code()
        }
    });
}

async fn execute(cli: Cli) -> Result<(), FleetError> {
    let config = ConfigManager::load(cli.config.clone())
        .map_err(|e| FleetError::Persist(format!("{:#}", e)))?;
    let state_dir = ConfigManager::state_dir()
        .map_err(|e| FleetError::Persist(format!("{:#}", e)))?;

    let secrets = Secrets {
        gateway_password: cli.gateway_password.clone().unwrap_or_default(),
        dns_token: cli.dns_token.clone().unwrap_or_default(),
    };
    let fleet = Fleet::new(config, secrets, &state_dir)?;

    match cli.command {
        Commands::CreatePeer { region } => {
            let record = fleet.create_peer(region).await?;
            println!("{}", record.id);
            println!("  public key: {}", record.public_key);
            println!("  allowed ip: {}", record.allowed_ip);
            println!("  region:     {}", record.region);
        }
        Commands::ExportPeer { id } => {
            let config = fleet.export_peer(&id)?;
            print!("{}", config.contents);
        }
        Commands::RevokePeer { id } => {
            let record = fleet.revoke_peer(&id).await?;
            println!("revoked {}", record.id);
        }
        Commands::TuneMtu { id } => {
            let result = fleet.tune_mtu(&id).await?;
            if result.converged {
                println!("mtu {} (converged)", result.mtu);
            } else {
                println!("mtu {} (probe budget exhausted)", result.mtu);
            }
        }
        Commands::ForceFailover { region } => {
            let decision = fleet.force_failover(region).await?;
            println!("active region: {}", decision.active);
        }
        Commands::Status => {
            let status = fleet.status();
            println!("active region:  {}", status.active_region);
            println!(
                "registry:       {} active, {} revoked{}",
                status.active_peers,
                status.revoked_peers,
                if status.registry_corrupted {
                    " (CORRUPTED, mutations disabled)"
                } else {
                    ""
                }
            );
            for health in &status.region_health {
                println!(
                    "{:<5} {:?}  failures={} successes={}",
                    health.region.to_string(),
                    health.class,
                    health.consecutive_failures,
                    health.consecutive_successes
                );
            }
            match &status.last_decision {
                Some(decision) => println!(
                    "last decision:  {} at {} ({:?})",
                    decision.active, decision.decided_at, decision.reason
                ),
                None => println!("last decision:  none"),
            }
        }
        Commands::Run => fleet.run().await?,
    }

    Ok(())
}
