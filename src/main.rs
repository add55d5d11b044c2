use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use leaseline::{Config, LeaseServer, Result, client};

#[derive(Parser)]
#[command(name = "leaseline")]
#[command(author, version, about = "A datagram lease-allocation server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the lease server.
    Run,
    /// Print the active configuration.
    ShowConfig,
    /// Query a running server for its lease table.
    ListLeases {
        #[arg(short, long, default_value = "127.0.0.1")]
        server: IpAddr,
    },
    /// Acquire a lease through the full handshake.
    Acquire {
        #[arg(short, long, default_value = "127.0.0.1")]
        server: IpAddr,

        /// Hardware address to present to the server.
        #[arg(short, long)]
        mac: String,
    },
    /// Hog addresses under fabricated hardware addresses.
    Flood {
        #[arg(short, long, default_value = "127.0.0.1")]
        server: IpAddr,

        /// Number of DISCOVER messages to send.
        #[arg(short, long)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = Config::load_or_create(&cli.config)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            info!("starting lease server with config: {:?}", cli.config);
            let server = LeaseServer::new(config).await?;

            tokio::select! {
                result = server.run() => result,
                _ = tokio::signal::ctrl_c() => {
                    info!("received shutdown signal, stopping server...");
                    Ok(())
                }
            }
        }
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::ListLeases { server } => {
            let leases = client::query_leases(SocketAddr::new(server, config.port)).await?;

            if leases.is_empty() {
                println!("No leases.");
            } else {
                println!(
                    "{:<6} {:<20} {:<16} {:<24} {:<6}",
                    "Num", "MAC Address", "IP Address", "Expires At", "Ack"
                );
                println!("{}", "-".repeat(76));

                for lease in leases {
                    let expires = chrono::DateTime::from_timestamp(lease.expires_at, 0)
                        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                        .unwrap_or_else(|| lease.expires_at.to_string());

                    println!(
                        "{:<6} {:<20} {:<16} {:<24} {:<6}",
                        lease.sequence,
                        lease.mac_address,
                        lease.ip_address,
                        expires,
                        lease.acknowledged
                    );
                }
            }

            Ok(())
        }
        Commands::Acquire { server, mac } => {
            let (ip, timestamp) = client::acquire(SocketAddr::new(server, config.port), &mac).await?;

            let remaining = timestamp - chrono::Utc::now().timestamp();
            println!("Your IP address is {ip}");
            println!("This address will expire in {} seconds", remaining.max(0));
            Ok(())
        }
        Commands::Flood { server, count } => {
            let hogged = client::flood(SocketAddr::new(server, config.port), count).await?;
            println!("Hogged {hogged} of {count} requested addresses.");
            Ok(())
        }
    }
}
