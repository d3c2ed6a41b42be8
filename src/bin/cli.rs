//! jailwatch CLI
//!
//! One-shot queries against the fail2ban server socket.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use jailwatch::client::TIMESTAMP_FORMAT;
use jailwatch::{BanEntry, Config, Fail2BanClient, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// jailwatch CLI
#[derive(Parser, Debug)]
#[command(name = "jailwatch-cli")]
#[command(about = "Query a fail2ban server over its socket")]
struct Args {
    /// fail2ban socket path
    #[arg(short, long, default_value = jailwatch::config::DEFAULT_SOCKET_PATH)]
    socket: PathBuf,

    /// Read timeout in milliseconds (0 = none)
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the server version
    Version,

    /// Check that the server answers
    Ping,

    /// List jail names
    Jails,

    /// Show counters of one jail
    Status {
        /// Jail name
        jail: String,
    },

    /// List banned addresses of one jail
    Banned {
        /// Jail name
        jail: String,
    },

    /// Fetch everything once and print every jail
    Snapshot,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> jailwatch::Result<()> {
    let config = Config::builder()
        .socket_path(&args.socket)
        .read_timeout_ms(args.timeout_ms)
        .build();
    let client = Fail2BanClient::connect(&config)?;

    match args.command {
        Commands::Version => println!("{}", client.get_version()?),
        Commands::Ping => {
            client.ping()?;
            println!("pong");
        }
        Commands::Jails => {
            for name in client.get_jail_names()? {
                println!("{}", name);
            }
        }
        Commands::Status { jail } => {
            let info = client.get_jail_info(&jail)?;
            println!("Jail:             {}", jail);
            println!("Currently failed: {}", info.currently_failed);
            println!("Total failed:     {}", info.total_failed);
            println!("Currently banned: {}", info.currently_banned);
            println!("Total banned:     {}", info.total_banned);
        }
        Commands::Banned { jail } => {
            for entry in client.get_banned(&jail)? {
                print_entry(&entry);
            }
        }
        Commands::Snapshot => {
            let store = Store::new(Arc::new(client), Duration::ZERO, Duration::ZERO);
            store.refresh()?;
            for jail in store.get_jails() {
                println!(
                    "{} (failed {}/{}, banned {}/{})",
                    jail.name,
                    jail.currently_failed,
                    jail.total_failed,
                    jail.currently_banned,
                    jail.total_banned
                );
                for entry in &jail.banned_entries {
                    print!("  ");
                    print_entry(entry);
                }
            }
        }
    }

    Ok(())
}

fn print_entry(entry: &BanEntry) {
    println!(
        "{:<15}  {}  +{}s  until {}",
        entry.address,
        entry.banned_at.format(TIMESTAMP_FORMAT),
        entry.current_penalty,
        entry.ban_ends_at.format(TIMESTAMP_FORMAT)
    );
}
