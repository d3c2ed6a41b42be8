//! jailwatch daemon
//!
//! Connects to fail2ban, keeps the jail cache refreshed, and logs a summary
//! after every refresh.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use jailwatch::config::ConfigBuilder;
use jailwatch::bootstrap::{self, ShutdownSignals};
use jailwatch::{Config, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// jailwatch daemon
#[derive(Parser, Debug)]
#[command(name = "jailwatch")]
#[command(about = "Keeps a refreshed cache of fail2ban jail data")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// fail2ban socket path
    #[arg(short, long)]
    socket: Option<PathBuf>,

    /// Seconds between refreshes (10-600)
    #[arg(short, long)]
    refresh_seconds: Option<u64>,

    /// Continue with unsupported fail2ban versions
    #[arg(long)]
    skip_version_check: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(short, long, default_value = "info,jailwatch=debug")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .init();

    tracing::info!("jailwatch v{}", jailwatch::VERSION);

    let shutdown = match ShutdownSignals::block() {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!("Could not block shutdown signals: {}", e);
            std::process::exit(1);
        }
    };

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let (client, fail2ban_version) = match bootstrap::connect(&config) {
        Ok(connected) => connected,
        Err(e) => {
            tracing::error!("Could not start: {}", e);
            std::process::exit(1);
        }
    };

    let store = Store::from_config(Arc::new(client), &config);
    tracing::info!(
        "Refreshing fail2ban {} data every {:?}",
        fail2ban_version,
        store.refresh_interval()
    );

    store.register_update_handler(|store| {
        let jails = store.get_jails();
        let banned: usize = jails.iter().map(|jail| jail.banned_count).sum();
        tracing::info!("{} jails, {} banned addresses", jails.len(), banned);
        for jail in &jails {
            tracing::debug!(
                "Jail '{}': failed {}/{}, banned {}/{}",
                jail.name,
                jail.currently_failed,
                jail.total_failed,
                jail.currently_banned,
                jail.total_banned
            );
        }
    });

    let _refresh = match store.start() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("Could not start refresh loop: {}", e);
            std::process::exit(1);
        }
    };

    // A stopped refresh loop keeps the last snapshot readable until shutdown
    match shutdown.wait() {
        Ok(signal) => tracing::info!("Received {}, shutting down", signal),
        Err(e) => tracing::error!("Waiting for a shutdown signal failed: {}", e),
    }

    let status = store.status();
    tracing::debug!(
        "Final refresh state {:?}, last refresh {:?}, last error {}",
        status.state,
        status.last_refresh,
        status.last_error.as_deref().unwrap_or("none")
    );
}

fn build_config(args: &Args) -> jailwatch::Result<Config> {
    let base = match &args.config {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::default(),
    };

    let mut builder = ConfigBuilder::from_config(base);
    if let Some(socket) = &args.socket {
        builder = builder.socket_path(socket);
    }
    if let Some(seconds) = args.refresh_seconds {
        builder = builder.refresh_seconds(seconds);
    }
    if args.skip_version_check {
        builder = builder.skip_version_check(true);
    }

    Ok(builder.build())
}
