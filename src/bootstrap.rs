//! Startup helpers
//!
//! Connects to the server and checks its version against the versions this
//! crate understands, and waits for the process to be told to stop.

use nix::sys::signal::{SigSet, Signal};

use crate::client::Fail2BanClient;
use crate::config::Config;
use crate::error::{JailwatchError, Result};

/// fail2ban releases whose response shapes are known
pub const SUPPORTED_VERSIONS: &[&str] = &["0.11.1", "0.11.2", "1.0.1", "1.0.2", "1.1.0"];

pub fn is_supported_version(version: &str) -> bool {
    SUPPORTED_VERSIONS.contains(&version)
}

/// Accept `version` if supported, or if the check is skipped
pub fn check_version(version: &str, skip_check: bool) -> Result<()> {
    match (is_supported_version(version), skip_check) {
        (true, false) => Ok(()),
        (true, true) => {
            tracing::debug!("Skipping version check but version {} is supported", version);
            Ok(())
        }
        (false, true) => {
            tracing::info!(
                "Skipping version check for fail2ban {} (results may be incomplete)",
                version
            );
            Ok(())
        }
        (false, false) => {
            tracing::error!("fail2ban version {} not supported", version);
            Err(JailwatchError::UnsupportedVersion(version.to_string()))
        }
    }
}

/// Connect, fetch the version and check it.
///
/// Returns the client together with the detected version.
pub fn connect(config: &Config) -> Result<(Fail2BanClient, String)> {
    tracing::info!(
        "Will use socket at {} for fail2ban connection",
        config.socket_path.display()
    );
    let client = Fail2BanClient::connect(config)?;

    let version = client.get_version()?;
    tracing::info!("fail2ban version found: {}", version);
    check_version(&version, config.skip_version_check)?;

    Ok((client, version))
}

/// Signals that end the daemon
pub const SHUTDOWN_SIGNALS: &[Signal] = &[Signal::SIGINT, Signal::SIGTERM];

/// A set of signals blocked on the calling thread, to be waited on
///
/// Block before spawning threads: new threads inherit the mask, which
/// leaves the blocked signals pending for [`ShutdownSignals::wait`].
pub struct ShutdownSignals {
    set: SigSet,
}

impl ShutdownSignals {
    /// Block SIGINT and SIGTERM
    pub fn block() -> Result<Self> {
        Self::block_only(SHUTDOWN_SIGNALS)
    }

    pub fn block_only(signals: &[Signal]) -> Result<Self> {
        let mut set = SigSet::empty();
        for signal in signals {
            set.add(*signal);
        }
        set.thread_block().map_err(JailwatchError::Signal)?;
        Ok(Self { set })
    }

    /// Block until one of the signals arrives and return it
    pub fn wait(&self) -> Result<Signal> {
        let signal = self.set.wait().map_err(JailwatchError::Signal)?;
        tracing::debug!("Received signal {}", signal);
        Ok(signal)
    }
}
