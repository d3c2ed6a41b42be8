//! fail2ban socket client
//!
//! Issues the fixed command vocabulary and projects each response into its
//! typed result.

use std::io::{Read, Write};
use std::path::Path;

use parking_lot::Mutex;

use super::parse;
use super::{BanEntry, JailInfo, JailSource};
use crate::config::Config;
use crate::error::Result;
use crate::network::{send_command, Connection};
use crate::protocol::{Command, WireValue};

/// Client for the fail2ban server socket
///
/// ## Concurrency
/// A request and its response form one exchange on a shared socket. The
/// stream sits behind a mutex held across write and read, so concurrent
/// callers are serialized instead of interleaving on the wire.
#[derive(Debug)]
pub struct Fail2BanClient<S = Connection> {
    stream: Mutex<S>,
}

impl Fail2BanClient<Connection> {
    /// Connect using the socket path and timeouts from `config`
    pub fn connect(config: &Config) -> Result<Self> {
        let connection = Connection::connect(&config.socket_path)?;
        connection.set_timeouts(config.read_timeout(), config.write_timeout())?;
        Ok(Self::from_stream(connection))
    }

    /// Connect to `path` without timeouts
    pub fn connect_path(path: &Path) -> Result<Self> {
        Ok(Self::from_stream(Connection::connect(path)?))
    }
}

impl<S: Read + Write> Fail2BanClient<S> {
    /// Wrap an already connected stream
    pub fn from_stream(stream: S) -> Self {
        Self {
            stream: Mutex::new(stream),
        }
    }

    /// Server version, e.g. `"1.1.0"`
    pub fn get_version(&self) -> Result<String> {
        tracing::trace!("Fetching fail2ban version");
        let response = self.execute(&Command::Version)?;
        let version = parse::parse_version(&response)?;
        tracing::debug!("fail2ban version: {}", version);
        Ok(version)
    }

    /// Health check; succeeds when the server answers with a reply tuple
    pub fn ping(&self) -> Result<()> {
        let response = self.execute(&Command::Ping)?;
        response.expect_tuple("ping reply")?;
        Ok(())
    }

    /// Names of all jails, in server order
    pub fn get_jail_names(&self) -> Result<Vec<String>> {
        tracing::trace!("Fetching jail names");
        let response = self.execute(&Command::Status)?;
        let names = parse::parse_jail_names(&response)?;
        tracing::debug!("Retrieved {} jails: {:?}", names.len(), names);
        Ok(names)
    }

    /// Filter and action counters of one jail
    pub fn get_jail_info(&self, jail: &str) -> Result<JailInfo> {
        tracing::trace!("Fetching info for jail '{}'", jail);
        let response = self.execute(&Command::JailStatus {
            jail: jail.to_string(),
        })?;
        let info = parse::parse_jail_info(&response)?;
        tracing::debug!(
            "Jail '{}': failed={}/{}, banned={}/{}",
            jail,
            info.currently_failed,
            info.total_failed,
            info.currently_banned,
            info.total_banned
        );
        Ok(info)
    }

    /// Currently banned addresses of one jail
    pub fn get_banned(&self, jail: &str) -> Result<Vec<BanEntry>> {
        tracing::trace!("Fetching banned addresses for jail '{}'", jail);
        let response = self.execute(&Command::BannedWithTime {
            jail: jail.to_string(),
        })?;
        let entries = parse::parse_banned(&response, jail)?;
        tracing::debug!("Retrieved {} banned addresses for jail '{}'", entries.len(), jail);
        Ok(entries)
    }

    /// Run one exchange while holding the stream
    fn execute(&self, command: &Command) -> Result<WireValue> {
        let tokens = command.tokens();
        tracing::trace!("Sending command {:?}", tokens);

        let mut stream = self.stream.lock();
        let response = send_command(&mut *stream, &tokens).map_err(|e| {
            tracing::error!("Command {:?} failed: {}", tokens, e);
            e
        })?;
        drop(stream);

        tracing::trace!("Command {:?} returned {}", tokens, response);
        Ok(response)
    }
}

impl<S: Read + Write + Send> JailSource for Fail2BanClient<S> {
    fn jail_names(&self) -> Result<Vec<String>> {
        self.get_jail_names()
    }

    fn banned(&self, jail: &str) -> Result<Vec<BanEntry>> {
        self.get_banned(jail)
    }

    fn jail_info(&self, jail: &str) -> Result<JailInfo> {
        self.get_jail_info(jail)
    }
}
