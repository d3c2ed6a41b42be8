//! Command definitions
//!
//! The fixed command vocabulary sent to the fail2ban server.

/// A command understood by the fail2ban server socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Server version string
    Version,

    /// Health check
    Ping,

    /// Global status: jail count and jail list
    Status,

    /// Per-jail filter and action counters
    JailStatus { jail: String },

    /// Per-jail banned addresses with ban times
    BannedWithTime { jail: String },
}

impl Command {
    /// Positional tokens as written on the wire
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            Command::Version => vec!["version"],
            Command::Ping => vec!["ping"],
            Command::Status => vec!["status"],
            Command::JailStatus { jail } => vec!["status", jail.as_str()],
            Command::BannedWithTime { jail } => vec!["get", jail.as_str(), "banip", "--with-time"],
        }
    }
}
