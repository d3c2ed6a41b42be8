//! Error types for jailwatch
//!
//! Provides a unified error type for all operations.
//!
//! Errors fall into three families that callers care about:
//! - transport: the socket exchange itself failed
//! - decode: bytes arrived but are not a value we can read
//! - protocol: a well-formed value with the wrong shape

use thiserror::Error;

/// Result type alias using JailwatchError
pub type Result<T> = std::result::Result<T, JailwatchError>;

/// Unified error type for jailwatch operations
#[derive(Debug, Error)]
pub enum JailwatchError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Connection closed by peer after {received} bytes without terminator")]
    ConnectionClosed { received: usize },

    #[error("Response too large: {size} bytes without terminator")]
    ResponseTooLarge { size: usize },

    // -------------------------------------------------------------------------
    // Decode Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Decode error: integer does not fit in 64 bits")]
    IntegerOverflow,

    #[error("Unsupported type: [{module}] {name}")]
    UnsupportedType { module: String, name: String },

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unsupported fail2ban version: {0}")]
    UnsupportedVersion(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Refresh loop already started")]
    AlreadyStarted,

    #[error("Could not spawn refresh thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Signal handling failed: {0}")]
    Signal(#[source] nix::errno::Errno),
}

impl JailwatchError {
    /// Socket write/read/connect failures, closed peers, oversized responses
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ConnectionClosed { .. } | Self::ResponseTooLarge { .. }
        )
    }

    /// Malformed or unsupported wire bytes
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::IntegerOverflow | Self::UnsupportedType { .. }
        )
    }

    /// Well-formed value that violates an expected shape or invariant
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}
