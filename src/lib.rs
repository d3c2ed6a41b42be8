//! # jailwatch
//!
//! Monitoring core for the fail2ban daemon:
//! - Pickle wire codec for the fail2ban server socket
//! - Terminator-framed request/response transport over a Unix socket
//! - Typed client for version, status, jail status and banned lists
//! - Background refresh cache with consistent snapshots for many readers
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │            Consumers (web UI, metrics, CLI)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ get_jails / get_jail_by_name / handlers
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Store                                │
//! │         (RwLock snapshot, one refresh thread)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ JailSource
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Fail2BanClient                            │
//! │             (Mutex-serialized exchanges)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Transport  │          │    Codec    │
//!   │ (terminator)│          │  (pickle)   │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod client;
pub mod store;
pub mod bootstrap;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{JailwatchError, Result};
pub use config::Config;
pub use client::{BanEntry, Fail2BanClient, JailInfo, JailSource};
pub use store::{JailSnapshot, Store};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of jailwatch
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
