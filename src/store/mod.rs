//! Store Module
//!
//! Periodically refreshed cache of jail data served to consumers.
//!
//! ## Responsibilities
//! - Poll the server on a fixed interval from one background thread
//! - Replace all jail data atomically after a fully successful pass
//! - Serve consistent snapshots to many readers
//! - Notify registered handlers after each pass
//!
//! ## Lifecycle
//! ```text
//! Idle ──▶ Refreshing ──▶ Idle ──▶ ... ──▶ Stopped
//! ```
//! The loop stops on the first failed pass and never restarts. Readers keep
//! getting the last good data.

mod data_store;
mod snapshot;

pub use data_store::{Store, UpdateHandler};
pub use snapshot::JailSnapshot;

use chrono::{DateTime, Local};

/// Where the refresh loop is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshState {
    /// Between passes, or not started
    #[default]
    Idle,

    /// A pass is fetching data
    Refreshing,

    /// The loop ended after an error
    Stopped,
}

/// Freshness information for consumers
#[derive(Debug, Clone, Default)]
pub struct StoreStatus {
    pub state: RefreshState,

    /// Completion time of the last successful pass
    pub last_refresh: Option<DateTime<Local>>,

    /// Error of the last failed pass, cleared by the next good one
    pub last_error: Option<String>,
}
