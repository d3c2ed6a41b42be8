//! Typed results of client calls

use chrono::NaiveDateTime;

/// One address banned by a jail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanEntry {
    /// IPv4 address as sent by the server
    pub address: String,

    pub banned_at: NaiveDateTime,

    /// Ban duration in seconds, kept as the server's digits
    pub current_penalty: String,

    pub ban_ends_at: NaiveDateTime,

    pub jail_name: String,

    /// Filled in by an external enrichment step, never by the client
    pub country_code: Option<String>,
}

/// Filter and action counters of one jail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JailInfo {
    pub currently_failed: u64,
    pub total_failed: u64,
    pub currently_banned: u64,
    pub total_banned: u64,
}
