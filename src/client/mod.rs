//! Client Module
//!
//! Typed access to the fail2ban server.
//!
//! ## Commands
//! - `get_version`:    `["version"]`
//! - `get_jail_names`: `["status"]`
//! - `get_jail_info`:  `["status", jail]`
//! - `get_banned`:     `["get", jail, "banip", "--with-time"]`
//!
//! Transport and decode errors are returned unchanged; shape violations
//! become protocol errors. Nothing is retried here.

mod fail2ban;
mod parse;
mod types;

pub use fail2ban::Fail2BanClient;
pub use parse::{
    parse_ban_line, parse_banned, parse_jail_info, parse_jail_names, parse_version,
    TIMESTAMP_FORMAT,
};
pub use types::{BanEntry, JailInfo};

use crate::error::Result;

/// The jail queries a refresh pass needs.
///
/// Implemented by [`Fail2BanClient`]; the store depends only on this trait.
pub trait JailSource: Send + Sync {
    fn jail_names(&self) -> Result<Vec<String>>;

    fn banned(&self, jail: &str) -> Result<Vec<BanEntry>>;

    fn jail_info(&self, jail: &str) -> Result<JailInfo>;
}
