//! Jail snapshots
//!
//! Read-only merged views handed to consumers, and the pair of maps a
//! refresh pass swaps in.

use std::collections::HashMap;

use crate::client::{BanEntry, JailInfo};

/// One jail as seen by consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JailSnapshot {
    pub name: String,
    pub banned_entries: Vec<BanEntry>,

    /// Length of `banned_entries`; may differ from `currently_banned` when the
    /// two server calls observed different states
    pub banned_count: usize,

    pub currently_failed: u64,
    pub total_failed: u64,
    pub currently_banned: u64,
    pub total_banned: u64,
}

impl JailSnapshot {
    /// Merge a ban list and its counters
    pub fn merge(name: &str, entries: &[BanEntry], info: &JailInfo) -> Self {
        Self {
            name: name.to_string(),
            banned_entries: entries.to_vec(),
            banned_count: entries.len(),
            currently_failed: info.currently_failed,
            total_failed: info.total_failed,
            currently_banned: info.currently_banned,
            total_banned: info.total_banned,
        }
    }
}

/// The data of one successful refresh pass.
///
/// Both maps always come from the same pass. A jail present in only one of
/// them is treated as absent.
#[derive(Debug, Default)]
pub(crate) struct Snapshot {
    pub(crate) banned: HashMap<String, Vec<BanEntry>>,
    pub(crate) infos: HashMap<String, JailInfo>,
}

impl Snapshot {
    pub(crate) fn jail(&self, name: &str) -> Option<JailSnapshot> {
        let entries = self.banned.get(name)?;
        let info = self.infos.get(name)?;
        Some(JailSnapshot::merge(name, entries, info))
    }

    /// All complete jails, sorted by name
    pub(crate) fn jails(&self) -> Vec<JailSnapshot> {
        let mut jails: Vec<JailSnapshot> = self
            .banned
            .keys()
            .filter_map(|name| self.jail(name))
            .collect();
        jails.sort_by(|a, b| a.name.cmp(&b.name));
        jails
    }
}
