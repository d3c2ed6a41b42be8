//! Response projections
//!
//! Each function turns one decoded response into its typed result. They are
//! pure, so every shape rule can be tested without a socket.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use super::{BanEntry, JailInfo};
use crate::error::{JailwatchError, Result};
use crate::protocol::{find_labeled, WireValue};

const NUMBER_OF_JAIL: &str = "Number of jail";
const JAIL_LIST: &str = "Jail list";
const FILTER: &str = "Filter";
const ACTIONS: &str = "Actions";
const CURRENTLY_FAILED: &str = "Currently failed";
const TOTAL_FAILED: &str = "Total failed";
const CURRENTLY_BANNED: &str = "Currently banned";
const TOTAL_BANNED: &str = "Total banned";

/// Timestamp layout used in ban lines
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static BAN_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d{1,3}(?:\.\d{1,3}){3}) \t(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) \+ (\d+) = (\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})$",
    )
    .expect("ban line pattern is valid")
});

/// `(code, "1.1.0")`, exactly two elements
pub fn parse_version(response: &WireValue) -> Result<String> {
    let items = response.expect_tuple("version reply")?;
    let [_, version] = items else {
        return Err(JailwatchError::protocol(format!(
            "version reply: expected 2 elements, got {}",
            items.len()
        )));
    };
    Ok(version.expect_str("version")?.to_string())
}

/// `(code, [("Number of jail", N), ("Jail list", "a, b")])`
pub fn parse_jail_names(response: &WireValue) -> Result<Vec<String>> {
    let entries = response
        .payload("status reply")?
        .expect_sequence("status entries")?;
    let [count_entry, list_entry, ..] = entries else {
        return Err(JailwatchError::protocol(format!(
            "status entries: expected 2 entries, got {}",
            entries.len()
        )));
    };

    let (count_label, count) = count_entry.labeled("jail count entry")?;
    expect_label(count_label, NUMBER_OF_JAIL)?;
    let expected = count.expect_int("number of jails")?;

    let (list_label, list) = list_entry.labeled("jail list entry")?;
    expect_label(list_label, JAIL_LIST)?;
    let list = list.expect_str("jail list")?;

    let names: Vec<String> = if list.trim().is_empty() {
        Vec::new()
    } else {
        list.split(',').map(|name| name.trim().to_string()).collect()
    };

    if i64::try_from(names.len()).ok() != Some(expected) {
        tracing::error!(
            "Jail count mismatch: expected {}, got {}",
            expected,
            names.len()
        );
        return Err(JailwatchError::protocol(format!(
            "number of jails did not match: announced {}, listed {}",
            expected,
            names.len()
        )));
    }

    Ok(names)
}

/// `(code, [("Filter", [...]), ("Actions", [...])])`
///
/// Counters that are missing default to zero; counters of the wrong type
/// are errors.
pub fn parse_jail_info(response: &WireValue) -> Result<JailInfo> {
    let sections = response
        .payload("jail status reply")?
        .expect_sequence("jail status sections")?;

    let filter = section(sections, FILTER)?;
    let actions = section(sections, ACTIONS)?;

    Ok(JailInfo {
        currently_failed: counter(filter, CURRENTLY_FAILED)?,
        total_failed: counter(filter, TOTAL_FAILED)?,
        currently_banned: counter(actions, CURRENTLY_BANNED)?,
        total_banned: counter(actions, TOTAL_BANNED)?,
    })
}

/// `(code, ["1.2.3.4 \t2023-08-29 10:30:00 + 600 = 2023-08-29 10:40:00", ...])`
///
/// One bad line fails the whole list.
pub fn parse_banned(response: &WireValue, jail: &str) -> Result<Vec<BanEntry>> {
    let lines = response
        .payload("banned reply")?
        .expect_sequence("banned list")?;

    lines
        .iter()
        .map(|line| parse_ban_line(line.expect_str("banned entry")?, jail))
        .collect()
}

/// Parse one `<ip> \t<banned-at> + <seconds> = <ends-at>` line
pub fn parse_ban_line(line: &str, jail: &str) -> Result<BanEntry> {
    let captures = BAN_LINE.captures(line).ok_or_else(|| {
        tracing::error!("Failed to parse ban entry: {:?}", line);
        JailwatchError::protocol(format!("could not parse banned entry {:?}", line))
    })?;

    Ok(BanEntry {
        address: captures[1].to_string(),
        banned_at: parse_timestamp(&captures[2])?,
        current_penalty: captures[3].to_string(),
        ban_ends_at: parse_timestamp(&captures[4])?,
        jail_name: jail.to_string(),
        country_code: None,
    })
}

fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map_err(|e| JailwatchError::protocol(format!("invalid timestamp {:?}: {}", text, e)))
}

fn expect_label(actual: &str, expected: &str) -> Result<()> {
    if actual != expected {
        return Err(JailwatchError::protocol(format!(
            "expected {:?} entry, got {:?}",
            expected, actual
        )));
    }
    Ok(())
}

/// Items of a labeled section, or an empty slice when the section is absent
fn section<'a>(sections: &'a [WireValue], label: &str) -> Result<&'a [WireValue]> {
    match find_labeled(sections, label) {
        Some(items) => items.expect_sequence(label),
        None => Ok(&[]),
    }
}

fn counter(items: &[WireValue], label: &str) -> Result<u64> {
    let Some(value) = find_labeled(items, label) else {
        return Ok(0);
    };
    let n = value.expect_int(label)?;
    u64::try_from(n)
        .map_err(|_| JailwatchError::protocol(format!("{}: negative counter {}", label, n)))
}
