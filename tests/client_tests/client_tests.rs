//! Tests for Fail2BanClient
//!
//! These tests verify:
//! - Each operation sends the right command and projects the reply
//! - Shape violations become protocol errors
//! - Transport and decode errors pass through unchanged
//! - Concurrent callers never interleave on the socket

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use common::{
    ban_line, banned_reply, framed, jail_status_reply, pair, reply, status_reply, version_reply,
    FakeDaemon, Reply, ScriptedStream,
};
use jailwatch::protocol::WireValue;
use jailwatch::{Config, Fail2BanClient, JailInfo, JailwatchError};

// =============================================================================
// Helper Functions
// =============================================================================

fn client_for(daemon: &FakeDaemon) -> Fail2BanClient {
    let config = Config::builder()
        .socket_path(daemon.socket_path())
        .read_timeout_ms(5_000)
        .build();
    Fail2BanClient::connect(&config).unwrap()
}

fn scripted(response: &WireValue) -> Fail2BanClient<ScriptedStream> {
    Fail2BanClient::from_stream(ScriptedStream::new(framed(response)))
}

// =============================================================================
// Version / Ping
// =============================================================================

#[test]
fn test_get_version() {
    let daemon = FakeDaemon::with_jails("1.0.2", &[]);
    let client = client_for(&daemon);

    assert_eq!(client.get_version().unwrap(), "1.0.2");
    assert_eq!(daemon.requests(), vec![vec!["version".to_string()]]);
}

#[test]
fn test_get_version_wrong_shape() {
    let client = scripted(&WireValue::Tuple(vec![WireValue::Integer(0)]));
    assert!(client.get_version().unwrap_err().is_protocol());
}

#[test]
fn test_ping() {
    let daemon = FakeDaemon::with_jails("1.1.0", &[]);
    let client = client_for(&daemon);

    client.ping().unwrap();
    assert_eq!(daemon.requests(), vec![vec!["ping".to_string()]]);
}

// =============================================================================
// Jail Names
// =============================================================================

#[test]
fn test_get_jail_names_in_server_order() {
    let daemon = FakeDaemon::with_jails("1.1.0", &[("sshd", &[]), ("nginx-http-auth", &[]), ("apache", &[])]);
    let client = client_for(&daemon);

    assert_eq!(
        client.get_jail_names().unwrap(),
        ["sshd", "nginx-http-auth", "apache"]
    );
}

#[test]
fn test_get_jail_names_count_mismatch() {
    let response = reply(WireValue::Sequence(vec![
        pair("Number of jail", WireValue::Integer(1)),
        pair("Jail list", "jail1, jail2".into()),
    ]));
    let err = scripted(&response).get_jail_names().unwrap_err();
    assert!(err.is_protocol());
}

#[test]
fn test_get_jail_names_empty() {
    let client = scripted(&status_reply(&[]));
    assert!(client.get_jail_names().unwrap().is_empty());
}

#[test]
fn test_get_jail_names_missing_entries() {
    let response = reply(WireValue::Sequence(vec![pair(
        "Number of jail",
        WireValue::Integer(0),
    )]));
    assert!(scripted(&response).get_jail_names().unwrap_err().is_protocol());
}

// =============================================================================
// Jail Info
// =============================================================================

#[test]
fn test_get_jail_info() {
    let daemon = FakeDaemon::start(|tokens| {
        assert_eq!(tokens, ["status", "sshd"]);
        Reply::Value(jail_status_reply((5, 100), (2, 50)))
    });
    let client = client_for(&daemon);

    assert_eq!(
        client.get_jail_info("sshd").unwrap(),
        JailInfo {
            currently_failed: 5,
            total_failed: 100,
            currently_banned: 2,
            total_banned: 50,
        }
    );
}

#[test]
fn test_get_jail_info_negative_counter() {
    let client = scripted(&jail_status_reply((-1, 100), (2, 50)));
    assert!(client.get_jail_info("sshd").unwrap_err().is_protocol());
}

// =============================================================================
// Banned Addresses
// =============================================================================

#[test]
fn test_get_banned() {
    let daemon = FakeDaemon::with_jails("1.1.0", &[("sshd", &["192.168.1.100", "10.0.0.7"])]);
    let client = client_for(&daemon);

    let entries = client.get_banned("sshd").unwrap();
    assert_eq!(entries.len(), 2);

    let first = &entries[0];
    assert_eq!(first.address, "192.168.1.100");
    assert_eq!(first.jail_name, "sshd");
    assert_eq!(first.current_penalty, "600");
    assert_eq!(
        first.banned_at,
        NaiveDate::from_ymd_opt(2023, 8, 29)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    );
    assert_eq!(first.country_code, None);
    assert_eq!(entries[1].address, "10.0.0.7");

    assert_eq!(
        daemon.requests(),
        vec![vec!["get", "sshd", "banip", "--with-time"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()]
    );
}

#[test]
fn test_get_banned_one_bad_line_fails_all() {
    let good = ban_line("10.0.0.1");
    let response = banned_reply(&[&good, "not a ban line"]);
    let err = scripted(&response).get_banned("sshd").unwrap_err();
    assert!(err.is_protocol());
}

#[test]
fn test_get_banned_empty() {
    let client = scripted(&banned_reply(&[]));
    assert!(client.get_banned("sshd").unwrap().is_empty());
}

// =============================================================================
// Error Propagation
// =============================================================================

#[test]
fn test_transport_error_passes_through() {
    let daemon = FakeDaemon::start(|_| Reply::Close);
    let client = client_for(&daemon);

    let err = client.get_version().unwrap_err();
    assert!(err.is_transport(), "unexpected error: {}", err);
}

#[test]
fn test_decode_error_passes_through() {
    let daemon = FakeDaemon::start(|_| {
        let mut bytes = b"\x80\x02ccollections\nOrderedDict\n)R.".to_vec();
        bytes.extend_from_slice(jailwatch::network::TERMINATOR);
        Reply::Raw(bytes)
    });
    let client = client_for(&daemon);

    match client.get_jail_names() {
        Err(JailwatchError::UnsupportedType { module, .. }) => assert_eq!(module, "collections"),
        other => panic!("Expected UnsupportedType, got {:?}", other),
    }
}

#[test]
fn test_read_timeout_from_config() {
    let daemon = FakeDaemon::start(|_| {
        thread::sleep(Duration::from_millis(500));
        Reply::Value(version_reply("1.1.0"))
    });
    let config = Config::builder()
        .socket_path(daemon.socket_path())
        .read_timeout_ms(50)
        .build();
    let client = Fail2BanClient::connect(&config).unwrap();

    assert!(matches!(
        client.get_version(),
        Err(JailwatchError::Transport(_))
    ));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_callers_are_serialized() {
    // Each reply echoes the jail it was asked about; interleaving would
    // hand one caller another caller's counters
    let daemon = FakeDaemon::start(|tokens| match tokens {
        [cmd, jail] if cmd == "status" => {
            let n: i64 = jail.trim_start_matches("jail").parse().unwrap();
            thread::sleep(Duration::from_millis(2));
            Reply::Value(jail_status_reply((n, n), (n, n)))
        }
        _ => Reply::Close,
    });
    let client = Arc::new(client_for(&daemon));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                for _ in 0..10 {
                    let jail = format!("jail{}", i);
                    let info = client.get_jail_info(&jail).unwrap();
                    assert_eq!(info.currently_failed, i);
                    assert_eq!(info.total_banned, i);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(daemon.requests().len(), 80);
}
