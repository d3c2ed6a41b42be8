//! Transport Tests
//!
//! These tests verify:
//! - Responses are read until the terminator, across chunk boundaries
//! - The terminator never reaches the decoder
//! - Requests are the encoded command followed by the terminator
//! - Closed peers and stalled peers surface as transport errors

#[path = "../common/mod.rs"]
mod common;

use std::os::unix::net::UnixStream;
use std::thread;
use std::time::Duration;

use common::{framed, pickle, version_reply, ScriptedStream};
use jailwatch::network::{
    read_response, send_command, write_request, Connection, MAX_RESPONSE_SIZE, READ_CHUNK_SIZE,
    TERMINATOR,
};
use jailwatch::protocol::{encode_command, WireValue};
use jailwatch::JailwatchError;

// =============================================================================
// Reading
// =============================================================================

#[test]
fn test_read_response_strips_terminator() {
    let body = pickle::encode(&version_reply("1.1.0"));
    let mut stream = ScriptedStream::new(framed(&version_reply("1.1.0")));

    let read = read_response(&mut stream).unwrap();
    assert_eq!(&read[..], &body[..]);
}

#[test]
fn test_terminator_split_across_reads() {
    // Every split point of the terminator, including inside the body
    let body = pickle::encode(&version_reply("1.0.2"));
    let framed = framed(&version_reply("1.0.2"));

    for max_read in 1..=TERMINATOR.len() + 2 {
        let mut stream = ScriptedStream::with_max_read(framed.clone(), max_read);
        let read = read_response(&mut stream).unwrap();
        assert_eq!(&read[..], &body[..], "max_read = {}", max_read);
    }
}

#[test]
fn test_terminator_at_chunk_boundary() {
    // Body longer than one chunk, so the terminator arrives in a later read
    let payload = "x".repeat(READ_CHUNK_SIZE);
    let value = WireValue::Tuple(vec![WireValue::Integer(0), payload.into()]);
    let mut bytes = pickle::encode(&value);
    let body_len = bytes.len();
    bytes.extend_from_slice(TERMINATOR);

    let mut stream = ScriptedStream::new(bytes);
    let read = read_response(&mut stream).unwrap();
    assert_eq!(read.len(), body_len);
}

#[test]
fn test_bytes_after_terminator_are_discarded() {
    let mut bytes = b"abc".to_vec();
    bytes.extend_from_slice(TERMINATOR);
    bytes.extend_from_slice(b"trailing");

    let mut stream = ScriptedStream::new(bytes);
    assert_eq!(&read_response(&mut stream).unwrap()[..], b"abc");
}

#[test]
fn test_empty_body() {
    let mut stream = ScriptedStream::new(TERMINATOR.to_vec());
    assert!(read_response(&mut stream).unwrap().is_empty());
}

#[test]
fn test_closed_before_terminator() {
    let mut stream = ScriptedStream::new(b"\x80\x04K\x00<F2B_END".to_vec());
    match read_response(&mut stream) {
        Err(JailwatchError::ConnectionClosed { received }) => assert_eq!(received, 12),
        other => panic!("Expected ConnectionClosed, got {:?}", other),
    }
}

#[test]
fn test_closed_without_data() {
    let mut stream = ScriptedStream::new(Vec::new());
    let err = read_response(&mut stream).unwrap_err();
    assert!(err.is_transport());
}

#[test]
fn test_unterminated_response_too_large() {
    let mut stream = ScriptedStream::new(vec![b'x'; MAX_RESPONSE_SIZE + READ_CHUNK_SIZE]);
    let err = read_response(&mut stream).unwrap_err();

    match &err {
        JailwatchError::ResponseTooLarge { size } => {
            assert_eq!(*size, MAX_RESPONSE_SIZE + READ_CHUNK_SIZE)
        }
        other => panic!("Expected ResponseTooLarge, got {:?}", other),
    }
    assert!(err.is_transport());
}

#[test]
fn test_response_at_size_limit_is_read() {
    let mut bytes = vec![b'x'; MAX_RESPONSE_SIZE];
    bytes.extend_from_slice(TERMINATOR);
    let mut stream = ScriptedStream::new(bytes);

    let read = read_response(&mut stream).unwrap();
    assert_eq!(read.len(), MAX_RESPONSE_SIZE);
}

// =============================================================================
// Writing
// =============================================================================

#[test]
fn test_write_request_appends_terminator() {
    let mut stream = ScriptedStream::new(Vec::new());
    write_request(&mut stream, &["status", "sshd"]).unwrap();

    let mut expected = encode_command(&["status", "sshd"]);
    expected.extend_from_slice(TERMINATOR);
    assert_eq!(stream.written, expected);
}

#[test]
fn test_send_command_round_trip() {
    let mut stream = ScriptedStream::with_max_read(framed(&version_reply("1.1.0")), 7);
    let response = send_command(&mut stream, &["version"]).unwrap();

    assert_eq!(response, version_reply("1.1.0"));
    assert!(stream.written.ends_with(TERMINATOR));
}

#[test]
fn test_send_command_decode_error_after_framing() {
    let mut bytes = b"\x80\x02\xff.".to_vec();
    bytes.extend_from_slice(TERMINATOR);
    let mut stream = ScriptedStream::new(bytes);

    let err = send_command(&mut stream, &["version"]).unwrap_err();
    assert!(err.is_decode());
}

// =============================================================================
// Real Sockets
// =============================================================================

#[test]
fn test_read_timeout_is_transport_error() {
    let (mut client, _server) = UnixStream::pair().unwrap();
    client
        .set_read_timeout(Some(Duration::from_millis(50)))
        .unwrap();

    let err = send_command(&mut client, &["ping"]).unwrap_err();
    assert!(matches!(err, JailwatchError::Transport(_)));
}

#[test]
fn test_connection_exchange() {
    let daemon = common::FakeDaemon::start(|tokens| {
        assert_eq!(tokens, ["version"]);
        common::Reply::Value(version_reply("0.11.2"))
    });

    let mut connection = Connection::connect(daemon.socket_path()).unwrap();
    connection
        .set_timeouts(Some(Duration::from_secs(5)), Some(Duration::from_secs(5)))
        .unwrap();
    assert_eq!(connection.socket_path(), daemon.socket_path());

    let response = send_command(&mut connection, &["version"]).unwrap();
    assert_eq!(response, version_reply("0.11.2"));
}

#[test]
fn test_connection_refused_when_socket_missing() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = Connection::connect(&dir.path().join("missing.sock")).unwrap_err();
    assert!(err.is_transport());
}

#[test]
fn test_peer_closes_mid_response() {
    let (mut client, mut server) = UnixStream::pair().unwrap();
    let writer = thread::spawn(move || {
        use std::io::Write;
        server.write_all(b"\x80\x04K").unwrap();
    });

    let err = read_response(&mut client).unwrap_err();
    writer.join().unwrap();
    assert!(matches!(err, JailwatchError::ConnectionClosed { received: 3 }));
}
