//! Shared test support
//!
//! - `pickle`: a small protocol 2 encoder for building server responses
//! - `FakeDaemon`: a scripted fail2ban server on a temporary Unix socket
//! - `ScriptedStream`: an in-memory stream with bounded read sizes

#![allow(dead_code)]

use std::cmp;
use std::io::{self, Cursor, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use jailwatch::network::{read_response, TERMINATOR};
use jailwatch::protocol::{decode, WireValue};
use parking_lot::Mutex;
use tempfile::TempDir;

// =============================================================================
// Response builders
// =============================================================================

pub fn reply(payload: WireValue) -> WireValue {
    WireValue::Tuple(vec![WireValue::Integer(0), payload])
}

pub fn pair(label: &str, value: WireValue) -> WireValue {
    WireValue::Tuple(vec![label.into(), value])
}

pub fn version_reply(version: &str) -> WireValue {
    reply(version.into())
}

pub fn status_reply(names: &[&str]) -> WireValue {
    reply(WireValue::Sequence(vec![
        pair("Number of jail", WireValue::Integer(names.len() as i64)),
        pair("Jail list", names.join(", ").into()),
    ]))
}

pub fn jail_status_reply(failed: (i64, i64), banned: (i64, i64)) -> WireValue {
    reply(WireValue::Sequence(vec![
        pair(
            "Filter",
            WireValue::Sequence(vec![
                pair("Currently failed", WireValue::Integer(failed.0)),
                pair("Total failed", WireValue::Integer(failed.1)),
                pair(
                    "File list",
                    WireValue::Sequence(vec!["/var/log/auth.log".into()]),
                ),
            ]),
        ),
        pair(
            "Actions",
            WireValue::Sequence(vec![
                pair("Currently banned", WireValue::Integer(banned.0)),
                pair("Total banned", WireValue::Integer(banned.1)),
                pair("Banned IP list", WireValue::Sequence(vec![])),
            ]),
        ),
    ]))
}

pub fn banned_reply(lines: &[&str]) -> WireValue {
    reply(WireValue::Sequence(
        lines.iter().map(|line| (*line).into()).collect(),
    ))
}

/// A ban line for `address`, banned at 10:30 for ten minutes
pub fn ban_line(address: &str) -> String {
    format!(
        "{} \t2023-08-29 10:30:00 + 600 = 2023-08-29 10:40:00",
        address
    )
}

// =============================================================================
// Pickle encoder
// =============================================================================

pub mod pickle {
    use jailwatch::protocol::WireValue;

    /// Encode `value` with protocol 2 opcodes
    pub fn encode(value: &WireValue) -> Vec<u8> {
        let mut out = vec![0x80, 2];
        write_value(&mut out, value);
        out.push(b'.');
        out
    }

    fn write_value(out: &mut Vec<u8>, value: &WireValue) {
        match value {
            WireValue::None => out.push(b'N'),
            WireValue::Integer(n) => write_int(out, *n),
            WireValue::String(s) => {
                out.push(b'X');
                out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            WireValue::Sequence(items) => {
                out.push(b']');
                if !items.is_empty() {
                    out.push(b'(');
                    for item in items {
                        write_value(out, item);
                    }
                    out.push(b'e');
                }
            }
            WireValue::Tuple(items) => {
                out.push(b'(');
                for item in items {
                    write_value(out, item);
                }
                out.push(b't');
            }
        }
    }

    fn write_int(out: &mut Vec<u8>, n: i64) {
        if (0..=0xff).contains(&n) {
            out.extend_from_slice(&[b'K', n as u8]);
        } else if let Ok(small) = i32::try_from(n) {
            out.push(b'J');
            out.extend_from_slice(&small.to_le_bytes());
        } else {
            out.extend_from_slice(&[0x8a, 8]);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Encoded `value` followed by the terminator
pub fn framed(value: &WireValue) -> Vec<u8> {
    let mut bytes = pickle::encode(value);
    bytes.extend_from_slice(TERMINATOR);
    bytes
}

// =============================================================================
// Fake daemon
// =============================================================================

/// What the fake daemon sends back for one request
pub enum Reply {
    Value(WireValue),

    /// Bytes written as-is, terminator included if wanted
    Raw(Vec<u8>),

    /// Drop the connection without answering
    Close,
}

type Handler = dyn Fn(&[String]) -> Reply + Send + Sync;

/// A fail2ban server stand-in listening on a temporary socket
pub struct FakeDaemon {
    _dir: TempDir,
    socket_path: PathBuf,
    requests: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeDaemon {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&[String]) -> Reply + Send + Sync + 'static,
    {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("fail2ban.sock");
        let listener = UnixListener::bind(&socket_path).unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let handler: Arc<Handler> = Arc::new(handler);
        let log = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let handler = Arc::clone(&handler);
                let log = Arc::clone(&log);
                thread::spawn(move || serve(stream, handler.as_ref(), &log));
            }
        });

        Self {
            _dir: dir,
            socket_path,
            requests,
        }
    }

    /// A daemon answering the usual commands for `(jail, banned addresses)`
    pub fn with_jails(version: &str, jails: &[(&str, &[&str])]) -> Self {
        let version = version.to_string();
        let jails: Vec<(String, Vec<String>)> = jails
            .iter()
            .map(|(name, addresses)| {
                let addresses = addresses.iter().map(|a| a.to_string()).collect();
                (name.to_string(), addresses)
            })
            .collect();

        Self::start(move |tokens| {
            let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
            let find = |jail: &str| jails.iter().find(|(name, _)| name == jail);
            match tokens.as_slice() {
                ["version"] => Reply::Value(version_reply(&version)),
                ["ping"] => Reply::Value(reply("pong".into())),
                ["status"] => {
                    let names: Vec<&str> = jails.iter().map(|(name, _)| name.as_str()).collect();
                    Reply::Value(status_reply(&names))
                }
                ["status", jail] => match find(*jail) {
                    Some((_, addresses)) => {
                        let banned = addresses.len() as i64;
                        Reply::Value(jail_status_reply((1, 10), (banned, banned + 5)))
                    }
                    None => Reply::Close,
                },
                ["get", jail, "banip", "--with-time"] => match find(*jail) {
                    Some((_, addresses)) => {
                        let lines: Vec<String> = addresses.iter().map(|a| ban_line(a)).collect();
                        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
                        Reply::Value(banned_reply(&lines))
                    }
                    None => Reply::Close,
                },
                _ => Reply::Close,
            }
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Every request received so far, as token lists
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().clone()
    }
}

fn serve(mut stream: UnixStream, handler: &Handler, log: &Mutex<Vec<Vec<String>>>) {
    loop {
        let Ok(body) = read_response(&mut stream) else {
            return;
        };
        let tokens: Vec<String> = match decode(&body) {
            Ok(WireValue::Sequence(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => return,
        };
        log.lock().push(tokens.clone());

        let bytes = match handler(tokens.as_slice()) {
            Reply::Value(value) => framed(&value),
            Reply::Raw(bytes) => bytes,
            Reply::Close => return,
        };
        if stream.write_all(&bytes).is_err() {
            return;
        }
    }
}

// =============================================================================
// Scripted stream
// =============================================================================

/// In-memory duplex stream: reads come from a fixed script in chunks of at
/// most `max_read` bytes, writes are captured
pub struct ScriptedStream {
    input: Cursor<Vec<u8>>,
    max_read: usize,
    pub written: Vec<u8>,
}

impl ScriptedStream {
    pub fn new(input: Vec<u8>) -> Self {
        Self::with_max_read(input, usize::MAX)
    }

    pub fn with_max_read(input: Vec<u8>, max_read: usize) -> Self {
        Self {
            input: Cursor::new(input),
            max_read,
            written: Vec::new(),
        }
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = cmp::min(buf.len(), self.max_read);
        self.input.read(&mut buf[..len])
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
