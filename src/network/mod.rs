//! Network Module
//!
//! Unix socket connection and request/response framing.
//!
//! ## Architecture
//! - `Connection` owns the socket and its timeouts
//! - `transport` frames one exchange: encoded request + terminator out,
//!   bytes up to the terminator in

mod connection;
mod transport;

pub use connection::Connection;
pub use transport::{
    read_response, send_command, write_request, MAX_RESPONSE_SIZE, READ_CHUNK_SIZE, TERMINATOR,
};
