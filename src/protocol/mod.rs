//! Protocol Module
//!
//! Defines the wire format spoken on the fail2ban server socket.
//!
//! ## Message Format
//!
//! Requests and responses are pickled Python values followed by a fixed
//! terminator. There is no length prefix.
//! ```text
//! ┌─────────────────────────────┬─────────────────────┐
//! │       Pickled value         │ <F2B_END_COMMAND>   │
//! └─────────────────────────────┴─────────────────────┘
//! ```
//!
//! ### Requests
//! A list of strings, e.g. `["status", "sshd"]`.
//!
//! ### Responses
//! A `(code, payload)` tuple; the payload is nested tuples, lists, strings
//! and integers.

mod codec;
mod command;
mod value;

pub use codec::{
    decode, encode_command, write_command, COMMAND_PROTOCOL, HIGHEST_PROTOCOL, MAX_NESTING_DEPTH,
};
pub use command::Command;
pub use value::{find_labeled, WireValue};
