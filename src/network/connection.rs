//! Connection Handler
//!
//! Owns the Unix domain socket to the fail2ban server.

use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// A connected fail2ban server socket
#[derive(Debug)]
pub struct Connection {
    stream: UnixStream,

    /// Socket path for logging
    socket_path: PathBuf,
}

impl Connection {
    /// Connect to the server socket at `path`
    pub fn connect(path: &Path) -> Result<Self> {
        tracing::trace!("Connecting to fail2ban socket at {}", path.display());
        let stream = UnixStream::connect(path).map_err(|e| {
            tracing::error!("Failed to connect to fail2ban socket at {}: {}", path.display(), e);
            e
        })?;
        tracing::debug!("Connected to fail2ban socket at {}", path.display());

        Ok(Self {
            stream,
            socket_path: path.to_path_buf(),
        })
    }

    /// Configure socket timeouts; `None` blocks indefinitely
    pub fn set_timeouts(&self, read: Option<Duration>, write: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(read)?;
        self.stream.set_write_timeout(write)?;
        Ok(())
    }

    /// Get the socket path
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
