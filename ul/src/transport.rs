//! The transport seam of the association engine.
//!
//! Associations drive their peer connection exclusively through
//! the [`Transport`] trait, so that TLS wrappers (or in-process
//! test doubles) can stand in for a plain TCP stream. The trait
//! is implemented for [`TcpStream`] out of the box; TLS
//! implementations live outside this crate.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// A byte transport carrying an association.
///
/// On top of the blocking read/write pair, a transport can be
/// closed, can bound its blocking reads by a deadline, and may
/// know who the peer is (e.g. the certificate subject of a TLS
/// session).
pub trait Transport: Read + Write {
    /// Shut the connection down in both directions.
    /// Closing an already closed transport is a no-op.
    fn close(&mut self) -> std::io::Result<()>;

    /// Bound the time a blocking read may wait, or lift the bound
    /// with `None`.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()>;

    /// An identification of the peer, when the transport can
    /// provide one.
    fn peer_identity(&self) -> Option<String> {
        None
    }
}

impl Transport for TcpStream {
    fn close(&mut self) -> std::io::Result<()> {
        match TcpStream::shutdown(self, std::net::Shutdown::Both) {
            Ok(()) => Ok(()),
            // the peer may have closed first
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> std::io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn peer_identity(&self) -> Option<String> {
        self.peer_addr().ok().map(|addr| addr.to_string())
    }
}
