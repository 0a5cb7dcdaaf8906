//! Network abstractions
//!
//! The HTTP service is driven by polling: a listener hands out at most one
//! new connection per call, and connections only move bytes that the
//! network stack has already buffered.

use heapless::String;

/// Maximum hostname length
pub const MAX_HOSTNAME_LEN: usize = 32;

/// Proof that network provisioning finished
///
/// Produced by the provisioning collaborator once the node has joined a
/// network. The HTTP service cannot be started without one.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkUp {
    /// Hostname the node announces itself with
    pub hostname: String<MAX_HOSTNAME_LEN>,
    /// IPv4 address assigned to the node
    pub address: [u8; 4],
}

/// A non-blocking byte stream to one client
///
/// `read` and `write` must only be called after `read_ready` or
/// `write_ready` returned `true`; they then complete without waiting.
/// A `read` returning `Ok(0)` means the peer closed its side.
pub trait Connection:
    embedded_io::Read + embedded_io::Write + embedded_io::ReadReady + embedded_io::WriteReady
{
}

impl<T> Connection for T where
    T: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady + embedded_io::WriteReady
{
}

/// Source of incoming client connections
pub trait Listener {
    /// Connection type handed out by [`Listener::accept`]
    type Conn: Connection;
    /// Error reported when accepting fails
    type Error: core::fmt::Debug;

    /// Accept a pending connection, if there is one
    ///
    /// Returns `Ok(None)` immediately when no client is waiting.
    fn accept(&mut self) -> Result<Option<Self::Conn>, Self::Error>;
}
