//! Client connection representation.

use super::ConnectionId;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Metadata for one accepted client socket.
#[derive(Debug)]
pub struct ClientConnection {
    pub id: ConnectionId,

    /// The remote network address of the client
    pub remote_addr: SocketAddr,

    /// When this connection was established
    pub connected_at: Instant,
}

impl ClientConnection {
    /// Creates a record for a freshly accepted socket with a new id.
    pub fn new(remote_addr: SocketAddr) -> Self {
        Self {
            id: ConnectionId::new(),
            remote_addr,
            connected_at: Instant::now(),
        }
    }

    /// How long the connection has been open.
    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
