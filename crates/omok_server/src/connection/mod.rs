//! Connection management for client connections.
//!
//! Every accepted socket gets a [`ConnectionId`] and an outbound queue. Rooms
//! hold a [`ConnectionHandle`] (the sending half of that queue) per seat, and
//! a writer task owns the socket sink and drains the queue in order.

pub mod client;
pub mod writer;

pub use client::ClientConnection;

use crate::messaging::ServerMessage;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;
use tracing::warn;
use uuid::Uuid;

/// Messages a connection may have waiting before its peer is considered
/// stuck and the connection is dropped.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Unique identifier for one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An item on a connection's outbound queue.
#[derive(Debug, Clone)]
pub enum Outbound {
    Message(ServerMessage),
    /// Send a close frame and stop writing.
    Close,
}

/// Cloneable sender for one connection's outbound queue.
///
/// Sending never blocks. Once the writer has gone away, messages are dropped
/// silently; disconnect cleanup happens on the reading side. If the queue is
/// full the peer is not keeping up, and the writer is told to drop the
/// connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::Sender<Outbound>,
    overflow: Arc<Notify>,
}

/// Receiving half of a connection's outbound queue, drained by the writer.
#[derive(Debug)]
pub struct OutboundQueue {
    receiver: mpsc::Receiver<Outbound>,
    overflow: Arc<Notify>,
}

impl ConnectionHandle {
    /// Creates a handle and the queue its writer task should drain.
    pub fn new(id: ConnectionId) -> (Self, OutboundQueue) {
        Self::with_capacity(id, OUTBOUND_QUEUE_CAPACITY)
    }

    pub fn with_capacity(id: ConnectionId, capacity: usize) -> (Self, OutboundQueue) {
        let (sender, receiver) = mpsc::channel(capacity);
        let overflow = Arc::new(Notify::new());
        (
            Self {
                id,
                sender,
                overflow: overflow.clone(),
            },
            OutboundQueue { receiver, overflow },
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn send(&self, message: ServerMessage) {
        self.push(Outbound::Message(message));
    }

    pub fn close(&self) {
        self.push(Outbound::Close);
    }

    /// Whether the writer side is still receiving.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    fn push(&self, item: Outbound) {
        match self.sender.try_send(item) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue for {} is full", self.id);
                self.overflow.notify_one();
            }
        }
    }
}

impl OutboundQueue {
    pub async fn recv(&mut self) -> Option<Outbound> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Outbound, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }
}
