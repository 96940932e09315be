//! Outbound writer task.
//!
//! Drains a connection's queue into its WebSocket sink, one JSON text frame
//! per [`ServerMessage`], in the order the messages were queued.

use super::{ConnectionId, Outbound, OutboundQueue};
use futures::{Sink, SinkExt};
use std::fmt::Display;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, warn};

/// Forwards queued messages until the queue closes, a close is requested or
/// the sink fails.
///
/// If the queue overflows the task returns at once without a close frame,
/// which drops the sink half of the socket.
pub async fn forward_outbound<S>(connection_id: ConnectionId, mut sink: S, queue: OutboundQueue)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let OutboundQueue {
        mut receiver,
        overflow,
    } = queue;

    loop {
        let item = tokio::select! {
            biased;
            _ = overflow.notified() => {
                warn!("Peer {} is not reading, dropping connection", connection_id);
                return;
            }
            item = receiver.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        match item {
            Outbound::Message(message) => {
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to serialize message for {}: {}", connection_id, e);
                        continue;
                    }
                };
                tokio::select! {
                    biased;
                    _ = overflow.notified() => {
                        warn!("Peer {} is not reading, dropping connection", connection_id);
                        return;
                    }
                    result = sink.send(Message::Text(text.into())) => {
                        if let Err(e) = result {
                            warn!("Failed to send to {}: {}", connection_id, e);
                            break;
                        }
                    }
                }
            }
            Outbound::Close => {
                debug!("Closing connection {}", connection_id);
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }
    let _ = sink.close().await;
}
