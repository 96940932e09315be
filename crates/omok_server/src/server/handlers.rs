//! Per-connection task.

use crate::connection::writer::forward_outbound;
use crate::connection::{ClientConnection, ConnectionHandle};
use crate::dispatcher::{Dispatcher, Flow};
use crate::error::ServerError;
use crate::records::RecordSender;
use crate::room::RoomRegistry;
use crate::utils::ServerClock;
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Server state every connection task gets a copy of.
#[derive(Clone)]
pub(crate) struct SharedState {
    pub registry: Arc<RoomRegistry>,
    pub records: RecordSender,
    pub clock: ServerClock,
}

/// Upgrades `stream` to a WebSocket and runs its dispatcher until the peer
/// goes away, the dispatcher asks to close, or the writer stops.
///
/// However the loop ends, the connection is detached from the registry
/// before returning.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    shared: SharedState,
) -> Result<(), ServerError> {
    let ws_stream = accept_async(stream).await.map_err(|e| {
        error!("WebSocket handshake failed for {}: {}", addr, e);
        ServerError::Network(format!("WebSocket handshake failed: {e}"))
    })?;

    let client = ClientConnection::new(addr);
    let connection_id = client.id;
    info!("🔗 New connection {} from {}", connection_id, addr);

    let (ws_sink, mut ws_receiver) = ws_stream.split();
    let (handle, queue) = ConnectionHandle::new(connection_id);
    let mut writer = tokio::spawn(forward_outbound(connection_id, ws_sink, queue));
    let mut writer_done = false;

    let mut dispatcher = Dispatcher::new(
        handle.clone(),
        shared.registry,
        Some(shared.records),
        shared.clock,
    );

    loop {
        let msg = tokio::select! {
            msg = ws_receiver.next() => match msg {
                Some(msg) => msg,
                None => break,
            },
            _ = &mut writer => {
                debug!("Writer for connection {} stopped", connection_id);
                writer_done = true;
                break;
            }
        };
        let flow = match msg {
            Ok(Message::Text(text)) => dispatcher.handle_text(text.as_str()).await,
            Ok(Message::Binary(data)) => match std::str::from_utf8(&data) {
                Ok(text) => dispatcher.handle_text(text).await,
                Err(_) => dispatcher.handle_unreadable("binary frame is not UTF-8"),
            },
            Ok(Message::Close(_)) => {
                info!("Connection {} requested close", connection_id);
                break;
            }
            // Ping/pong frames are answered by tungstenite itself.
            Ok(_) => Flow::Continue,
            Err(e) => {
                warn!("WebSocket error for connection {}: {}", connection_id, e);
                break;
            }
        };
        if flow == Flow::Close {
            break;
        }
    }

    dispatcher.close().await;
    drop(dispatcher);
    handle.close();
    drop(handle);
    if !writer_done {
        let _ = writer.await;
    }

    info!(
        "Connection {} from {} closed after {:?}",
        connection_id,
        addr,
        client.uptime()
    );
    Ok(())
}
