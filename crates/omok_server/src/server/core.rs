//! Core game server implementation.
//!
//! This module contains the `GameServer` struct: it owns the room registry,
//! binds the listener, runs the accept loop and hands every accepted socket
//! to its own connection task.

use crate::{
    config::ServerConfig,
    error::ServerError,
    records::{record_channel, spawn_recorder, MatchRecord, MatchRecorder, RecordSender, TracingRecorder},
    room::RoomRegistry,
    server::handlers::{handle_connection, SharedState},
    utils::ServerClock,
};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};

/// The omok game server.
///
/// `GameServer` owns the [`RoomRegistry`] every connection shares, the
/// channel finished matches are reported on, and the shutdown signal for
/// the accept loop.
///
/// # Lifecycle
///
/// 1. [`GameServer::new`] creates an empty registry
/// 2. [`GameServer::bind`] opens the listener, or [`GameServer::start`] does
///    it and serves in one call
/// 3. [`GameServer::serve`] accepts until [`GameServer::shutdown`] is called
pub struct GameServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Timestamp source for outbound messages
    clock: ServerClock,

    /// All active rooms
    registry: Arc<RoomRegistry>,

    /// Where dispatchers report finished matches
    records: RecordSender,

    /// Receiving half of `records`, taken by the first `serve` call
    pending_records: Mutex<Option<mpsc::UnboundedReceiver<MatchRecord>>>,

    /// Destination for finished matches
    recorder: Arc<dyn MatchRecorder>,

    /// Set to `true` to stop the accept loop
    shutdown_sender: watch::Sender<bool>,

    /// Connections currently being served
    active_connections: Arc<AtomicUsize>,
}

impl GameServer {
    /// Creates a new game server with the specified configuration.
    ///
    /// Finished matches go to a [`TracingRecorder`] unless another recorder
    /// is installed with [`GameServer::with_recorder`].
    pub fn new(config: ServerConfig) -> Self {
        let clock = ServerClock::new(config.utc_offset_minutes);
        let registry = Arc::new(RoomRegistry::new(config.board_size, clock));
        let (records, pending) = record_channel();
        let (shutdown_sender, _) = watch::channel(false);

        Self {
            config,
            clock,
            registry,
            records,
            pending_records: Mutex::new(Some(pending)),
            recorder: Arc::new(TracingRecorder),
            shutdown_sender,
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replaces the match recorder.
    pub fn with_recorder(mut self, recorder: Arc<dyn MatchRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The registry shared by every connection.
    pub fn registry(&self) -> Arc<RoomRegistry> {
        self.registry.clone()
    }

    /// Number of connections currently being served.
    pub fn connection_count(&self) -> usize {
        self.active_connections.load(Ordering::SeqCst)
    }

    /// Binds a listener on the configured address with `SO_REUSEADDR` set.
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// [`ServerError::Config`] before touching the network if the
    /// configuration is unusable.
    pub fn bind(&self) -> Result<TcpListener, ServerError> {
        self.config.validate()?;
        let address = self.config.bind_address;
        let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::Network(format!("Socket creation failed: {e}")))?;
        socket.set_reuse_address(true).ok();

        socket
            .bind(&address.into())
            .map_err(|e| ServerError::Network(format!("Bind failed: {e}")))?;
        socket
            .listen(1024)
            .map_err(|e| ServerError::Network(format!("Listen failed: {e}")))?;

        let std_listener: StdTcpListener = socket.into();
        std_listener
            .set_nonblocking(true)
            .map_err(|e| ServerError::Network(format!("Failed to set non-blocking: {e}")))?;

        let listener = TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::Network(format!("Tokio listener creation failed: {e}")))?;

        let local = listener
            .local_addr()
            .map_err(|e| ServerError::Network(e.to_string()))?;
        info!("✅ Listener bound on {}", local);
        Ok(listener)
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn start(&self) -> Result<(), ServerError> {
        info!("🚀 Starting omok server on {}", self.config.bind_address);
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Runs the accept loop on `listener` until shutdown is requested.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        match self.pending_records.lock().await.take() {
            Some(pending) => {
                spawn_recorder(self.recorder.clone(), pending);
            }
            None => {
                return Err(ServerError::Internal("Server is already serving".to_string()));
            }
        }

        let shared = SharedState {
            registry: self.registry.clone(),
            records: self.records.clone(),
            clock: self.clock,
        };
        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        info!(
            "🎮 Accepting connections (board {}x{}, limit {})",
            self.config.board_size, self.config.board_size, self.config.max_connections
        );

        while !*shutdown_receiver.borrow_and_update() {
            tokio::select! {
                result = listener.accept() => match result {
                    Ok((stream, addr)) => self.spawn_connection(stream, addr, &shared),
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
                _ = shutdown_receiver.changed() => {
                    info!("Shutdown signal received");
                }
            }
        }

        info!("Server stopped");
        Ok(())
    }

    fn spawn_connection(&self, stream: tokio::net::TcpStream, addr: SocketAddr, shared: &SharedState) {
        let active = self.active_connections.fetch_add(1, Ordering::SeqCst);
        if active >= self.config.max_connections {
            self.active_connections.fetch_sub(1, Ordering::SeqCst);
            warn!("⚠️ Connection limit {} reached, dropping {}", self.config.max_connections, addr);
            return;
        }

        let shared = shared.clone();
        let counter = ConnectionCounter(self.active_connections.clone());
        tokio::spawn(async move {
            let _counter = counter;
            if let Err(e) = handle_connection(stream, addr, shared).await {
                debug!("Connection from {} ended with error: {}", addr, e);
            }
        });
    }

    /// Initiates server shutdown.
    ///
    /// Stops the accept loop, closes every seated connection and drops all
    /// rooms.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        self.shutdown_sender.send_replace(true);
        self.registry.shutdown().await;
        Ok(())
    }
}

/// Decrements the active connection count when a connection task ends.
struct ConnectionCounter(Arc<AtomicUsize>);

impl Drop for ConnectionCounter {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
