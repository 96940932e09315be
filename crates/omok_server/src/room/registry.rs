//! Room registry.
//!
//! Maps room ids to [`Room`]s behind a single lock. Rooms are created on the
//! first join to an unseen id and removed as soon as their last seat is
//! vacated. There is no connection-to-room index: detaching scans every room.
//!
//! Lock order is always registry, then room.

use super::Room;
use crate::connection::{ConnectionHandle, ConnectionId};
use crate::error::ProtocolError;
use crate::game::Stone;
use crate::utils::ServerClock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Owner of every active room.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Arc<Room>>>,
    board_size: usize,
    clock: ServerClock,
}

impl RoomRegistry {
    /// Creates an empty registry whose rooms use `board_size` boards.
    pub fn new(board_size: usize, clock: ServerClock) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            board_size,
            clock,
        }
    }

    pub fn board_size(&self) -> usize {
        self.board_size
    }

    /// Returns the room for `room_id`, creating and registering it if needed.
    pub async fn get_or_create(&self, room_id: &str) -> Arc<Room> {
        let mut rooms = self.rooms.lock().await;
        self.get_or_create_locked(&mut rooms, room_id)
    }

    fn get_or_create_locked(
        &self,
        rooms: &mut HashMap<String, Arc<Room>>,
        room_id: &str,
    ) -> Arc<Room> {
        rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                debug!("Creating room {}", room_id);
                Arc::new(Room::new(room_id, self.board_size, self.clock))
            })
            .clone()
    }

    /// Resolves the room and binds `handle` into it while the registry lock
    /// is held, so a concurrent detach cannot drop the room in between. A
    /// failed bind never leaves an empty room registered.
    pub async fn join(
        &self,
        room_id: &str,
        player_id: &str,
        handle: ConnectionHandle,
    ) -> Result<(Arc<Room>, Stone), ProtocolError> {
        let mut rooms = self.rooms.lock().await;
        let room = self.get_or_create_locked(&mut rooms, room_id);
        match room.bind(player_id, handle).await {
            Ok(role) => Ok((room, role)),
            Err(e) => {
                if room.is_empty().await {
                    rooms.remove(room_id);
                }
                Err(e)
            }
        }
    }

    /// Clears every seat held by `connection` and drops rooms left empty.
    pub async fn detach(&self, connection: ConnectionId) {
        let mut rooms = self.rooms.lock().await;
        let mut empty = Vec::new();
        for (room_id, room) in rooms.iter() {
            room.detach(connection).await;
            if room.is_empty().await {
                empty.push(room_id.clone());
            }
        }
        for room_id in empty {
            rooms.remove(&room_id);
            info!("🧹 Room {} removed", room_id);
        }
    }

    pub async fn get(&self, room_id: &str) -> Option<Arc<Room>> {
        self.rooms.lock().await.get(room_id).cloned()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Closes every seated connection and drops all rooms.
    pub async fn shutdown(&self) {
        let mut rooms = self.rooms.lock().await;
        for room in rooms.values() {
            room.close_all().await;
        }
        let count = rooms.len();
        rooms.clear();
        info!("Registry shut down, {} room(s) closed", count);
    }
}
