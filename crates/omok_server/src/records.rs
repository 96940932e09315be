//! Finished-match reporting.
//!
//! When a game between two seated players ends, the room produces a
//! [`MatchRecord`]. Records are pushed onto a channel without waiting and a
//! background task hands them to the configured [`MatchRecorder`]. Nothing in
//! the game path ever observes whether recording succeeded.

use crate::error::ServerError;
use crate::game::{GameOverReason, Stone};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Outcome of one finished match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub room_id: String,
    /// The black player.
    pub player1_id: String,
    /// The white player.
    pub player2_id: String,
    pub winner_id: String,
    pub winner: Stone,
    pub reason: GameOverReason,
    /// Accepted placements when the game ended.
    pub move_count: u64,
    pub finished_at: String,
}

/// Sink for finished matches, typically backed by an external store.
#[async_trait]
pub trait MatchRecorder: Send + Sync {
    async fn record(&self, record: MatchRecord) -> Result<(), ServerError>;
}

/// Default recorder: writes each record to the log and keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

#[async_trait]
impl MatchRecorder for TracingRecorder {
    async fn record(&self, record: MatchRecord) -> Result<(), ServerError> {
        info!(
            "🏁 Match in room {} finished: {} beat {} ({:?}, {} moves)",
            record.room_id,
            record.winner_id,
            match record.winner {
                Stone::Black => &record.player2_id,
                Stone::White => &record.player1_id,
            },
            record.reason,
            record.move_count
        );
        Ok(())
    }
}

/// Sending half handed to dispatchers.
pub type RecordSender = mpsc::UnboundedSender<MatchRecord>;

/// Creates the record channel.
pub fn record_channel() -> (RecordSender, mpsc::UnboundedReceiver<MatchRecord>) {
    mpsc::unbounded_channel()
}

/// Drains `records` into `recorder` until every sender is dropped.
pub fn spawn_recorder(
    recorder: Arc<dyn MatchRecorder>,
    mut records: mpsc::UnboundedReceiver<MatchRecord>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(record) = records.recv().await {
            let room_id = record.room_id.clone();
            if let Err(e) = recorder.record(record).await {
                warn!("⚠️ Failed to record match for room {}: {}", room_id, e);
            }
        }
        debug!("Match recorder stopped");
    })
}
