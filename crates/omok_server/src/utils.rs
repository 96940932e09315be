//! # Utility Functions
//!
//! Server factory functions and the timestamp source shared by every outbound
//! message.
//!
//! - [`ServerClock`] - `serverTs` generation in the configured UTC offset
//! - [`create_server()`] / [`create_server_with_config()`] - server factories

use crate::config::ServerConfig;
use crate::server::GameServer;
use chrono::{DateTime, FixedOffset, Offset, SecondsFormat, Utc};

/// Offset used for `serverTs` unless configured otherwise (UTC+09:00).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 540;

/// Produces `serverTs` values: RFC 3339, millisecond precision, fixed offset.
///
/// ```rust
/// use omok_server::utils::ServerClock;
///
/// let clock = ServerClock::new(540);
/// assert!(clock.now().ends_with("+09:00"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ServerClock {
    offset: FixedOffset,
}

impl ServerClock {
    /// Creates a clock for the given offset east of UTC. Offsets outside
    /// ±24h fall back to UTC.
    pub fn new(utc_offset_minutes: i32) -> Self {
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Current time in the clock's offset.
    pub fn current(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    /// Current time formatted for the wire.
    pub fn now(&self) -> String {
        self.current().to_rfc3339_opts(SecondsFormat::Millis, false)
    }
}

impl Default for ServerClock {
    fn default() -> Self {
        Self::new(DEFAULT_UTC_OFFSET_MINUTES)
    }
}

/// Creates a new game server with default configuration.
///
/// # Returns
///
/// A new `GameServer` bound to nothing yet; call `start()` or `bind()`.
pub fn create_server() -> GameServer {
    GameServer::new(ServerConfig::default())
}

/// Creates a new game server with the given configuration.
pub fn create_server_with_config(config: ServerConfig) -> GameServer {
    GameServer::new(config)
}
