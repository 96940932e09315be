//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize and customize the omok server.

use crate::error::ServerError;
use crate::game::DEFAULT_BOARD_SIZE;
use crate::utils::DEFAULT_UTC_OFFSET_MINUTES;
use std::net::{Ipv4Addr, SocketAddr};

/// Smallest board that can still hold a five plus its flanks.
pub const MIN_BOARD_SIZE: usize = 5;
pub const MAX_BOARD_SIZE: usize = 99;
/// Offsets must stay strictly within a day.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60 - 1;

/// Configuration structure for the game server.
///
/// Contains the network settings, the board size used for every new room, the
/// offset used for `serverTs` values and the connection limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Side length of the board for newly created rooms
    pub board_size: usize,

    /// Offset east of UTC, in minutes, for outbound timestamps
    pub utc_offset_minutes: i32,

    /// Maximum number of concurrent connections allowed
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            board_size: DEFAULT_BOARD_SIZE,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            max_connections: 1000,
        }
    }
}

impl ServerConfig {
    /// Checks the values the server cannot run with.
    pub fn validate(&self) -> Result<(), ServerError> {
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&self.board_size) {
            return Err(ServerError::Config(format!(
                "Board size must be between {MIN_BOARD_SIZE} and {MAX_BOARD_SIZE}, got {}",
                self.board_size
            )));
        }

        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ServerError::Config(format!(
                "UTC offset must be within ±{MAX_UTC_OFFSET_MINUTES} minutes, got {}",
                self.utc_offset_minutes
            )));
        }

        if self.max_connections == 0 {
            return Err(ServerError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.board_size, 15);
        assert_eq!(config.utc_offset_minutes, 540);
        assert_eq!(config.max_connections, 1000);
    }

    #[test]
    fn test_validate_reports_config_errors() {
        assert!(ServerConfig::default().validate().is_ok());

        let small = ServerConfig {
            board_size: 4,
            ..ServerConfig::default()
        };
        match small.validate() {
            Err(ServerError::Config(message)) => assert!(message.contains("Board size")),
            other => panic!("expected config error, got {other:?}"),
        }

        let offset = ServerConfig {
            utc_offset_minutes: -1440,
            ..ServerConfig::default()
        };
        assert!(matches!(offset.validate(), Err(ServerError::Config(_))));

        let closed = ServerConfig {
            max_connections: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(closed.validate(), Err(ServerError::Config(_))));
    }
}
