//! Server implementation module.
//!
//! * [`core`] - `GameServer`: listener setup, accept loop and shutdown
//! * `handlers` - the per-connection task

pub mod core;
mod handlers;

pub use self::core::GameServer;
