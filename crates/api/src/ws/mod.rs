//! Realtime change feed over WebSocket.
//!
//! Clients join `realtime:*` channels with `postgres_changes` subscriptions;
//! [`WsManager`] holds the connections and fans job row changes out to the
//! matching subscriptions.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
