//! Connection management
//!
//! Per-socket state and the manager that tracks all open sockets.

#[allow(clippy::module_inception)]
mod connection;
mod error;
mod id;
mod manager;
mod outbound;

pub use connection::{Connection, ConnectionState};
pub use error::ConnectionError;
pub use id::ConnectionId;
pub use manager::ConnectionManager;
pub use outbound::Outbound;
