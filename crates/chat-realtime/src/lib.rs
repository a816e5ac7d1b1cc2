//! # chat-realtime
//!
//! Topic-scoped event fan-out over WebSocket.
//!
//! - [`router`]: the single-task event router and its topic registry
//! - [`connection`]: per-socket lifecycle and the connection manager
//! - [`protocol`]: gateway frames, op codes and close codes
//! - [`server`]: the `/gateway` axum route

pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod router;
pub mod server;

pub use connection::{Connection, ConnectionId, ConnectionManager, ConnectionState};
pub use protocol::{CloseCode, GatewayMessage, OpCode};
pub use router::{EventRouter, RouterStats, RouterTask, TopicRegistry};
pub use server::{routes, RealtimeState};
