//! # chat-client
//!
//! Client side of the gateway.
//!
//! - [`RealtimeClient`]: identify, subscribe, heartbeat and reconnect with a
//!   fixed backoff, resubscribing every held topic on each new session
//! - [`ReconciliationCache`]: merges incoming events into locally held
//!   messages, thread counts and reaction tallies

pub mod cache;
pub mod client;
pub mod config;
pub mod error;

pub use cache::{CachedMessage, MergeOutcome, ReconciliationCache};
pub use client::{ClientEvent, ConnectionStatus, RealtimeClient};
pub use config::{ClientConfig, ReconnectPolicy};
pub use error::{ClientError, ClientResult};
