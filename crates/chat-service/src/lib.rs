//! # chat-service
//!
//! Application layer: the reaction toggle engine, thread counter
//! propagation and message use cases, plus request/response DTOs.
//!
//! Every write path persists first and publishes through the injected
//! [`chat_core::EventPublisher`] only after the store has accepted the change.

pub mod dto;
pub mod services;

pub use services::{
    MessageService, ReactionService, ServiceContext, ServiceContextBuilder, ServiceError,
    ServiceResult, ThreadService, ToggleStatus,
};
