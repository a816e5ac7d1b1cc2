//! Gateway protocol definitions
//!
//! Op codes, frame format, payloads and close codes.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use messages::GatewayMessage;
pub use opcodes::OpCode;
pub use payloads::{
    HelloPayload, IdentifyPayload, ReadyPayload, SessionEvent, SubscriptionAck,
    SubscriptionPayload,
};
