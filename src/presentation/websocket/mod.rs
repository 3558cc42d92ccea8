//! WebSocket Gateway
//!
//! Real-time push of chat events via WebSocket connections.

pub mod delivery;
pub mod gateway;
pub mod handler;
pub mod messages;
pub mod session;

pub use delivery::{spawn_redelivery, DeliveryTracker};
pub use gateway::{
    Gateway, GatewayEvent, MessageDeliveredEvent, TypingStartEvent, WalletUpdateEvent,
};
pub use handler::ws_handler;
pub use messages::{GatewayReceive, GatewaySend, OpCode};
pub use session::SessionState;
