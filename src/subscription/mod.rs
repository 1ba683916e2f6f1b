// Order-topic subscriptions, fan-out, and WebSocket connection handling

pub mod manager;
pub mod protocol;
pub mod registry;

pub use manager::{ConnectionManager, ConnectionRole};
pub use protocol::{ClientMessage, DriverLocationMessage, ErrorMessage};
pub use registry::{order_topic, BroadcastOutcome, ObserverSender, SubscriptionRegistry};
