//! MQTT channel for broker communication.
//!
//! Provides a typed MQTT abstraction for the bed controller:
//! - `Channel` trait for publish/subscribe (mockable in tests)
//! - `MqttChannel` with TLS (mTLS) for production
//! - `MockChannel` for testing without a broker
//! - `BrokerLink` carrying connection state and SubAcks from the event loop
//! - `SubscriptionRouter` delivering inbound publishes to per-subscription queues

pub mod channel;
pub mod config;
pub mod error;
pub mod link;
pub mod mock;
pub mod router;
pub mod tls;

// Re-exports for convenience.
pub use channel::{Channel, MqttChannel};
pub use config::MqttConfig;
pub use error::{MqttError, MqttResult};
pub use link::{BrokerLink, LinkState};
pub use mock::MockChannel;
pub use router::{InboundMessage, SubscriptionRouter};
