//! MQTT channel error types.

use thiserror::Error;

/// Errors that can occur during MQTT operations.
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("publish to '{topic}' failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("subscribe to '{filter}' failed: {reason}")]
    Subscribe { filter: String, reason: String },

    #[error("TLS error: {0}")]
    Tls(String),
}

/// Convenience alias for MQTT results.
pub type MqttResult<T> = Result<T, MqttError>;
