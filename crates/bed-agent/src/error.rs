//! Device loop error types.

use thiserror::Error;

use bed_gpio::GatewayError;
use bed_mqtt_channel::MqttError;

use crate::state::LoopState;

/// Errors surfaced by the device loops.
///
/// On the publish path every variant ends the loop. On the subscribe path
/// only `BrokerUnavailable` does; per-message errors are logged and the
/// message dropped.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("broker unavailable: {0}")]
    BrokerUnavailable(#[from] MqttError),

    #[error("malformed command on '{topic}': {reason}")]
    MessageDecode { topic: String, reason: String },

    #[error("failed to serialize reading: {0}")]
    Serialization(String),

    #[error("loop already finished ({0:?})")]
    Finished(LoopState),
}
