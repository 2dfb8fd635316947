use serde::{Deserialize, Serialize};

/// Actuation command received on the switch topic.
///
/// Wire form: `{"switch_state": true}`. Any other field is ignored; a missing
/// or non-boolean `switch_state` fails deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuationCommand {
    /// Desired switch position (`true` opens the valve).
    pub switch_state: bool,
}

impl ActuationCommand {
    /// Decode a raw inbound payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

/// Request body sent to the hardware endpoint to set a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchWrite {
    pub open: bool,
}

impl From<ActuationCommand> for SwitchWrite {
    fn from(cmd: ActuationCommand) -> Self {
        Self {
            open: cmd.switch_state,
        }
    }
}
