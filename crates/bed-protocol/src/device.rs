use serde::{Deserialize, Serialize};

/// Identity of this edge device, fixed for the process lifetime.
///
/// The device name doubles as the GPIO id on the local hardware endpoint
/// and as the `sensor_id` of published readings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    device_name: String,
}

impl DeviceIdentity {
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.device_name)
    }
}

/// Duties a device can run. The same software drives a moisture sensor,
/// a water switch, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    Sensor,
    Switch,
    #[default]
    Both,
}

impl DeviceRole {
    pub fn runs_sensor(self) -> bool {
        matches!(self, Self::Sensor | Self::Both)
    }

    pub fn runs_switch(self) -> bool {
        matches!(self, Self::Switch | Self::Both)
    }
}
