use serde::{Deserialize, Serialize};

use crate::device::DeviceIdentity;

/// One sensor sample, published upstream as `{"sensor_id": .., "data": ..}`.
///
/// `data` carries the hardware value untouched, so the default payload type
/// is a raw JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading<T = serde_json::Value> {
    pub sensor_id: String,
    pub data: T,
}

impl<T> SensorReading<T> {
    pub fn new(identity: &DeviceIdentity, data: T) -> Self {
        Self {
            sensor_id: identity.device_name().to_string(),
            data,
        }
    }
}

impl<T: Serialize> SensorReading<T> {
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// GPIO state document returned by the hardware endpoint:
/// `{"state": {"value": <T>}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpioReport<T = serde_json::Value> {
    pub state: GpioState<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpioState<T = serde_json::Value> {
    pub value: T,
}
