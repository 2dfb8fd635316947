//! MQTT topics used by the bed controller, plus filter matching.
//!
//! Topic structure:
//! ```text
//! bed/sensors/moisture   device -> cloud, sensor readings
//! bed/switch/water       cloud -> device, actuation commands
//! ```

/// Sensor readings published by the poll loop.
pub const SENSOR_MOISTURE: &str = "bed/sensors/moisture";

/// Actuation commands consumed by the switch loop.
pub const SWITCH_WATER: &str = "bed/switch/water";

/// Check whether a concrete topic matches an MQTT subscription filter.
///
/// Supports the `+` single-level and trailing `#` multi-level wildcards.
pub fn matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => continue,
            (Some(f), Some(t)) if f == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}
