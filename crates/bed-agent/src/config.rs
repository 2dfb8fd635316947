//! Agent configuration, loaded once from TOML plus environment overrides.

use std::time::Duration;

use anyhow::{Context, bail};
use serde::Deserialize;

use bed_gpio::GatewayConfig;
use bed_mqtt_channel::MqttConfig;
use bed_protocol::{DeviceIdentity, DeviceRole};

/// Top-level configuration for the bed agent.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Device name: GPIO id on the hardware endpoint and published `sensor_id`.
    #[serde(default)]
    pub device_name: String,
    /// Base URL of the local GPIO HTTP service.
    #[serde(default)]
    pub hardware_url: String,
    /// Seconds between sensor polls.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Which duties this device runs.
    #[serde(default)]
    pub role: DeviceRole,
    /// Per-request timeout for the hardware endpoint. Unset keeps the
    /// transport default.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// MQTT connection settings.
    pub mqtt: MqttConfig,
}

fn default_interval_secs() -> u64 {
    3
}

impl AgentConfig {
    /// Load config from a TOML file path, then apply process environment
    /// overrides (`HARDWARE_URL`, `DEVICE_NAME`, `INTERVAL_TIME`).
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{path}'"))?;
        let mut config: Self =
            toml::from_str(&contents).with_context(|| format!("invalid config file '{path}'"))?;
        config.apply_overrides(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `KEY=value` overrides. Unknown keys are ignored.
    pub fn apply_overrides<I>(&mut self, vars: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "HARDWARE_URL" => self.hardware_url = value,
                "DEVICE_NAME" => self.device_name = value,
                "INTERVAL_TIME" => {
                    self.interval_secs = value
                        .trim()
                        .parse()
                        .with_context(|| format!("INTERVAL_TIME is not a number: '{value}'"))?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Reject configs the loops cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.device_name.trim().is_empty() {
            bail!("device_name is required (config file or DEVICE_NAME)");
        }
        if self.hardware_url.trim().is_empty() {
            bail!("hardware_url is required (config file or HARDWARE_URL)");
        }
        if self.interval_secs == 0 {
            bail!("interval_secs must be at least 1");
        }
        Ok(())
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(&self.device_name)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.hardware_url.clone(),
            timeout_secs: self.request_timeout_secs,
        }
    }

    /// MQTT settings with device-name defaults filled in.
    pub fn mqtt(&self) -> MqttConfig {
        self.mqtt.clone().with_device_defaults(&self.device_name)
    }
}
