//! GPIO gateway over the device-local HTTP service.
//!
//! ```text
//! GET  {base_url}/gpios/{device_id}  -> {"state": {"value": <T>}}
//! POST {base_url}/gpios/{device_id}  <- {"open": <bool>}
//! ```

use async_trait::async_trait;
use std::time::Duration;

use bed_protocol::{GpioReport, SwitchWrite};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};

/// Request/response accessor for the hardware sensor and switch.
#[async_trait]
pub trait HardwareGateway: Send + Sync {
    /// Read the current state value of `device_id`, returned verbatim.
    async fn read_state(&self, device_id: &str) -> GatewayResult<serde_json::Value>;

    /// Drive the switch of `device_id` open or closed.
    ///
    /// `Ok(())` means the endpoint acknowledged with a success status.
    async fn write_state(&self, device_id: &str, open: bool) -> GatewayResult<()>;
}

/// HTTP client for the GPIO service.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of the GPIO resource for a device.
    pub fn gpio_url(&self, device_id: &str) -> String {
        format!("{}/gpios/{device_id}", self.base_url)
    }
}

#[async_trait]
impl HardwareGateway for HttpGateway {
    async fn read_state(&self, device_id: &str) -> GatewayResult<serde_json::Value> {
        let url = self.gpio_url(device_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Protocol {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&url, e))?;
        let report: GpioReport =
            serde_json::from_slice(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;

        tracing::debug!(device_id, url = %url, "gpio state read");
        Ok(report.state.value)
    }

    async fn write_state(&self, device_id: &str, open: bool) -> GatewayResult<()> {
        let url = self.gpio_url(device_id);

        let response = self
            .client
            .post(&url)
            .json(&SwitchWrite { open })
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Protocol {
                url,
                status: status.as_u16(),
            });
        }

        tracing::debug!(device_id, open, url = %url, "gpio state written");
        Ok(())
    }
}

/// Map a reqwest failure that happened before a usable response.
fn transport_error(url: &str, e: reqwest::Error) -> GatewayError {
    if e.is_decode() {
        return GatewayError::Decode(e.to_string());
    }
    GatewayError::Unreachable {
        url: url.to_string(),
        reason: e.to_string(),
    }
}
