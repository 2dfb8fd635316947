use serde::Deserialize;

/// Connection settings for the local GPIO endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the hardware service (e.g., `http://localhost:5000`).
    pub base_url: String,
    /// Per-request timeout in seconds. `None` keeps the transport default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: None,
        }
    }
}
