use serde::Deserialize;

/// MQTT connection configuration, loadable from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    /// MQTT broker hostname (e.g., AWS IoT endpoint).
    pub broker_host: String,
    /// MQTT broker port (default 8883 for TLS).
    #[serde(default = "default_port")]
    pub broker_port: u16,
    /// MQTT client ID. Empty means "use the device name".
    #[serde(default)]
    pub client_id: String,
    /// Enable TLS (mTLS). When false, connects plaintext (local dev).
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    /// Directory holding `{device}.cert.pem` and `{device}.private.key`.
    #[serde(default)]
    pub credentials_dir: Option<String>,
    /// Path to device X.509 certificate (PEM).
    #[serde(default)]
    pub client_cert_path: String,
    /// Path to device private key (PEM).
    #[serde(default)]
    pub client_key_path: String,
    /// Path to CA certificate.
    #[serde(default = "default_ca_cert_path")]
    pub ca_cert_path: String,
    /// Keep-alive interval in seconds.
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u16,
    /// How long a publish waits for the connection to come up, and a
    /// subscribe waits for its SubAck.
    #[serde(default = "default_ack_timeout")]
    pub ack_timeout_secs: u64,
}

fn default_use_tls() -> bool {
    true
}

fn default_port() -> u16 {
    8883
}

fn default_ca_cert_path() -> String {
    "root-CA.crt".into()
}

fn default_keepalive() -> u16 {
    30
}

fn default_ack_timeout() -> u64 {
    10
}

impl MqttConfig {
    /// Fill in the settings that default from the device name.
    ///
    /// Explicit values always win. Cert and key paths are only derived when
    /// `credentials_dir` is set.
    pub fn with_device_defaults(mut self, device_name: &str) -> Self {
        if self.client_id.is_empty() {
            self.client_id = device_name.to_string();
        }
        if let Some(dir) = self.credentials_dir.as_deref() {
            let dir = dir.trim_end_matches('/');
            if self.client_cert_path.is_empty() {
                self.client_cert_path = format!("{dir}/{device_name}.cert.pem");
            }
            if self.client_key_path.is_empty() {
                self.client_key_path = format!("{dir}/{device_name}.private.key");
            }
        }
        self
    }
}
