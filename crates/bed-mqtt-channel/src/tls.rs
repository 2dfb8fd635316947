//! TLS configuration for mTLS connections to the broker.
//!
//! Loads the device certificate, private key, and CA certificate from PEM
//! files and configures rumqttc's TLS transport.

use rumqttc::Transport;

use crate::config::MqttConfig;
use crate::error::{MqttError, MqttResult};

/// Pick the transport for a config: mTLS when `use_tls`, plain TCP otherwise.
pub fn transport_for(config: &MqttConfig) -> MqttResult<Transport> {
    if config.use_tls {
        load_tls_transport(config)
    } else {
        Ok(Transport::Tcp)
    }
}

/// Build a TLS transport from certificate file paths in the config.
pub fn load_tls_transport(config: &MqttConfig) -> MqttResult<Transport> {
    let ca = read_pem("CA cert", &config.ca_cert_path)?;
    let client_cert = read_pem("client cert", &config.client_cert_path)?;
    let client_key = read_pem("client key", &config.client_key_path)?;

    Ok(Transport::tls_with_config(
        rumqttc::TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth: Some((client_cert, client_key)),
        },
    ))
}

fn read_pem(what: &str, path: &str) -> MqttResult<Vec<u8>> {
    if path.is_empty() {
        return Err(MqttError::Tls(format!("{what} path is not configured")));
    }
    std::fs::read(path).map_err(|e| MqttError::Tls(format!("failed to read {what} '{path}': {e}")))
}
