//! MQTT channel: async client for broker communication.
//!
//! Wraps `rumqttc::AsyncClient` behind the `Channel` trait so the device
//! loops can run against a mock in tests. Calls wait on the `BrokerLink`
//! the event-loop driver keeps current, so an unreachable broker or a
//! refused subscription comes back as an error instead of a queued request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};

use crate::config::MqttConfig;
use crate::error::{MqttError, MqttResult};
use crate::link::BrokerLink;
use crate::tls;

/// Capacity of the rumqttc request queue between client and event loop.
const REQUEST_CAPACITY: usize = 64;

// ── Channel trait ─────────────────────────────────────────────

/// Abstraction for MQTT message publishing and subscribing.
///
/// Enables mocking in tests without a real MQTT broker.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Publish a raw payload to a topic.
    ///
    /// Fails while the broker is unreachable.
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<()>;

    /// Subscribe to a topic filter. Resolves once the broker has granted it.
    async fn subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()>;
}

// ── MqttChannel ───────────────────────────────────────────────

/// MQTT channel connected to the broker.
///
/// Owns the `AsyncClient` for publishing/subscribing. The `EventLoop`
/// is returned separately from `connect()`; the caller must drive it in a
/// spawned task and report connection events to [`MqttChannel::link`].
pub struct MqttChannel {
    client: AsyncClient,
    client_id: String,
    link: Arc<BrokerLink>,
    ack_timeout: Duration,
}

impl MqttChannel {
    /// Create a channel from config. Uses mTLS unless `use_tls` is off.
    ///
    /// Returns `(channel, event_loop)`. No network I/O happens until the
    /// event loop is polled.
    pub fn connect(config: &MqttConfig) -> MqttResult<(Self, EventLoop)> {
        if config.client_id.is_empty() {
            return Err(MqttError::Connection("client_id is empty".into()));
        }

        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(config.keepalive_secs.into()));
        // Keep the broker-side session so subscriptions survive reconnects.
        options.set_clean_session(false);
        options.set_transport(tls::transport_for(config)?);

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

        tracing::info!(
            broker = %config.broker_host,
            port = config.broker_port,
            client_id = %config.client_id,
            tls = config.use_tls,
            "MQTT channel configured"
        );

        Ok((
            Self {
                client,
                client_id: config.client_id.clone(),
                link: Arc::new(BrokerLink::new()),
                ack_timeout: Duration::from_secs(config.ack_timeout_secs),
            },
            eventloop,
        ))
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Link state handle for the task driving this channel's event loop.
    pub fn link(&self) -> Arc<BrokerLink> {
        self.link.clone()
    }

    /// Ask the broker to close the session cleanly.
    pub async fn disconnect(&self) -> MqttResult<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| MqttError::Connection(e.to_string()))
    }
}

#[async_trait]
impl Channel for MqttChannel {
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<()> {
        let failed = |reason: String| MqttError::Publish {
            topic: topic.to_string(),
            reason,
        };

        self.link.ready(self.ack_timeout).await.map_err(failed)?;
        // A full request queue means the event loop is not keeping up.
        self.client
            .try_publish(topic, qos, false, payload)
            .map_err(|e| failed(e.to_string()))
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()> {
        let refused = |reason: String| MqttError::Subscribe {
            filter: filter.to_string(),
            reason,
        };

        self.link.ready(self.ack_timeout).await.map_err(refused)?;

        let ack = self.link.expect_suback(filter);
        if let Err(e) = self.client.subscribe(filter, qos).await {
            self.link.forget_last();
            return Err(refused(e.to_string()));
        }

        match tokio::time::timeout(self.ack_timeout, ack).await {
            Ok(Ok(granted)) => granted,
            Ok(Err(_)) => Err(refused("event loop stopped before SubAck".into())),
            Err(_) => Err(refused(format!(
                "no SubAck within {}s",
                self.ack_timeout.as_secs_f64()
            ))),
        }
    }
}
