//! Shared test harness for E2E integration tests.
//!
//! Wires the device loops to a wiremock GPIO endpoint over real HTTP and to
//! a shared `MockChannel` standing in for the broker. Inbound commands go
//! through a `SubscriptionRouter`, the same path the MQTT driver uses.

#![allow(dead_code)]

pub mod broker;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bed_agent::{ActuatorSubscribeLoop, SensorPublishLoop};
use bed_gpio::{GatewayConfig, HttpGateway};
use bed_mqtt_channel::{InboundMessage, MockChannel, SubscriptionRouter};
use bed_protocol::{DeviceIdentity, topics};

pub const DEVICE: &str = "devA";
pub const GPIO_PATH: &str = "/gpios/devA";

/// Short poll interval so sensor tests run in real time.
pub const FAST_INTERVAL: Duration = Duration::from_millis(10);

/// End-to-end harness: wiremock hardware + mock broker.
pub struct TestHarness {
    /// Fake GPIO HTTP service.
    pub hardware: MockServer,
    /// Broker stand-in shared by both loops.
    pub mqtt: Arc<MockChannel>,
    /// Real HTTP gateway pointed at `hardware`.
    pub gateway: Arc<HttpGateway>,
    pub identity: DeviceIdentity,
}

impl TestHarness {
    pub async fn start() -> Self {
        let hardware = MockServer::start().await;
        let gateway = Arc::new(HttpGateway::new(&GatewayConfig::new(hardware.uri())).unwrap());
        Self {
            hardware,
            mqtt: Arc::new(MockChannel::new()),
            gateway,
            identity: DeviceIdentity::new(DEVICE),
        }
    }

    /// Serve `value` as the GPIO state for the next `times` reads.
    pub async fn serve_reading(&self, value: serde_json::Value, times: u64) {
        Mock::given(method("GET"))
            .and(path(GPIO_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"state": {"value": value}})),
            )
            .up_to_n_times(times)
            .mount(&self.hardware)
            .await;
    }

    /// Accept switch writes with the given `open` value, answering `status`.
    pub async fn accept_switch(&self, open: bool, status: u16) {
        Mock::given(method("POST"))
            .and(path(GPIO_PATH))
            .and(body_json(json!({"open": open})))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.hardware)
            .await;
    }

    /// Bodies of every switch write the hardware received, in order.
    pub async fn switch_writes(&self) -> Vec<serde_json::Value> {
        self.hardware
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == "POST")
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }

    pub fn sensor_loop(&self) -> SensorPublishLoop {
        SensorPublishLoop::new(
            self.mqtt.clone(),
            self.gateway.clone(),
            self.identity.clone(),
            FAST_INTERVAL,
        )
    }

    pub fn actuator_loop(&self) -> ActuatorSubscribeLoop {
        ActuatorSubscribeLoop::new(self.mqtt.clone(), self.gateway.clone(), self.identity.clone())
    }
}

/// Router with a single switch route, as the agent binary sets it up.
pub fn switch_router() -> (SubscriptionRouter, mpsc::Receiver<InboundMessage>) {
    let mut router = SubscriptionRouter::new();
    let inbox = router.route(topics::SWITCH_WATER, 16);
    (router, inbox)
}

/// An inbound publish as the broker would deliver it.
pub fn inbound(topic: &str, payload: &str) -> InboundMessage {
    InboundMessage {
        topic: topic.to_string(),
        payload: payload.as_bytes().to_vec(),
    }
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
