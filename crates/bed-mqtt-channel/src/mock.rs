//! In-memory broker stand-in.
//!
//! `MockChannel` keeps every successful publish and subscription so tests
//! can assert on topics, payloads and QoS. Either direction can be switched
//! to fail, which is how tests simulate the broker going away.

use async_trait::async_trait;
use rumqttc::QoS;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::channel::Channel;
use crate::error::{MqttError, MqttResult};

/// One publish the mock accepted.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
}

impl PublishedMessage {
    /// Payload parsed as JSON, or `Null` if it is not JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Default)]
struct Recorded {
    published: Vec<PublishedMessage>,
    subscriptions: Vec<(String, QoS)>,
    publish_attempts: usize,
}

/// `Channel` that talks to nobody. Rejected calls leave no record except
/// in `publish_attempts`.
#[derive(Default)]
pub struct MockChannel {
    recorded: Mutex<Recorded>,
    fail_publish: AtomicBool,
    fail_subscribe: AtomicBool,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.recorded.lock().unwrap().published.clone()
    }

    /// Publish calls seen so far, accepted or not.
    pub fn publish_attempts(&self) -> usize {
        self.recorded.lock().unwrap().publish_attempts
    }

    pub fn subscriptions(&self) -> Vec<(String, QoS)> {
        self.recorded.lock().unwrap().subscriptions.clone()
    }

    pub fn last_published(&self) -> Option<PublishedMessage> {
        self.recorded.lock().unwrap().published.last().cloned()
    }

    /// Accepted publishes on `topic`, oldest first.
    pub fn published_to(&self, topic: &str) -> Vec<PublishedMessage> {
        self.recorded
            .lock()
            .unwrap()
            .published
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    pub fn is_subscribed_to(&self, filter: &str) -> bool {
        self.recorded
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .any(|(f, _)| f == filter)
    }

    /// Forget everything recorded. Failure switches are left as they are.
    pub fn reset(&self) {
        *self.recorded.lock().unwrap() = Recorded::default();
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<()> {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.publish_attempts += 1;
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(MqttError::Publish {
                topic: topic.to_string(),
                reason: "mock broker unavailable".into(),
            });
        }
        recorded.published.push(PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
        });
        Ok(())
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(MqttError::Subscribe {
                filter: filter.to_string(),
                reason: "mock broker unavailable".into(),
            });
        }
        self.recorded
            .lock()
            .unwrap()
            .subscriptions
            .push((filter.to_string(), qos));
        Ok(())
    }
}
