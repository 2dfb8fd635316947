//! Inbound delivery: routes broker publishes to per-subscription queues.
//!
//! Each registered filter gets its own bounded queue. A single consumer
//! drains each queue, so messages for one subscription are handled one at a
//! time in delivery order. Dispatch never waits: the event loop must keep
//! polling for keepalives and publishes, so a message for a full queue is
//! dropped with a warning.

use rumqttc::Publish;
use tokio::sync::mpsc::{self, error::TrySendError};

use bed_protocol::topics;

/// A publish delivered by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl From<&Publish> for InboundMessage {
    fn from(publish: &Publish) -> Self {
        Self {
            topic: publish.topic.clone(),
            payload: publish.payload.to_vec(),
        }
    }
}

struct Route {
    filter: String,
    tx: mpsc::Sender<InboundMessage>,
}

/// Fan-out of inbound publishes by topic filter.
#[derive(Default)]
pub struct SubscriptionRouter {
    routes: Vec<Route>,
}

impl SubscriptionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter and get the receiving end of its delivery queue.
    pub fn route(&mut self, filter: &str, capacity: usize) -> mpsc::Receiver<InboundMessage> {
        let (tx, rx) = mpsc::channel(capacity);
        self.routes.push(Route {
            filter: filter.to_string(),
            tx,
        });
        rx
    }

    /// Deliver a message to every route whose filter matches its topic.
    ///
    /// Returns the number of queues that accepted it. Full queues and routes
    /// whose consumer has gone away are skipped.
    pub fn dispatch(&self, message: InboundMessage) -> usize {
        let mut delivered = 0;
        for route in &self.routes {
            if !topics::matches(&route.filter, &message.topic) {
                continue;
            }
            match route.tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        filter = %route.filter,
                        topic = %message.topic,
                        "subscription queue full, message dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(
                        filter = %route.filter,
                        topic = %message.topic,
                        "subscription consumer gone, message not delivered"
                    );
                }
            }
        }
        if delivered == 0 {
            tracing::debug!(topic = %message.topic, "no route for inbound message");
        }
        delivered
    }
}
