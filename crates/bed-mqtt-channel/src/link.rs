//! Broker link state shared by `MqttChannel` and the event-loop driver.
//!
//! `AsyncClient` only queues requests. Whether the broker is reachable, and
//! whether it granted a subscription, is only seen by whoever polls the
//! `EventLoop`. The driver reports both here; the channel waits on them so
//! callers get broker failures back as errors.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rumqttc::{SubAck, SubscribeReasonCode};
use tokio::sync::{oneshot, watch};

use crate::error::{MqttError, MqttResult};

/// Connection state as last reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No CONNACK and no connection error yet.
    Connecting,
    Up,
    Down,
}

type AckSender = oneshot::Sender<MqttResult<()>>;

struct PendingSubscribe {
    filter: String,
    ack: AckSender,
}

#[derive(Default)]
struct SubAckTracker {
    /// Requested but not yet written, so no packet id yet.
    queued: VecDeque<PendingSubscribe>,
    /// Written; keyed by packet id until the SubAck arrives.
    in_flight: HashMap<u16, PendingSubscribe>,
}

pub struct BrokerLink {
    state: watch::Sender<LinkState>,
    subscribes: Mutex<SubAckTracker>,
}

impl BrokerLink {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LinkState::Connecting);
        Self {
            state,
            subscribes: Mutex::new(SubAckTracker::default()),
        }
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// The broker accepted the connection.
    pub fn connected(&self) {
        if self.state.send_replace(LinkState::Up) != LinkState::Up {
            tracing::info!("broker link up");
        }
    }

    /// The connection is gone. Subscriptions still waiting for a SubAck
    /// fail: the broker never registered them.
    pub fn disconnected(&self, reason: &str) {
        if self.state.send_replace(LinkState::Down) != LinkState::Down {
            tracing::warn!(reason, "broker link down");
        }

        let mut tracker = self.tracker();
        let tracker = &mut *tracker;
        let waiting = tracker
            .queued
            .drain(..)
            .chain(tracker.in_flight.drain().map(|(_, pending)| pending));
        for pending in waiting {
            let _ = pending.ack.send(Err(MqttError::Subscribe {
                filter: pending.filter,
                reason: format!("connection lost before SubAck: {reason}"),
            }));
        }
    }

    /// A SUBSCRIBE went out with packet id `pkid`.
    ///
    /// rumqttc writes requests in the order they were queued, so the oldest
    /// queued waiter owns this packet id.
    pub fn subscribe_sent(&self, pkid: u16) {
        let mut tracker = self.tracker();
        match tracker.queued.pop_front() {
            Some(pending) => {
                tracker.in_flight.insert(pkid, pending);
            }
            None => tracing::debug!(pkid, "SUBSCRIBE sent with nobody waiting on it"),
        }
    }

    /// Resolve the waiter for `ack.pkid`. Any failure return code fails it.
    pub fn suback(&self, ack: &SubAck) {
        let Some(pending) = self.tracker().in_flight.remove(&ack.pkid) else {
            tracing::debug!(pkid = ack.pkid, "SubAck for unknown packet id");
            return;
        };

        let refused = ack
            .return_codes
            .iter()
            .any(|code| matches!(code, SubscribeReasonCode::Failure));
        let result = if refused {
            Err(MqttError::Subscribe {
                filter: pending.filter,
                reason: "broker refused the subscription".into(),
            })
        } else {
            Ok(())
        };
        let _ = pending.ack.send(result);
    }

    /// Register for the SubAck of the next SUBSCRIBE to be queued.
    pub(crate) fn expect_suback(&self, filter: &str) -> oneshot::Receiver<MqttResult<()>> {
        let (ack, rx) = oneshot::channel();
        self.tracker().queued.push_back(PendingSubscribe {
            filter: filter.to_string(),
            ack,
        });
        rx
    }

    /// Drop the newest waiter after its SUBSCRIBE could not be queued.
    pub(crate) fn forget_last(&self) {
        self.tracker().queued.pop_back();
    }

    /// Wait for the link to settle, at most `wait`.
    ///
    /// `Ok` once the link is up. Fails at once if it is down, or when it is
    /// still connecting after `wait`.
    pub(crate) async fn ready(&self, wait: Duration) -> Result<(), String> {
        let mut rx = self.state.subscribe();
        let settled = tokio::time::timeout(wait, async {
            rx.wait_for(|state| *state != LinkState::Connecting)
                .await
                .map(|state| *state)
        })
        .await;

        match settled {
            Ok(Ok(LinkState::Up)) => Ok(()),
            Ok(_) => Err("broker connection lost".into()),
            Err(_) => Err(format!(
                "broker not connected after {}s",
                wait.as_secs_f64()
            )),
        }
    }

    fn tracker(&self) -> MutexGuard<'_, SubAckTracker> {
        self.subscribes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BrokerLink {
    fn default() -> Self {
        Self::new()
    }
}
