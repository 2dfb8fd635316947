//! MQTT event loop driver.
//!
//! Drives the rumqttc event loop, handing inbound publishes to the
//! subscription router and reporting connection state and SubAcks to the
//! channel's `BrokerLink`. Network errors mark the link down and the loop
//! polls again after a pause; rumqttc reconnects on the next poll.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use rumqttc::{Event, EventLoop, Outgoing, Packet};

use bed_mqtt_channel::{BrokerLink, InboundMessage, SubscriptionRouter};

/// Pause between a failed poll and the reconnect attempt.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Drive the MQTT event loop and dispatch incoming messages.
///
/// Returns once the client has sent a disconnect. Intended to be spawned as
/// a background tokio task.
pub async fn run(mut eventloop: EventLoop, router: SubscriptionRouter, link: Arc<BrokerLink>) {
    loop {
        match eventloop.poll().await {
            Ok(event) => {
                if handle_event(event, &router, &link).is_break() {
                    tracing::info!("MQTT driver stopped after disconnect");
                    return;
                }
            }
            Err(e) => {
                link.disconnected(&e.to_string());
                tracing::error!(error = %e, "MQTT event loop error, reconnecting in 5s");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

fn handle_event(event: Event, router: &SubscriptionRouter, link: &BrokerLink) -> ControlFlow<()> {
    match event {
        Event::Incoming(Packet::Publish(publish)) => {
            tracing::debug!(
                topic = %publish.topic,
                bytes = publish.payload.len(),
                "inbound publish"
            );
            router.dispatch(InboundMessage::from(&publish));
        }
        Event::Incoming(Packet::ConnAck(ack)) => {
            tracing::info!(
                code = ?ack.code,
                session_present = ack.session_present,
                "connected to broker"
            );
            link.connected();
        }
        Event::Incoming(Packet::SubAck(ack)) => {
            tracing::debug!(
                pkid = ack.pkid,
                return_codes = ?ack.return_codes,
                "subscription acknowledged"
            );
            link.suback(&ack);
        }
        Event::Outgoing(Outgoing::Subscribe(pkid)) => link.subscribe_sent(pkid),
        Event::Outgoing(Outgoing::Disconnect) => {
            link.disconnected("client disconnected");
            return ControlFlow::Break(());
        }
        _ => {}
    }
    ControlFlow::Continue(())
}
