//! Water switch subscription loop.
//!
//! Subscribes to `bed/switch/water` and applies each command to the GPIO
//! switch. Commands are handled strictly one after another in delivery
//! order, so an older command can never land after a newer one. A bad
//! message or a failed write drops that command only; losing the broker
//! subscription ends the loop.

use std::sync::Arc;

use rumqttc::QoS;
use tokio::sync::mpsc;

use bed_gpio::HardwareGateway;
use bed_mqtt_channel::{Channel, InboundMessage, MqttError};
use bed_protocol::{ActuationCommand, DeviceIdentity, topics};

use crate::error::LoopError;
use crate::state::{self, LoopState, StopSignal};

/// Reactive half of the device: broker command -> hardware write.
pub struct ActuatorSubscribeLoop {
    channel: Arc<dyn Channel>,
    gateway: Arc<dyn HardwareGateway>,
    identity: DeviceIdentity,
    state: LoopState,
    applied: u64,
    dropped: u64,
}

impl ActuatorSubscribeLoop {
    pub fn new(
        channel: Arc<dyn Channel>,
        gateway: Arc<dyn HardwareGateway>,
        identity: DeviceIdentity,
    ) -> Self {
        Self {
            channel,
            gateway,
            identity,
            state: LoopState::Initial,
            applied: 0,
            dropped: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Commands written to the hardware successfully.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Commands dropped because they were malformed or the write failed.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Subscribe, then handle deliveries from `inbox` until stopped.
    ///
    /// `inbox` is the delivery queue for [`topics::SWITCH_WATER`], fed by the
    /// broker connection. Fails with `BrokerUnavailable` if registration
    /// fails or the delivery queue closes.
    pub async fn run(
        &mut self,
        mut inbox: mpsc::Receiver<InboundMessage>,
        mut stop: StopSignal,
    ) -> Result<(), LoopError> {
        if self.state.is_terminal() {
            return Err(LoopError::Finished(self.state));
        }

        if let Err(e) = self
            .channel
            .subscribe(topics::SWITCH_WATER, QoS::AtMostOnce)
            .await
        {
            self.state.advance(LoopState::Failed);
            tracing::error!(
                device_id = %self.identity,
                topic = topics::SWITCH_WATER,
                error = %e,
                "switch subscription failed"
            );
            return Err(e.into());
        }

        self.state.advance(LoopState::Subscribed);
        tracing::info!(
            device_id = %self.identity,
            topic = topics::SWITCH_WATER,
            "switch loop subscribed"
        );

        loop {
            if state::stop_requested(&stop) {
                break;
            }

            let message = tokio::select! {
                biased;
                () = state::stopped(&mut stop) => break,
                message = inbox.recv() => message,
            };

            let Some(message) = message else {
                self.state.advance(LoopState::Failed);
                tracing::error!(
                    device_id = %self.identity,
                    "switch delivery stream closed"
                );
                return Err(LoopError::BrokerUnavailable(MqttError::Connection(
                    "switch delivery stream closed".into(),
                )));
            };

            // Handled outside the select so a stop never interrupts a write.
            match self.handle(&message).await {
                Ok(command) => {
                    self.applied += 1;
                    tracing::info!(
                        device_id = %self.identity,
                        switch_state = command.switch_state,
                        "switch command applied"
                    );
                }
                Err(e) => {
                    self.dropped += 1;
                    tracing::warn!(
                        device_id = %self.identity,
                        topic = %message.topic,
                        error = %e,
                        "switch command dropped"
                    );
                }
            }
        }

        self.state.advance(LoopState::Stopped);
        tracing::info!(
            device_id = %self.identity,
            applied = self.applied,
            dropped = self.dropped,
            "switch loop stopped"
        );
        Ok(())
    }

    /// Decode one delivery and write it to the hardware.
    pub async fn handle(&self, message: &InboundMessage) -> Result<ActuationCommand, LoopError> {
        let command = ActuationCommand::from_payload(&message.payload).map_err(|e| {
            LoopError::MessageDecode {
                topic: message.topic.clone(),
                reason: e.to_string(),
            }
        })?;

        self.gateway
            .write_state(self.identity.device_name(), command.switch_state)
            .await?;

        Ok(command)
    }
}
