//! Sensor poll-and-publish loop.
//!
//! Every interval: read the moisture value from the GPIO endpoint, wrap it
//! with the device identity, publish it on `bed/sensors/moisture`. Any
//! failure ends the loop; restarting is up to whoever supervises the process.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::QoS;

use bed_gpio::HardwareGateway;
use bed_mqtt_channel::Channel;
use bed_protocol::{DeviceIdentity, SensorReading, topics};

use crate::error::LoopError;
use crate::state::{self, LoopState, StopSignal};

/// Polling half of the device: hardware read -> broker publish.
pub struct SensorPublishLoop {
    channel: Arc<dyn Channel>,
    gateway: Arc<dyn HardwareGateway>,
    identity: DeviceIdentity,
    interval: Duration,
    state: LoopState,
    published: u64,
}

impl SensorPublishLoop {
    pub fn new(
        channel: Arc<dyn Channel>,
        gateway: Arc<dyn HardwareGateway>,
        identity: DeviceIdentity,
        interval: Duration,
    ) -> Self {
        Self {
            channel,
            gateway,
            identity,
            interval,
            state: LoopState::Initial,
            published: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Number of readings published so far.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Run until stopped or until a read or publish fails.
    ///
    /// Returns `Ok(())` when stopped via `stop`, or the error that ended the
    /// loop. The stop signal is honored before each cycle and during the
    /// inter-poll sleep; a read/publish already in flight always completes.
    pub async fn run(&mut self, mut stop: StopSignal) -> Result<(), LoopError> {
        if self.state.is_terminal() {
            return Err(LoopError::Finished(self.state));
        }
        self.state.advance(LoopState::Running);
        tracing::info!(
            device_id = %self.identity,
            interval_secs = self.interval.as_secs_f64(),
            topic = topics::SENSOR_MOISTURE,
            "sensor loop started"
        );

        loop {
            if state::stop_requested(&stop) {
                break;
            }

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                () = state::stopped(&mut stop) => break,
            }

            if let Err(e) = self.cycle().await {
                self.state.advance(LoopState::Failed);
                tracing::error!(
                    device_id = %self.identity,
                    error = %e,
                    published = self.published,
                    "sensor loop failed"
                );
                return Err(e);
            }
        }

        self.state.advance(LoopState::Stopped);
        tracing::info!(
            device_id = %self.identity,
            published = self.published,
            "sensor loop stopped"
        );
        Ok(())
    }

    /// One read + publish.
    async fn cycle(&mut self) -> Result<(), LoopError> {
        let value = self
            .gateway
            .read_state(self.identity.device_name())
            .await?;

        let reading = SensorReading::new(&self.identity, value);
        let payload = reading
            .to_payload()
            .map_err(|e| LoopError::Serialization(e.to_string()))?;

        self.channel
            .publish(topics::SENSOR_MOISTURE, &payload, QoS::AtMostOnce)
            .await?;

        self.published += 1;
        tracing::debug!(
            device_id = %self.identity,
            data = %reading.data,
            "sensor reading published"
        );
        Ok(())
    }
}
