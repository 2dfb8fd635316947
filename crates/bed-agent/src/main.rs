//! bedlink agent: edge runtime for the garden bed controller.
//!
//! Wires the GPIO gateway, the MQTT channel, and the two device loops into a
//! single binary. Exits non-zero when a loop fails so the process supervisor
//! can restart it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};
use tracing_subscriber::EnvFilter;

use bed_agent::config::AgentConfig;
use bed_agent::{ActuatorSubscribeLoop, LoopError, SensorPublishLoop, mqtt_loop, stop_signal};
use bed_gpio::{HardwareGateway, HttpGateway};
use bed_mqtt_channel::{Channel, MqttChannel, SubscriptionRouter};
use bed_protocol::topics;

/// Switch commands buffered between the MQTT driver and the switch loop.
/// Commands arriving while it is full are dropped.
const COMMAND_QUEUE_CAPACITY: usize = 32;

/// How long the MQTT driver gets to flush the disconnect on shutdown.
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

type LoopOutcome = (&'static str, Result<(), LoopError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "bed-agent starting");

    // ── Load config ─────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/bedlink/agent.toml".to_string());

    let config = AgentConfig::from_file(&config_path)?;
    tracing::info!(
        device_id = %config.device_name,
        hardware_url = %config.hardware_url,
        role = ?config.role,
        interval_secs = config.interval_secs,
        "config loaded"
    );

    let identity = config.identity();

    // ── Hardware gateway ────────────────────────────────────────
    let gateway: Arc<dyn HardwareGateway> = Arc::new(HttpGateway::new(&config.gateway())?);

    // ── MQTT channel ────────────────────────────────────────────
    let (mqtt, eventloop) = MqttChannel::connect(&config.mqtt())?;
    let mqtt = Arc::new(mqtt);
    tracing::info!(client_id = %mqtt.client_id(), "MQTT client created");
    let channel: Arc<dyn Channel> = mqtt.clone();

    let mut router = SubscriptionRouter::new();
    let switch_inbox = config
        .role
        .runs_switch()
        .then(|| router.route(topics::SWITCH_WATER, COMMAND_QUEUE_CAPACITY));
    let driver = tokio::spawn(mqtt_loop::run(eventloop, router, mqtt.link()));

    // ── Device loops ────────────────────────────────────────────
    let (stop_tx, stop_rx) = stop_signal();
    let mut loops: JoinSet<LoopOutcome> = JoinSet::new();

    if config.role.runs_sensor() {
        let mut sensor = SensorPublishLoop::new(
            channel.clone(),
            gateway.clone(),
            identity.clone(),
            config.interval(),
        );
        let stop = stop_rx.clone();
        loops.spawn(async move { ("sensor", sensor.run(stop).await) });
    }

    if let Some(inbox) = switch_inbox {
        let mut switch = ActuatorSubscribeLoop::new(channel.clone(), gateway.clone(), identity);
        let stop = stop_rx.clone();
        loops.spawn(async move { ("switch", switch.run(inbox, stop).await) });
    }

    tracing::info!("bed-agent ready");

    let mut failed = false;
    tokio::select! {
        Some(joined) = loops.join_next() => {
            failed |= record_outcome(joined);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    // One loop ending takes the others down with it.
    let _ = stop_tx.send(true);
    while let Some(joined) = loops.join_next().await {
        failed |= record_outcome(joined);
    }

    if let Err(e) = mqtt.disconnect().await {
        tracing::warn!(error = %e, "failed to request MQTT disconnect");
    }
    if tokio::time::timeout(DISCONNECT_GRACE, driver).await.is_err() {
        tracing::warn!("MQTT driver did not finish disconnecting in time");
    }

    if failed {
        anyhow::bail!("device loop failed, exiting for restart");
    }
    tracing::info!("bed-agent stopped");
    Ok(())
}

/// Log a finished loop. Returns `true` if it failed.
fn record_outcome(joined: Result<LoopOutcome, JoinError>) -> bool {
    match joined {
        Ok((name, Ok(()))) => {
            tracing::info!(duty = name, "loop finished");
            false
        }
        Ok((name, Err(e))) => {
            tracing::error!(duty = name, error = %e, "loop terminated");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "loop task panicked");
            true
        }
    }
}
