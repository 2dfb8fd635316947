//! E2E tests against a real `MqttChannel` and event-loop driver.
//!
//! The broker is a loopback fake (`helpers::broker`), so these cover what
//! `MockChannel` cannot: refused connections, refused SubAcks and a broker
//! that goes away mid-run, as seen through rumqttc.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::timeout;

use bed_agent::{ActuatorSubscribeLoop, LoopError, LoopState, SensorPublishLoop, stop_signal};
use bed_gpio::{MockGateway, WriteCall};
use bed_mqtt_channel::{MqttError, SubscriptionRouter};
use bed_protocol::{DeviceIdentity, topics};
use helpers::broker::{BrokerScript, FakeBroker, REFUSED_PORT, connect};
use helpers::{DEVICE, eventually, switch_router};

const POLL: Duration = Duration::from_millis(20);
const DEADLINE: Duration = Duration::from_secs(4);

fn identity() -> DeviceIdentity {
    DeviceIdentity::new(DEVICE)
}

/// Nothing listening on the broker port: the first publish fails and the
/// sensor loop ends instead of queueing readings.
#[tokio::test]
async fn e2e_unreachable_broker_fails_sensor_loop() {
    let (mqtt, driver) = connect(REFUSED_PORT, SubscriptionRouter::new());
    let gateway = Arc::new(MockGateway::with_readings(vec![json!(1); 500]));
    let mut sensor =
        SensorPublishLoop::new(mqtt, gateway.clone(), identity(), Duration::from_millis(5));
    let (_stop_tx, stop) = stop_signal();

    let result = timeout(DEADLINE, sensor.run(stop))
        .await
        .expect("sensor loop must not hang on a dead broker");

    assert!(matches!(
        result,
        Err(LoopError::BrokerUnavailable(MqttError::Publish { .. }))
    ));
    assert_eq!(sensor.state(), LoopState::Failed);
    assert_eq!(sensor.published(), 0);
    assert_eq!(gateway.read_calls(), 1, "no polling after the failed publish");
    driver.abort();
}

/// Readings go out over the wire with the exact payload.
#[tokio::test]
async fn e2e_readings_reach_broker() {
    let broker = FakeBroker::start(BrokerScript::granting()).await;
    let (mqtt, driver) = connect(broker.port, SubscriptionRouter::new());
    let gateway = Arc::new(MockGateway::with_readings(vec![json!(42), json!(43.5)]));
    let mut sensor = SensorPublishLoop::new(mqtt, gateway, identity(), POLL);
    let (_stop_tx, stop) = stop_signal();

    // The script runs dry after two readings, which ends the loop.
    let result = timeout(DEADLINE, sensor.run(stop)).await.unwrap();
    assert!(matches!(result, Err(LoopError::Gateway(_))));
    assert_eq!(sensor.published(), 2);

    assert!(eventually(|| async { broker.published().len() == 2 }).await);
    let published = broker.published();
    assert!(published.iter().all(|(topic, _)| topic == topics::SENSOR_MOISTURE));
    let first: serde_json::Value = serde_json::from_slice(&published[0].1).unwrap();
    let second: serde_json::Value = serde_json::from_slice(&published[1].1).unwrap();
    assert_eq!(first, json!({"sensor_id": "devA", "data": 42}));
    assert_eq!(second, json!({"sensor_id": "devA", "data": 43.5}));
    driver.abort();
}

/// Broker drops the connection while the sensor loop is running.
#[tokio::test]
async fn e2e_broker_outage_fails_sensor_loop() {
    let broker = FakeBroker::start(BrokerScript::granting()).await;
    let (mqtt, driver) = connect(broker.port, SubscriptionRouter::new());
    let gateway = Arc::new(MockGateway::with_readings(vec![json!(7); 1000]));
    let mut sensor = SensorPublishLoop::new(mqtt, gateway, identity(), POLL);
    let (_stop_tx, stop) = stop_signal();
    let task = tokio::spawn(async move {
        let result = sensor.run(stop).await;
        (sensor, result)
    });

    assert!(eventually(|| async { !broker.published().is_empty() }).await);
    broker.shut_down();

    let (sensor, result) = timeout(DEADLINE, task)
        .await
        .expect("sensor loop must notice the outage")
        .unwrap();
    assert!(matches!(result, Err(LoopError::BrokerUnavailable(_))));
    assert_eq!(sensor.state(), LoopState::Failed);
    driver.abort();
}

/// SUBACK 0x80 (e.g. a policy denying the topic) ends the switch loop.
#[tokio::test]
async fn e2e_refused_suback_fails_switch_loop() {
    let broker = FakeBroker::start(BrokerScript::refusing()).await;
    let (router, inbox) = switch_router();
    let (mqtt, driver) = connect(broker.port, router);
    let gateway = Arc::new(MockGateway::new());
    let mut actuator = ActuatorSubscribeLoop::new(mqtt, gateway.clone(), identity());
    let (_stop_tx, stop) = stop_signal();

    let result = timeout(DEADLINE, actuator.run(inbox, stop))
        .await
        .expect("switch loop must not wait on a refused subscription");

    assert!(matches!(
        result,
        Err(LoopError::BrokerUnavailable(MqttError::Subscribe { ref filter, .. }))
            if filter == topics::SWITCH_WATER
    ));
    assert_eq!(actuator.state(), LoopState::Failed);
    assert!(gateway.writes().is_empty());
    driver.abort();
}

/// Granted subscription: a command pushed by the broker reaches the hardware.
#[tokio::test]
async fn e2e_granted_subscription_delivers_command() {
    let script =
        BrokerScript::granting().then_push(topics::SWITCH_WATER, r#"{"switch_state": true}"#);
    let broker = FakeBroker::start(script).await;
    let (router, inbox) = switch_router();
    let (mqtt, driver) = connect(broker.port, router);
    let gateway = Arc::new(MockGateway::new());
    let mut actuator = ActuatorSubscribeLoop::new(mqtt, gateway.clone(), identity());
    let (stop_tx, stop) = stop_signal();
    let task = tokio::spawn(async move {
        let result = actuator.run(inbox, stop).await;
        (actuator, result)
    });

    assert!(eventually(|| async { gateway.writes().len() == 1 }).await);
    stop_tx.send(true).unwrap();
    let (actuator, result) = task.await.unwrap();
    result.unwrap();

    assert_eq!(
        gateway.writes(),
        vec![WriteCall {
            device_id: DEVICE.into(),
            open: true,
        }]
    );
    assert_eq!(actuator.applied(), 1);
    driver.abort();
}
