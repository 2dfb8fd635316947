//! Loopback MQTT 3.1.1 broker for driving a real `MqttChannel`.
//!
//! Speaks just enough of the protocol for the device: accepts CONNECT,
//! answers SUBSCRIBE with a scripted return code, answers PINGREQ, records
//! QoS 0 PUBLISH packets, and can push one PUBLISH to the client once a
//! subscription is granted.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};

use bed_agent::mqtt_loop;
use bed_mqtt_channel::{MqttChannel, MqttConfig, SubscriptionRouter};

/// SUBACK return code for a refused subscription.
pub const SUBACK_FAILURE: u8 = 0x80;
/// SUBACK return code granting QoS 0.
pub const SUBACK_QOS0: u8 = 0x00;

/// Port nothing listens on, so connecting is refused.
pub const REFUSED_PORT: u16 = 1;

#[derive(Clone)]
pub struct BrokerScript {
    pub suback_code: u8,
    /// Sent to the client right after a granted SUBACK.
    pub push_after_suback: Option<(String, Vec<u8>)>,
}

impl BrokerScript {
    pub fn granting() -> Self {
        Self {
            suback_code: SUBACK_QOS0,
            push_after_suback: None,
        }
    }

    pub fn refusing() -> Self {
        Self {
            suback_code: SUBACK_FAILURE,
            push_after_suback: None,
        }
    }

    pub fn then_push(mut self, topic: &str, payload: &str) -> Self {
        self.push_after_suback = Some((topic.to_string(), payload.as_bytes().to_vec()));
        self
    }
}

type Recorded = Arc<Mutex<Vec<(String, Vec<u8>)>>>;

pub struct FakeBroker {
    pub port: u16,
    published: Recorded,
    task: JoinHandle<()>,
}

impl FakeBroker {
    pub async fn start(script: BrokerScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let published: Recorded = Arc::default();

        let recorded = published.clone();
        let task = tokio::spawn(async move {
            // Connections live in here so aborting the task closes them.
            let mut connections = JoinSet::new();
            while let Ok((stream, _)) = listener.accept().await {
                connections.spawn(serve(stream, script.clone(), recorded.clone()));
            }
        });

        Self {
            port,
            published,
            task,
        }
    }

    /// `(topic, payload)` of every PUBLISH received, in order.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }

    /// Stop listening and drop every client connection.
    pub fn shut_down(&self) {
        self.task.abort();
    }
}

impl Drop for FakeBroker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(mut stream: TcpStream, script: BrokerScript, published: Recorded) {
    while let Some((header, body)) = read_packet(&mut stream).await {
        let reply = match header >> 4 {
            // CONNECT -> CONNACK, accepted
            1 => vec![0x20, 0x02, 0x00, 0x00],
            // PUBLISH: client only sends QoS 0, nothing to acknowledge
            3 => {
                let topic_len = usize::from(u16::from_be_bytes([body[0], body[1]]));
                let topic = String::from_utf8_lossy(&body[2..2 + topic_len]).into_owned();
                published
                    .lock()
                    .unwrap()
                    .push((topic, body[2 + topic_len..].to_vec()));
                continue;
            }
            // SUBSCRIBE -> SUBACK echoing the packet id
            8 => {
                let mut reply = vec![0x90, 0x03, body[0], body[1], script.suback_code];
                if script.suback_code != SUBACK_FAILURE {
                    if let Some((topic, payload)) = &script.push_after_suback {
                        reply.extend(publish_packet(topic, payload));
                    }
                }
                reply
            }
            // PINGREQ -> PINGRESP
            12 => vec![0xD0, 0x00],
            // DISCONNECT
            14 => return,
            _ => continue,
        };
        if stream.write_all(&reply).await.is_err() {
            return;
        }
    }
}

async fn read_packet(stream: &mut TcpStream) -> Option<(u8, Vec<u8>)> {
    let header = stream.read_u8().await.ok()?;
    let mut len = 0usize;
    let mut shift = 0;
    loop {
        let byte = stream.read_u8().await.ok()?;
        len |= usize::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    let mut body = vec![0; len];
    stream.read_exact(&mut body).await.ok()?;
    Some((header, body))
}

fn publish_packet(topic: &str, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend((topic.len() as u16).to_be_bytes());
    body.extend(topic.as_bytes());
    body.extend(payload);

    let mut packet = vec![0x30];
    let mut len = body.len();
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        packet.push(byte);
        if len == 0 {
            break;
        }
    }
    packet.extend(body);
    packet
}

/// Plaintext config for a broker on localhost.
pub fn broker_config(port: u16) -> MqttConfig {
    MqttConfig {
        broker_host: "127.0.0.1".into(),
        broker_port: port,
        client_id: "devA".into(),
        use_tls: false,
        credentials_dir: None,
        client_cert_path: String::new(),
        client_key_path: String::new(),
        ca_cert_path: String::new(),
        keepalive_secs: 30,
        ack_timeout_secs: 2,
    }
}

/// A real channel with its event-loop driver running, as the agent binary
/// sets it up.
pub fn connect(port: u16, router: SubscriptionRouter) -> (Arc<MqttChannel>, JoinHandle<()>) {
    let (channel, eventloop) = MqttChannel::connect(&broker_config(port)).unwrap();
    let driver = tokio::spawn(mqtt_loop::run(eventloop, router, channel.link()));
    (Arc::new(channel), driver)
}
