//! Mock hardware gateway for testing.
//!
//! Serves scripted readings in FIFO order and records every write so tests
//! can assert exactly which switch commands reached the hardware.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::HardwareGateway;

/// A recorded `write_state` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCall {
    pub device_id: String,
    pub open: bool,
}

/// Mock gateway with scripted reads and recorded writes.
pub struct MockGateway {
    /// Results handed out by `read_state`, front first.
    readings: Mutex<VecDeque<GatewayResult<serde_json::Value>>>,
    /// Number of `read_state` calls made.
    read_calls: Mutex<usize>,
    /// All `write_state` calls, in order.
    writes: Mutex<Vec<WriteCall>>,
    /// When set, every write is recorded and then fails with this error.
    write_error: Mutex<Option<GatewayError>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            readings: Mutex::new(VecDeque::new()),
            read_calls: Mutex::new(0),
            writes: Mutex::new(Vec::new()),
            write_error: Mutex::new(None),
        }
    }

    /// Create a mock pre-loaded with successful readings.
    pub fn with_readings(values: Vec<serde_json::Value>) -> Self {
        let mock = Self::new();
        for value in values {
            mock.queue_reading(value);
        }
        mock
    }

    /// Queue a successful reading.
    pub fn queue_reading(&self, value: serde_json::Value) {
        self.readings.lock().unwrap().push_back(Ok(value));
    }

    /// Queue a failed reading.
    pub fn queue_read_error(&self, error: GatewayError) {
        self.readings.lock().unwrap().push_back(Err(error));
    }

    /// Make every subsequent write fail with `error`.
    pub fn fail_writes(&self, error: GatewayError) {
        *self.write_error.lock().unwrap() = Some(error);
    }

    /// Let writes succeed again.
    pub fn succeed_writes(&self) {
        *self.write_error.lock().unwrap() = None;
    }

    pub fn read_calls(&self) -> usize {
        *self.read_calls.lock().unwrap()
    }

    /// Get copies of all recorded writes.
    pub fn writes(&self) -> Vec<WriteCall> {
        self.writes.lock().unwrap().clone()
    }

    pub fn last_write(&self) -> Option<WriteCall> {
        self.writes.lock().unwrap().last().cloned()
    }

    /// Convenience error matching a refused connection.
    pub fn refused() -> GatewayError {
        GatewayError::Unreachable {
            url: "http://mock-gpio".to_string(),
            reason: "connection refused".to_string(),
        }
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HardwareGateway for MockGateway {
    async fn read_state(&self, _device_id: &str) -> GatewayResult<serde_json::Value> {
        *self.read_calls.lock().unwrap() += 1;
        // An exhausted script behaves like a dead endpoint.
        self.readings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::refused()))
    }

    async fn write_state(&self, device_id: &str, open: bool) -> GatewayResult<()> {
        self.writes.lock().unwrap().push(WriteCall {
            device_id: device_id.to_string(),
            open,
        });
        match self.write_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
