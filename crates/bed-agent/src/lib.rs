//! bedlink agent: library crate for the bed controller's device loops.
//!
//! Re-exports all modules so external crates (e.g. `bed-e2e-tests`) can
//! drive `SensorPublishLoop` and `ActuatorSubscribeLoop` against mocks.

pub mod actuator;
pub mod config;
pub mod error;
pub mod mqtt_loop;
pub mod sensor;
pub mod state;

pub use actuator::ActuatorSubscribeLoop;
pub use config::AgentConfig;
pub use error::LoopError;
pub use sensor::SensorPublishLoop;
pub use state::{LoopState, StopSignal, stop_signal};
