//! Local hardware gateway for the bed controller.
//!
//! `HardwareGateway` trait with `read_state`/`write_state`. Two impls:
//! - `HttpGateway`: talks to the GPIO HTTP service on the device
//! - `MockGateway`: scripted readings and recorded writes (in `mock.rs`)
//!
//! No retries happen here; retry and abort policy belongs to the caller.

pub mod config;
pub mod error;
pub mod gateway;
pub mod mock;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use gateway::{HardwareGateway, HttpGateway};
pub use mock::{MockGateway, WriteCall};
