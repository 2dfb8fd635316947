pub mod commands;
pub mod device;
pub mod telemetry;
pub mod topics;

pub use commands::*;
pub use device::*;
pub use telemetry::*;
