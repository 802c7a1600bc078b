//! SpyPi - remote-operable pan/tilt camera turret for the Raspberry Pi
//!
//! Keyboard steering of a Pimoroni Pan-Tilt HAT, a gentle startup ramp
//! from the unknown power-on position, and still snapshots on request
//! from a Telegram chat.

pub mod angle;
pub mod camera;
pub mod config;
pub mod error;
pub mod input;
pub mod ramp;
pub mod servo;
pub mod shutdown;
pub mod snapshot;
pub mod telegram;
pub mod turret;

// Re-export commonly used types
pub use angle::{Axis, Position};
pub use config::Config;
pub use error::{Error, Result};
pub use turret::Turret;

#[cfg(test)]
pub(crate) mod mocks;
