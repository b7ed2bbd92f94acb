//! scalelink-core: Core traits, types, and error definitions for scalelink.
//!
//! This crate defines the driver-agnostic abstractions behind scalelink.
//! Host applications depend on these types without pulling in a specific
//! bridge backend, and the test harness implements the bridge traits
//! without real hardware.
//!
//! # Key types
//!
//! - [`Scale`] -- the session trait host programs drive
//! - [`UartBridge`] / [`BridgeReader`] -- the vendor-driver boundary
//! - [`Reading`] / [`ReadingDispatcher`] -- measurement events and fan-out
//! - [`Error`] / [`Result`] -- error handling

pub mod bridge;
pub mod error;
pub mod events;
pub mod helpers;
pub mod scale;
pub mod types;

// Re-export key types at crate root for ergonomic `use scalelink_core::*`.
pub use bridge::{BridgeReader, UartBridge};
pub use error::{Error, Result};
pub use events::{Reading, ReadingDispatcher, ReadingObserver};
pub use helpers::normalize_reading;
pub use scale::Scale;
pub use types::{DeviceInfo, ScaleInfo};
