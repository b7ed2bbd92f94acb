//! FTDI bridge backend for scalelink.
//!
//! This crate implements the scale side of the wire: finding a supported
//! device behind an FTDI-style USB-UART bridge, opening it, and streaming
//! its weight readings to observers. It provides:
//!
//! - **Model definitions** ([`models`]) -- static data for the supported
//!   bridge chips (FT232R, FT230X, FT245R).
//! - **FtdiScale** ([`scale`]) -- the [`Scale`](scalelink_core::Scale) trait
//!   implementation: device discovery, session setup, bounded connect
//!   retry, and the background acquisition task that turns RX bytes into
//!   dispatched readings.
//! - **FtdiScaleBuilder** ([`builder`]) -- fluent builder for constructing
//!   `FtdiScale` instances with configurable device signature, retry
//!   policy, and latency timer.
//!
//! The vendor driver itself is out of scope: everything talks through the
//! [`UartBridge`](scalelink_core::UartBridge) trait, so the same backend
//! drives real hardware behind a host-supplied adapter or the `MockBridge`
//! from `scalelink-test-harness`.
//!
//! # Example
//!
//! ```
//! use scalelink_core::Scale;
//! use scalelink_ftdi::models::ft232r;
//! use scalelink_ftdi::FtdiScaleBuilder;
//! use scalelink_test_harness::MockBridge;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> scalelink_core::Result<()> {
//! let bridge = MockBridge::new();
//! bridge.add_device("FT232R USB UART", "A5XK3RJT");
//!
//! let mut scale = FtdiScaleBuilder::new(ft232r()).build_with_bridge(bridge)?;
//! assert!(scale.connect().await?);
//!
//! scale.register_observer(Box::new(|reading| {
//!     println!("{}: {}", reading.device_id, reading.payload);
//! }));
//! # scale.dispose().await;
//! # Ok(())
//! # }
//! ```

mod acquisition;
pub mod builder;
pub mod models;
pub mod scale;

pub use builder::FtdiScaleBuilder;
pub use scale::FtdiScale;
