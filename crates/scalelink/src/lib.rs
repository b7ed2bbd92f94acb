//! # scalelink -- USB-Serial Scale Acquisition
//!
//! `scalelink` is an asynchronous Rust library for reading digital scales
//! attached through FTDI-style USB-UART bridges. It is designed for
//! weighing stations, checkout integrations, and lab capture tools where
//! readings must stream in reliably as the device produces them.
//!
//! ## Quick Start
//!
//! Add `scalelink` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! scalelink = { version = "0.1", features = ["ftdi"] }
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! Connect to a scale and print its readings (here against the mock
//! bridge; production hosts pass their own adapter over the vendor
//! driver):
//!
//! ```no_run
//! use scalelink::ftdi::models::ft232r;
//! use scalelink::ftdi::FtdiScaleBuilder;
//! use scalelink::Scale;
//! use scalelink_test_harness::MockBridge;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bridge = MockBridge::new();
//!     bridge.add_device("FT232R USB UART", "A5XK3RJT");
//!
//!     let mut scale = FtdiScaleBuilder::new(ft232r()).build_with_bridge(bridge)?;
//!     scale.register_observer(Box::new(|reading| {
//!         println!("{}: {}", reading.device_id, reading.payload);
//!     }));
//!
//!     scale.connect_with_retry().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                    | Purpose                                       |
//! |--------------------------|-----------------------------------------------|
//! | `scalelink-core`         | Traits ([`Scale`], [`UartBridge`]), types, errors |
//! | `scalelink-ftdi`         | FTDI bridge backend: connect/retry, acquisition |
//! | `scalelink-test-harness` | `MockBridge` for driver-free testing          |
//! | **`scalelink`**          | This facade crate -- re-exports everything    |
//!
//! The backend implements the [`Scale`] trait, so application code can
//! work with `dyn Scale` and remain bridge-agnostic.
//!
//! ## Feature Flags
//!
//! | Feature | Enables                              | Default |
//! |---------|--------------------------------------|---------|
//! | `ftdi`  | [`ftdi`] module (FTDI bridge backend)| yes     |
//!
//! ## The `Scale` Trait
//!
//! The [`Scale`] trait is the central abstraction:
//!
//! - **Connection**: [`connect`](Scale::connect) for a single attempt,
//!   [`connect_with_retry`](Scale::connect_with_retry) for the bounded
//!   retry loop most hosts want
//! - **Diagnostics**: [`last_error`](Scale::last_error),
//!   [`retry_count`](Scale::retry_count)
//! - **Readings**: [`register_observer`](Scale::register_observer) for
//!   synchronous per-reading callbacks
//! - **Teardown**: [`dispose`](Scale::dispose)
//!
//! ## Reading Observers
//!
//! Observers are plain closures invoked in registration order on the
//! acquisition task, once per [`Reading`]. Keep them short; a slow
//! observer delays every reading behind it:
//!
//! ```
//! # let scale = {
//! #     let s = scalelink::ftdi::FtdiScaleBuilder::new(scalelink::ftdi::models::ft232r())
//! #         .build_with_bridge(scalelink_test_harness::MockBridge::new())
//! #         .unwrap();
//! #     s
//! # };
//! use scalelink::Scale;
//!
//! scale.register_observer(Box::new(|reading| {
//!     println!("{} weighed {}", reading.device_id, reading.payload);
//! }));
//! ```
//!
//! ## Supported Bridges
//!
//! - **FTDI**: FT232R, FT230X, FT245R

pub use scalelink_core::*;

/// FTDI bridge backend.
///
/// Provides [`FtdiScale`](ftdi::FtdiScale) and
/// [`FtdiScaleBuilder`](ftdi::FtdiScaleBuilder) for scales behind FTDI
/// USB-UART bridge chips, plus the [`models`](ftdi::models) the backend
/// knows how to match and configure.
#[cfg(feature = "ftdi")]
pub mod ftdi {
    pub use scalelink_ftdi::*;
}

/// Returns a flat list of all supported bridge definitions across the
/// enabled backends.
///
/// This is the entry point for applications that need to enumerate what
/// the library can talk to (e.g. for a device picker). Each backend is
/// gated behind its feature flag -- only models from enabled backends are
/// included.
///
/// # Example
///
/// ```
/// for bridge in scalelink::supported_bridges() {
///     println!("{bridge}");
/// }
/// ```
pub fn supported_bridges() -> Vec<ScaleInfo> {
    let mut bridges = Vec::new();

    #[cfg(feature = "ftdi")]
    {
        bridges.extend(
            ftdi::models::all_bridge_models()
                .iter()
                .map(ScaleInfo::from),
        );
    }

    bridges
}
