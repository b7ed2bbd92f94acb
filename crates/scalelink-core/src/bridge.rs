//! Bridge traits for scale communication.
//!
//! [`UartBridge`] abstracts over the vendor USB-serial bridge driver
//! (D2XX-style: enumeration by product description, event-notified reads,
//! input-task control, buffer purge, latency timer). [`BridgeReader`] is
//! its read-only subset, which is all the acquisition loop is handed -- the
//! loop can poll, read, and identify the open device but can never open,
//! close, or reconfigure the session.
//!
//! The only implementation shipped in this workspace is `MockBridge` from
//! the `scalelink-test-harness` crate; production hosts supply an adapter
//! over the vendor driver. Driver calls are thread-safe per the vendor's
//! documentation, so all methods take `&self` and the session handle is
//! shared between the connection manager and the acquisition task via
//! `Arc`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::Result;
use crate::types::DeviceInfo;

/// Read-only surface of an open bridge session.
///
/// This is the capability bundle the acquisition loop runs against. Every
/// method reports driver status as a `Result`; the loop treats any error
/// as a transient hardware hiccup and abandons the current read cycle.
#[async_trait]
pub trait BridgeReader: Send + Sync {
    /// Number of bytes currently buffered in the driver's RX queue.
    async fn rx_bytes_available(&self) -> Result<u32>;

    /// Read up to `buf.len()` bytes into `buf`, returning the number of
    /// bytes actually read. A short read is not an error at this layer;
    /// the caller decides whether partial data is acceptable.
    async fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Serial identifier of the currently open device.
    async fn serial_number(&self) -> Result<String>;
}

/// Full control surface of the bridge driver.
///
/// Held exclusively by the connection manager. The supertrait split keeps
/// "the loop never re-opens or re-closes the handle" a type-level fact
/// rather than a convention.
#[async_trait]
pub trait UartBridge: BridgeReader {
    /// Number of bridge devices attached to the host.
    async fn device_count(&self) -> Result<u32>;

    /// Full descriptor table of attached devices.
    async fn list_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Open the device whose product description equals `description`.
    async fn open_by_description(&self, description: &str) -> Result<()>;

    /// Associate `signal` with the driver's "RX character available"
    /// condition. The driver keeps the handle and calls
    /// [`Notify::notify_one`] whenever receive bytes become buffered.
    ///
    /// The signal is level-style: a notification means data *may* be
    /// available, not that a complete transmission is.
    async fn register_event_notification(&self, signal: Arc<Notify>) -> Result<()>;

    /// Stop the driver's input task prior to a buffer purge.
    async fn stop_in_task(&self) -> Result<()>;

    /// Restart the driver's input task after a buffer purge.
    async fn restart_in_task(&self) -> Result<()>;

    /// Purge both RX and TX buffers.
    async fn purge(&self) -> Result<()>;

    /// Set the device read latency timer in milliseconds. Lower values
    /// make short transmissions surface sooner at the cost of more USB
    /// scheduling overhead.
    async fn set_latency_timer(&self, ms: u8) -> Result<()>;

    /// Close the device session.
    async fn close(&self) -> Result<()>;

    /// Whether a device session is currently open.
    fn is_open(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both traits are used as trait objects (`Arc<dyn UartBridge>` in the
    // manager, `Arc<dyn BridgeReader>` in the loop), so they must stay
    // object safe.
    #[test]
    fn bridge_traits_are_object_safe() {
        fn assert_reader(_: Option<&dyn BridgeReader>) {}
        fn assert_bridge(_: Option<&dyn UartBridge>) {}
        assert_reader(None);
        assert_bridge(None);
    }
}
