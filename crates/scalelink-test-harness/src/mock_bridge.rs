//! Mock bridge for deterministic testing without scale hardware.
//!
//! [`MockBridge`] implements [`UartBridge`] over plain in-memory state:
//! a scripted device table, an RX byte queue, and failure-injection knobs
//! for the open call and the input-task controls. Cloning the bridge
//! yields another handle to the same state, so a test keeps one handle for
//! scripting while the scale under test owns the other.
//!
//! # Example
//!
//! ```
//! use scalelink_test_harness::MockBridge;
//!
//! let mock = MockBridge::new();
//! mock.add_device("FT232R USB UART", "A5XK3RJT");
//! let handle = mock.clone();
//! // hand `mock` to the scale builder, script through `handle`:
//! handle.push_reading(b"12.34 kg\r\n");
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Notify;

use scalelink_core::bridge::{BridgeReader, UartBridge};
use scalelink_core::error::{Error, Result};
use scalelink_core::types::DeviceInfo;

#[derive(Default)]
struct MockState {
    devices: Vec<DeviceInfo>,
    open: bool,
    open_serial: String,
    signal: Option<Arc<Notify>>,
    rx: VecDeque<u8>,

    // Failure injection.
    open_failures_remaining: u32,
    stop_failures_remaining: u32,
    restart_failures_remaining: u32,
    fail_rx_queries: bool,
    fail_serial_queries: bool,
    fail_device_count: bool,
    fail_list_devices: bool,
    read_limit: Option<usize>,

    // Call accounting for asserting connect-sequence side effects.
    device_count_queries: u32,
    open_attempts: u32,
    stop_attempts: u32,
    restart_attempts: u32,
    purge_count: u32,
    close_count: u32,
    latency_ms: Option<u8>,
}

/// A mock [`UartBridge`] with a scripted device table and failure knobs.
///
/// All handles obtained via [`Clone`] share one state, mirroring how the
/// real driver exposes one device session to every caller.
#[derive(Clone, Default)]
pub struct MockBridge {
    state: Arc<Mutex<MockState>>,
}

impl MockBridge {
    /// Create a mock with no attached devices and no open session.
    pub fn new() -> Self {
        MockBridge::default()
    }

    /// Attach a device to the enumeration table.
    pub fn add_device(&self, description: &str, serial_number: &str) {
        self.lock()
            .devices
            .push(DeviceInfo::new(description, serial_number));
    }

    /// Fail the next `n` open calls with a driver status error.
    pub fn fail_open_times(&self, n: u32) {
        self.lock().open_failures_remaining = n;
    }

    /// Fail the next `n` stop-input-task calls before succeeding.
    pub fn fail_stop_in_task_times(&self, n: u32) {
        self.lock().stop_failures_remaining = n;
    }

    /// Fail the next `n` restart-input-task calls before succeeding.
    pub fn fail_restart_in_task_times(&self, n: u32) {
        self.lock().restart_failures_remaining = n;
    }

    /// Make every bytes-available query report a driver failure.
    pub fn fail_rx_queries(&self, enabled: bool) {
        self.lock().fail_rx_queries = enabled;
    }

    /// Make every serial-number query report a driver failure.
    pub fn fail_serial_queries(&self, enabled: bool) {
        self.lock().fail_serial_queries = enabled;
    }

    /// Make every device-count query report a driver failure.
    pub fn fail_device_count(&self, enabled: bool) {
        self.lock().fail_device_count = enabled;
    }

    /// Make every device-list query report a driver failure.
    pub fn fail_list_devices(&self, enabled: bool) {
        self.lock().fail_list_devices = enabled;
    }

    /// Truncate every read to at most `limit` bytes, so a full-length read
    /// request comes back short.
    pub fn truncate_reads(&self, limit: usize) {
        self.lock().read_limit = Some(limit);
    }

    /// Queue `bytes` in the RX buffer and fire the registered data-ready
    /// signal, as the driver does when characters arrive.
    pub fn push_reading(&self, bytes: &[u8]) {
        let signal = {
            let mut state = self.lock();
            state.rx.extend(bytes.iter().copied());
            state.signal.clone()
        };
        if let Some(signal) = signal {
            signal.notify_one();
        }
    }

    /// Fire the data-ready signal without queueing any bytes (a spurious
    /// wakeup).
    pub fn fire_data_ready(&self) {
        let signal = self.lock().signal.clone();
        if let Some(signal) = signal {
            signal.notify_one();
        }
    }

    /// Whether a data-ready signal has been registered.
    pub fn signal_registered(&self) -> bool {
        self.lock().signal.is_some()
    }

    /// Number of device-count queries made so far. Each connect attempt
    /// starts with exactly one, so this doubles as an attempt counter.
    pub fn device_count_queries(&self) -> u32 {
        self.lock().device_count_queries
    }

    /// Number of open calls made so far.
    pub fn open_attempts(&self) -> u32 {
        self.lock().open_attempts
    }

    /// Number of stop-input-task calls made so far.
    pub fn stop_attempts(&self) -> u32 {
        self.lock().stop_attempts
    }

    /// Number of restart-input-task calls made so far.
    pub fn restart_attempts(&self) -> u32 {
        self.lock().restart_attempts
    }

    /// Number of buffer purges performed so far.
    pub fn purge_count(&self) -> u32 {
        self.lock().purge_count
    }

    /// Number of close calls performed so far.
    pub fn close_count(&self) -> u32 {
        self.lock().close_count
    }

    /// The most recently configured latency timer, if any.
    pub fn latency_ms(&self) -> Option<u8> {
        self.lock().latency_ms
    }

    /// Number of bytes still queued in the RX buffer.
    pub fn rx_len(&self) -> usize {
        self.lock().rx.len()
    }

    // A panicking test can poison the lock; recover so the remaining
    // assertions still run.
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BridgeReader for MockBridge {
    async fn rx_bytes_available(&self) -> Result<u32> {
        let state = self.lock();
        if state.fail_rx_queries {
            return Err(Error::Bridge("FT_IO_ERROR".into()));
        }
        if !state.open {
            return Err(Error::NotConnected);
        }
        Ok(state.rx.len() as u32)
    }

    async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.lock();
        if !state.open {
            return Err(Error::NotConnected);
        }
        let mut n = buf.len().min(state.rx.len());
        if let Some(limit) = state.read_limit {
            n = n.min(limit);
        }
        for slot in buf.iter_mut().take(n) {
            // Guarded by the length computation above.
            *slot = state.rx.pop_front().unwrap_or_default();
        }
        Ok(n)
    }

    async fn serial_number(&self) -> Result<String> {
        let state = self.lock();
        if state.fail_serial_queries {
            return Err(Error::Bridge("FT_IO_ERROR".into()));
        }
        if !state.open {
            return Err(Error::NotConnected);
        }
        Ok(state.open_serial.clone())
    }
}

#[async_trait]
impl UartBridge for MockBridge {
    async fn device_count(&self) -> Result<u32> {
        let mut state = self.lock();
        state.device_count_queries += 1;
        if state.fail_device_count {
            return Err(Error::Bridge("FT_IO_ERROR".into()));
        }
        Ok(state.devices.len() as u32)
    }

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let state = self.lock();
        if state.fail_list_devices {
            return Err(Error::Bridge("FT_IO_ERROR".into()));
        }
        Ok(state.devices.clone())
    }

    async fn open_by_description(&self, description: &str) -> Result<()> {
        let mut state = self.lock();
        state.open_attempts += 1;
        if state.open_failures_remaining > 0 {
            state.open_failures_remaining -= 1;
            return Err(Error::Bridge("FT_DEVICE_NOT_OPENED".into()));
        }
        match state.devices.iter().find(|d| d.description == description) {
            Some(device) => {
                state.open_serial = device.serial_number.clone();
                state.open = true;
                Ok(())
            }
            None => Err(Error::Bridge("FT_DEVICE_NOT_FOUND".into())),
        }
    }

    async fn register_event_notification(&self, signal: Arc<Notify>) -> Result<()> {
        let mut state = self.lock();
        if !state.open {
            return Err(Error::NotConnected);
        }
        state.signal = Some(signal);
        Ok(())
    }

    async fn stop_in_task(&self) -> Result<()> {
        let mut state = self.lock();
        state.stop_attempts += 1;
        if state.stop_failures_remaining > 0 {
            state.stop_failures_remaining -= 1;
            return Err(Error::Bridge("FT_OTHER_ERROR".into()));
        }
        Ok(())
    }

    async fn restart_in_task(&self) -> Result<()> {
        let mut state = self.lock();
        state.restart_attempts += 1;
        if state.restart_failures_remaining > 0 {
            state.restart_failures_remaining -= 1;
            return Err(Error::Bridge("FT_OTHER_ERROR".into()));
        }
        Ok(())
    }

    async fn purge(&self) -> Result<()> {
        let mut state = self.lock();
        state.purge_count += 1;
        state.rx.clear();
        Ok(())
    }

    async fn set_latency_timer(&self, ms: u8) -> Result<()> {
        self.lock().latency_ms = Some(ms);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.lock();
        state.close_count += 1;
        state.open = false;
        state.open_serial.clear();
        // The event association dies with the handle.
        state.signal = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.lock().open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const SIGNATURE: &str = "FT232R USB UART";

    async fn open_mock() -> MockBridge {
        let mock = MockBridge::new();
        mock.add_device(SIGNATURE, "A5XK3RJT");
        mock.open_by_description(SIGNATURE).await.unwrap();
        mock
    }

    #[tokio::test]
    async fn enumeration_reflects_scripted_devices() {
        let mock = MockBridge::new();
        assert_eq!(mock.device_count().await.unwrap(), 0);

        mock.add_device(SIGNATURE, "A5XK3RJT");
        mock.add_device("Other Device", "B0000001");

        assert_eq!(mock.device_count().await.unwrap(), 2);
        let devices = mock.list_devices().await.unwrap();
        assert_eq!(devices[0].description, SIGNATURE);
        assert_eq!(devices[1].serial_number, "B0000001");
        assert_eq!(mock.device_count_queries(), 2);
    }

    #[tokio::test]
    async fn open_matches_description_and_exposes_serial() {
        let mock = open_mock().await;
        assert!(mock.is_open());
        assert_eq!(mock.serial_number().await.unwrap(), "A5XK3RJT");
    }

    #[tokio::test]
    async fn open_unknown_description_errors() {
        let mock = MockBridge::new();
        mock.add_device(SIGNATURE, "A5XK3RJT");

        let result = mock.open_by_description("FT245R USB FIFO").await;
        assert!(matches!(result, Err(Error::Bridge(_))));
        assert!(!mock.is_open());
    }

    #[tokio::test]
    async fn injected_open_failures_are_consumed_in_order() {
        let mock = MockBridge::new();
        mock.add_device(SIGNATURE, "A5XK3RJT");
        mock.fail_open_times(2);

        assert!(mock.open_by_description(SIGNATURE).await.is_err());
        assert!(mock.open_by_description(SIGNATURE).await.is_err());
        assert!(mock.open_by_description(SIGNATURE).await.is_ok());
        assert_eq!(mock.open_attempts(), 3);
    }

    #[tokio::test]
    async fn push_reading_queues_bytes_and_fires_signal() {
        let mock = open_mock().await;
        let signal = Arc::new(Notify::new());
        mock.register_event_notification(signal.clone())
            .await
            .unwrap();

        let handle = mock.clone();
        handle.push_reading(b"12.34 kg");

        // The permit was stored, so this resolves immediately.
        tokio::time::timeout(Duration::from_secs(1), signal.notified())
            .await
            .expect("data-ready signal never fired");

        assert_eq!(mock.rx_bytes_available().await.unwrap(), 8);
        let mut buf = [0u8; 8];
        let n = mock.read(&mut buf).await.unwrap();
        assert_eq!(n, 8);
        assert_eq!(&buf, b"12.34 kg");
        assert_eq!(mock.rx_len(), 0);
    }

    #[tokio::test]
    async fn truncated_read_comes_back_short() {
        let mock = open_mock().await;
        mock.push_reading(b"12.34 kg");
        mock.truncate_reads(3);

        let mut buf = [0u8; 8];
        let n = mock.read(&mut buf).await.unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf[..n], b"12.");
    }

    #[tokio::test]
    async fn stop_and_restart_failure_counts() {
        let mock = open_mock().await;
        mock.fail_stop_in_task_times(2);

        assert!(mock.stop_in_task().await.is_err());
        assert!(mock.stop_in_task().await.is_err());
        assert!(mock.stop_in_task().await.is_ok());
        assert_eq!(mock.stop_attempts(), 3);

        mock.fail_restart_in_task_times(1);
        assert!(mock.restart_in_task().await.is_err());
        assert!(mock.restart_in_task().await.is_ok());
        assert_eq!(mock.restart_attempts(), 2);
    }

    #[tokio::test]
    async fn purge_discards_queued_bytes() {
        let mock = open_mock().await;
        mock.push_reading(b"stale");
        assert_eq!(mock.rx_len(), 5);

        mock.purge().await.unwrap();
        assert_eq!(mock.rx_len(), 0);
        assert_eq!(mock.purge_count(), 1);
    }

    #[tokio::test]
    async fn close_ends_the_session() {
        let mock = open_mock().await;
        mock.close().await.unwrap();

        assert!(!mock.is_open());
        assert_eq!(mock.close_count(), 1);
        assert!(matches!(
            mock.serial_number().await,
            Err(Error::NotConnected)
        ));
        let mut buf = [0u8; 4];
        assert!(matches!(mock.read(&mut buf).await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let mock = MockBridge::new();
        let handle = mock.clone();
        handle.add_device(SIGNATURE, "A5XK3RJT");

        assert_eq!(mock.device_count().await.unwrap(), 1);
        mock.open_by_description(SIGNATURE).await.unwrap();
        assert!(handle.is_open());
    }

    #[tokio::test]
    async fn latency_timer_is_recorded() {
        let mock = open_mock().await;
        assert_eq!(mock.latency_ms(), None);
        mock.set_latency_timer(2).await.unwrap();
        assert_eq!(mock.latency_ms(), Some(2));
    }
}
