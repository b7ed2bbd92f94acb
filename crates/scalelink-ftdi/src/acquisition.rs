//! Acquisition task types and loop for the FTDI scale backend.
//!
//! This module defines the background task that turns the bridge's raw RX
//! stream into dispatched [`Reading`]s, plus the handle the connection
//! manager keeps for shutting it down.
//!
//! The task blocks on the data-ready signal, then runs one read cycle:
//! bytes-available query, exact-length read, text normalization, serial
//! lookup, dispatch. Transient driver anomalies (failed queries, short
//! reads, blank frames) abandon the cycle silently; the next signal starts
//! a fresh one.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use scalelink_core::bridge::BridgeReader;
use scalelink_core::events::{Reading, ReadingDispatcher};
use scalelink_core::helpers::normalize_reading;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything the acquisition loop needs, handed over at spawn time.
///
/// The loop holds only the [`BridgeReader`] view of the bridge, so it can
/// query, read, and identify the device but never open or close it.
pub(crate) struct AcquisitionContext {
    pub reader: Arc<dyn BridgeReader>,
    pub data_ready: Arc<Notify>,
    pub dispatcher: Arc<ReadingDispatcher>,
}

/// Handle to the acquisition task. Stored inside `FtdiScale`.
pub(crate) struct AcquisitionTask {
    /// Cancellation token for graceful shutdown.
    pub cancel: CancellationToken,
    /// Join handle for the spawned task.
    pub task: JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// Spawn
// ---------------------------------------------------------------------------

/// Spawn the acquisition task. Returns the handle for shutting it down.
///
/// The task runs until its token is cancelled; it never exits on its own
/// and never returns an error (read anomalies are absorbed per cycle).
pub(crate) fn spawn_acquisition_task(ctx: AcquisitionContext) -> AcquisitionTask {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();

    let task = tokio::spawn(acquisition_loop(ctx, cancel_clone));

    AcquisitionTask { cancel, task }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// The main acquisition loop. Runs as a spawned Tokio task.
///
/// Uses `tokio::select! { biased; }` to prioritize:
/// 1. Cancellation
/// 2. The data-ready signal
async fn acquisition_loop(ctx: AcquisitionContext, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("acquisition task cancelled");
                break;
            }

            _ = ctx.data_ready.notified() => {
                run_read_cycle(&ctx).await;
            }
        }
    }
}

/// One read cycle, triggered by a data-ready signal firing.
///
/// The signal is level-triggered and may fire spuriously or coalesce
/// several arrivals into one permit, so the cycle re-checks how much data
/// actually exists and reads all of it in one exact-length request.
async fn run_read_cycle(ctx: &AcquisitionContext) {
    let available = match ctx.reader.rx_bytes_available().await {
        Ok(n) => n,
        Err(e) => {
            debug!(error = %e, "bytes-available query failed, abandoning cycle");
            return;
        }
    };
    if available < 1 {
        return;
    }

    let mut buf = vec![0u8; available as usize];
    match ctx.reader.read(&mut buf).await {
        Ok(n) if n == buf.len() => {}
        Ok(n) => {
            debug!(requested = buf.len(), got = n, "short read, abandoning cycle");
            return;
        }
        Err(e) => {
            debug!(error = %e, "read failed, abandoning cycle");
            return;
        }
    }

    // Bare terminators and padding frames normalize to nothing.
    let Some(payload) = normalize_reading(&buf) else {
        return;
    };

    // Identity is best-effort: a failed query still dispatches the weight,
    // just anonymously.
    let device_id = ctx.reader.serial_number().await.unwrap_or_default();

    let reading = Reading { device_id, payload };
    debug!(payload = %reading.payload, "dispatching reading");
    ctx.dispatcher.dispatch(&reading);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use scalelink_core::bridge::UartBridge;
    use scalelink_test_harness::MockBridge;
    use std::time::Duration;
    use tokio::sync::mpsc;

    const SIGNATURE: &str = "FT232R USB UART";

    async fn open_mock() -> MockBridge {
        let mock = MockBridge::new();
        mock.add_device(SIGNATURE, "A5XK3RJT");
        mock.open_by_description(SIGNATURE).await.unwrap();
        mock
    }

    /// Dispatcher with one observer that forwards every reading into a
    /// channel the test can await on.
    fn capture_dispatcher() -> (Arc<ReadingDispatcher>, mpsc::UnboundedReceiver<Reading>) {
        let dispatcher = Arc::new(ReadingDispatcher::new());
        let (tx, rx) = mpsc::unbounded_channel();
        dispatcher.register(Box::new(move |reading| {
            let _ = tx.send(reading.clone());
        }));
        (dispatcher, rx)
    }

    fn context_for(mock: &MockBridge, dispatcher: Arc<ReadingDispatcher>) -> AcquisitionContext {
        AcquisitionContext {
            reader: Arc::new(mock.clone()),
            data_ready: Arc::new(Notify::new()),
            dispatcher,
        }
    }

    // =======================================================================
    // Read cycle (white-box, one cycle at a time)
    // =======================================================================

    #[tokio::test]
    async fn cycle_dispatches_normalized_reading() {
        let mock = open_mock().await;
        let (dispatcher, mut rx) = capture_dispatcher();
        let ctx = context_for(&mock, dispatcher);

        mock.push_reading(b"12.34 kg\r\n");
        run_read_cycle(&ctx).await;

        let reading = rx.try_recv().unwrap();
        assert_eq!(reading.device_id, "A5XK3RJT");
        assert_eq!(reading.payload, "12.34kg");
        assert_eq!(mock.rx_len(), 0, "cycle should drain the RX queue");
    }

    #[tokio::test]
    async fn cycle_with_no_data_dispatches_nothing() {
        let mock = open_mock().await;
        let (dispatcher, mut rx) = capture_dispatcher();
        let ctx = context_for(&mock, dispatcher);

        run_read_cycle(&ctx).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn blank_frame_is_discarded() {
        let mock = open_mock().await;
        let (dispatcher, mut rx) = capture_dispatcher();
        let ctx = context_for(&mock, dispatcher);

        mock.push_reading(b"\r\n");
        run_read_cycle(&ctx).await;

        assert!(rx.try_recv().is_err());
        assert_eq!(mock.rx_len(), 0, "blank bytes are consumed, not redelivered");
    }

    #[tokio::test]
    async fn failed_bytes_query_abandons_cycle() {
        let mock = open_mock().await;
        let (dispatcher, mut rx) = capture_dispatcher();
        let ctx = context_for(&mock, dispatcher);

        mock.push_reading(b"12.34 kg");
        mock.fail_rx_queries(true);
        run_read_cycle(&ctx).await;
        assert!(rx.try_recv().is_err());

        // Recovery: the data is still queued for the next cycle.
        mock.fail_rx_queries(false);
        run_read_cycle(&ctx).await;
        assert_eq!(rx.try_recv().unwrap().payload, "12.34kg");
    }

    #[tokio::test]
    async fn short_read_abandons_cycle() {
        let mock = open_mock().await;
        let (dispatcher, mut rx) = capture_dispatcher();
        let ctx = context_for(&mock, dispatcher);

        mock.push_reading(b"12.34 kg");
        mock.truncate_reads(3);
        run_read_cycle(&ctx).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_serial_query_dispatches_with_empty_id() {
        let mock = open_mock().await;
        let (dispatcher, mut rx) = capture_dispatcher();
        let ctx = context_for(&mock, dispatcher);

        mock.push_reading(b"98.7 kg\r\n");
        mock.fail_serial_queries(true);
        run_read_cycle(&ctx).await;

        let reading = rx.try_recv().unwrap();
        assert_eq!(reading.device_id, "");
        assert_eq!(reading.payload, "98.7kg");
    }

    // =======================================================================
    // Spawned task (black-box, through the data-ready signal)
    // =======================================================================

    #[tokio::test]
    async fn task_delivers_readings_in_order() {
        let mock = open_mock().await;
        let (dispatcher, mut rx) = capture_dispatcher();

        let data_ready = Arc::new(Notify::new());
        mock.register_event_notification(data_ready.clone())
            .await
            .unwrap();

        let task = spawn_acquisition_task(AcquisitionContext {
            reader: Arc::new(mock.clone()),
            data_ready,
            dispatcher,
        });

        mock.push_reading(b"1.0 kg\r\n");
        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.payload, "1.0kg");

        mock.push_reading(b"2.0 kg\r\n");
        let second = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.payload, "2.0kg");

        task.cancel.cancel();
        task.task.await.unwrap();
    }

    #[tokio::test]
    async fn task_tolerates_spurious_signal() {
        let mock = open_mock().await;
        let (dispatcher, mut rx) = capture_dispatcher();

        let data_ready = Arc::new(Notify::new());
        mock.register_event_notification(data_ready.clone())
            .await
            .unwrap();

        let task = spawn_acquisition_task(AcquisitionContext {
            reader: Arc::new(mock.clone()),
            data_ready,
            dispatcher,
        });

        // Signal with nothing queued, then a real arrival.
        mock.fire_data_ready();
        mock.push_reading(b"5.5 kg\r\n");

        let reading = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reading.payload, "5.5kg");

        task.cancel.cancel();
        task.task.await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_task_exits_and_stops_delivering() {
        let mock = open_mock().await;
        let (dispatcher, mut rx) = capture_dispatcher();

        let data_ready = Arc::new(Notify::new());
        mock.register_event_notification(data_ready.clone())
            .await
            .unwrap();

        let task = spawn_acquisition_task(AcquisitionContext {
            reader: Arc::new(mock.clone()),
            data_ready,
            dispatcher,
        });

        task.cancel.cancel();
        task.task.await.unwrap();

        mock.push_reading(b"3.3 kg\r\n");
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }
}
