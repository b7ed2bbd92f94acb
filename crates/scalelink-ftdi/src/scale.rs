//! FtdiScale -- the [`Scale`] trait implementation for FTDI-bridged scales.
//!
//! This module ties device discovery and session setup over a
//! [`UartBridge`] to the background acquisition task to produce a working
//! scale backend. It owns the connect/retry state machine, the data-ready
//! signal, and the lifecycle of the acquisition task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use scalelink_core::bridge::{BridgeReader, UartBridge};
use scalelink_core::error::{Error, Result};
use scalelink_core::events::{ReadingDispatcher, ReadingObserver};
use scalelink_core::scale::Scale;
use scalelink_core::types::ScaleInfo;

use crate::acquisition::{spawn_acquisition_task, AcquisitionContext, AcquisitionTask};

/// A scale reached through an FTDI-style UART bridge.
///
/// Constructed via [`FtdiScaleBuilder`](crate::builder::FtdiScaleBuilder).
/// All device communication goes through the [`UartBridge`] provided at
/// build time; readings fan out through observers registered with
/// [`register_observer`](Scale::register_observer).
pub struct FtdiScale {
    bridge: Arc<dyn UartBridge>,
    /// Read-only view of the same bridge, handed to the acquisition task.
    reader: Arc<dyn BridgeReader>,
    dispatcher: Arc<ReadingDispatcher>,
    info: ScaleInfo,
    latency_ms: u8,
    retry_threshold: u32,
    retry_wait: Duration,
    reset_retries_on_success: bool,
    /// Data-ready signal shared with the driver and the acquisition task.
    /// Created on the first connect and kept across reconnects so the
    /// running task never waits on a stale signal.
    data_ready: Option<Arc<Notify>>,
    acquisition: Option<AcquisitionTask>,
    retry_count: u32,
    last_error: Option<String>,
}

impl Drop for FtdiScale {
    fn drop(&mut self) {
        if let Some(task) = &self.acquisition {
            // Graceful: signal the loop to exit at the next select iteration.
            task.cancel.cancel();
            // Safety net: abort in case the task is stuck in a driver wait
            // that doesn't respect the cancellation token.
            task.task.abort();
        }
    }
}

impl FtdiScale {
    /// Create a new `FtdiScale` from its constituent parts.
    ///
    /// This is called by [`FtdiScaleBuilder`](crate::builder::FtdiScaleBuilder);
    /// callers should use the builder API instead.
    pub(crate) fn new(
        bridge: Arc<dyn UartBridge>,
        reader: Arc<dyn BridgeReader>,
        info: ScaleInfo,
        latency_ms: u8,
        retry_threshold: u32,
        retry_wait: Duration,
        reset_retries_on_success: bool,
    ) -> Self {
        FtdiScale {
            bridge,
            reader,
            dispatcher: Arc::new(ReadingDispatcher::new()),
            info,
            latency_ms,
            retry_threshold,
            retry_wait,
            reset_retries_on_success,
            data_ready: None,
            acquisition: None,
            retry_count: 0,
            last_error: None,
        }
    }

    /// Record a failed connect step: capture the display text for
    /// [`last_error`](Scale::last_error) and hand the error back for
    /// propagation.
    fn connect_failed(&mut self, err: Error) -> Error {
        warn!(error = %err, "connect attempt failed");
        self.last_error = Some(err.to_string());
        err
    }
}

/// The `last_error` text left behind between retry attempts.
fn retrying_message(attempt: u32, threshold: u32) -> String {
    format!("Connection failed. Retrying ({attempt} of {threshold})...")
}

#[async_trait]
impl Scale for FtdiScale {
    fn info(&self) -> &ScaleInfo {
        &self.info
    }

    async fn connect(&mut self) -> Result<bool> {
        // Discovery. A failed count query reads as zero devices and a
        // failed list query as an empty table -- the driver's status codes
        // don't distinguish "nothing attached" from "enumeration hiccup",
        // and the retry layer re-enumerates either way.
        let count = self.bridge.device_count().await.unwrap_or(0);
        if count < 1 {
            return Err(self.connect_failed(Error::NoDevicesFound));
        }

        let devices = self.bridge.list_devices().await.unwrap_or_default();
        let device = devices
            .iter()
            .find(|d| d.description == self.info.device_signature)
            .cloned();
        let Some(device) = device else {
            return Err(self.connect_failed(Error::UnsupportedDevice));
        };

        if self
            .bridge
            .open_by_description(&device.description)
            .await
            .is_err()
        {
            return Err(self.connect_failed(Error::OpenFailed));
        }
        debug!(serial = %device.serial_number, "bridge opened");

        // Wire the data-ready signal. Reusing the existing one keeps an
        // already-running acquisition task listening on the right object.
        let data_ready = self
            .data_ready
            .get_or_insert_with(|| Arc::new(Notify::new()))
            .clone();
        let _ = self
            .bridge
            .register_event_notification(Arc::clone(&data_ready))
            .await;

        if self.acquisition.is_none() {
            self.acquisition = Some(spawn_acquisition_task(AcquisitionContext {
                reader: Arc::clone(&self.reader),
                data_ready,
                dispatcher: Arc::clone(&self.dispatcher),
            }));
        }

        // Input path reset: stop the driver's input task, drop whatever
        // stale bytes accumulated, restart. The driver occasionally
        // reports a transient failure on the task controls; it always
        // succeeds shortly after, so busy-retry with a scheduler yield.
        while self.bridge.stop_in_task().await.is_err() {
            tokio::task::yield_now().await;
        }
        let _ = self.bridge.purge().await;
        while self.bridge.restart_in_task().await.is_err() {
            tokio::task::yield_now().await;
        }

        let _ = self.bridge.set_latency_timer(self.latency_ms).await;

        Ok(self.bridge.is_open())
    }

    async fn connect_with_retry(&mut self) -> Result<()> {
        loop {
            self.last_error = None;

            let open = self.connect().await.unwrap_or(false);
            if open {
                debug!(device = %self.info, "scale connected");
                if self.reset_retries_on_success {
                    self.retry_count = 0;
                }
                return Ok(());
            }

            if self.retry_count >= self.retry_threshold {
                let err = Error::RetryExhausted;
                error!(
                    attempts = self.retry_count + 1,
                    "giving up on scale connection"
                );
                self.last_error = Some(err.to_string());
                return Err(err);
            }

            self.retry_count += 1;
            warn!(
                attempt = self.retry_count,
                threshold = self.retry_threshold,
                wait = ?self.retry_wait,
                "connect failed, retrying after delay"
            );
            self.last_error = Some(retrying_message(self.retry_count, self.retry_threshold));
            tokio::time::sleep(self.retry_wait).await;
        }
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn register_observer(&self, observer: ReadingObserver) {
        self.dispatcher.register(observer);
    }

    async fn dispose(&mut self) {
        if let Some(task) = self.acquisition.take() {
            task.cancel.cancel();
            task.task.abort();
            let _ = task.task.await;
        }
        if self.bridge.is_open() {
            let _ = self.bridge.close().await;
        }
        self.data_ready = None;
        debug!("scale disposed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
