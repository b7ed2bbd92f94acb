//! FtdiScaleBuilder -- fluent builder for constructing [`FtdiScale`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! the device signature, retry policy, and latency timer before handing
//! over the bridge the scale will talk through.
//!
//! # Example
//!
//! ```no_run
//! use scalelink_ftdi::builder::FtdiScaleBuilder;
//! use scalelink_ftdi::models::ft232r;
//! use scalelink_test_harness::MockBridge;
//! use std::time::Duration;
//!
//! # fn example() -> scalelink_core::Result<()> {
//! let scale = FtdiScaleBuilder::new(ft232r())
//!     .retry_threshold(5)
//!     .retry_wait(Duration::from_secs(2))
//!     .build_with_bridge(MockBridge::new())?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use scalelink_core::bridge::{BridgeReader, UartBridge};
use scalelink_core::error::{Error, Result};
use scalelink_core::types::ScaleInfo;

use crate::models::BridgeModel;
use crate::scale::FtdiScale;

/// Fluent builder for [`FtdiScale`].
///
/// All configuration has sensible defaults derived from the
/// [`BridgeModel`], so the simplest usage is:
///
/// ```ignore
/// let scale = FtdiScaleBuilder::new(ft232r())
///     .build_with_bridge(bridge)?;
/// ```
pub struct FtdiScaleBuilder {
    model: BridgeModel,
    device_signature: Option<String>,
    retry_threshold: u32,
    retry_wait: Duration,
    reset_retries_on_success: bool,
    latency_ms: Option<u8>,
}

impl FtdiScaleBuilder {
    /// Create a new builder for the given bridge model.
    pub fn new(model: BridgeModel) -> Self {
        FtdiScaleBuilder {
            model,
            device_signature: None,
            retry_threshold: 3,
            retry_wait: Duration::from_secs(5),
            reset_retries_on_success: false,
            latency_ms: None,
        }
    }

    /// Override the USB product description the scale is matched and
    /// opened by.
    ///
    /// Use this when the scale vendor reprogrammed the bridge EEPROM's
    /// description away from the chip's factory default.
    pub fn device_signature(mut self, signature: &str) -> Self {
        self.device_signature = Some(signature.to_string());
        self
    }

    /// Set the number of failed attempts after which
    /// [`connect_with_retry`](scalelink_core::Scale::connect_with_retry)
    /// gives up (default: 3).
    pub fn retry_threshold(mut self, n: u32) -> Self {
        self.retry_threshold = n;
        self
    }

    /// Set the delay between connect attempts (default: 5s).
    pub fn retry_wait(mut self, wait: Duration) -> Self {
        self.retry_wait = wait;
        self
    }

    /// Reset the retry counter after a successful connect (default: false).
    ///
    /// The default preserves long-standing behavior where the counter only
    /// ever grows, so a reconnect after a disconnect starts partway toward
    /// the threshold. Enable this for hosts that reconnect many times in
    /// one process lifetime.
    pub fn reset_retries_on_success(mut self, enabled: bool) -> Self {
        self.reset_retries_on_success = enabled;
        self
    }

    /// Override the latency timer value programmed at connect time
    /// (default: the model's minimum).
    pub fn latency_ms(mut self, ms: u8) -> Self {
        self.latency_ms = Some(ms);
        self
    }

    /// Build an [`FtdiScale`] with a caller-provided bridge.
    ///
    /// This is the only entry point: this workspace ships no vendor
    /// driver binding, so the bridge is always supplied by the caller --
    /// a `MockBridge` from `scalelink-test-harness` in tests, or a host's
    /// own adapter over the vendor driver in production.
    pub fn build_with_bridge<B>(self, bridge: B) -> Result<FtdiScale>
    where
        B: UartBridge + 'static,
    {
        let signature = self
            .device_signature
            .unwrap_or_else(|| self.model.device_signature.to_string());
        if signature.is_empty() {
            return Err(Error::InvalidParameter(
                "device signature cannot be empty".into(),
            ));
        }

        let latency_ms = self.latency_ms.unwrap_or(self.model.min_latency_ms);
        if latency_ms == 0 {
            return Err(Error::InvalidParameter(
                "latency timer must be at least 1 ms".into(),
            ));
        }

        // One concrete bridge, two views: the manager keeps the full
        // control surface, the acquisition task only ever sees the
        // read-only one.
        let bridge = Arc::new(bridge);
        let reader: Arc<dyn BridgeReader> = bridge.clone();
        let bridge: Arc<dyn UartBridge> = bridge;

        let info = ScaleInfo {
            model_name: self.model.name.to_string(),
            device_signature: signature,
        };

        Ok(FtdiScale::new(
            bridge,
            reader,
            info,
            latency_ms,
            self.retry_threshold,
            self.retry_wait,
            self.reset_retries_on_success,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ft230x, ft232r};
    use scalelink_core::scale::Scale;
    use scalelink_test_harness::MockBridge;

    #[tokio::test]
    async fn builder_defaults() {
        let scale = FtdiScaleBuilder::new(ft232r())
            .build_with_bridge(MockBridge::new())
            .unwrap();

        assert_eq!(scale.info().model_name, "FT232R");
        assert_eq!(scale.info().device_signature, "FT232R USB UART");
        assert_eq!(scale.retry_count(), 0);
        assert!(scale.last_error().is_none());
    }

    #[tokio::test]
    async fn builder_custom_signature() {
        let mock = MockBridge::new();
        mock.add_device("ACME Scale 3000", "S3000001");

        let mut scale = FtdiScaleBuilder::new(ft232r())
            .device_signature("ACME Scale 3000")
            .build_with_bridge(mock.clone())
            .unwrap();

        assert_eq!(scale.info().device_signature, "ACME Scale 3000");
        // The override is what connect matches by.
        assert!(scale.connect().await.unwrap());
    }

    #[tokio::test]
    async fn builder_custom_latency() {
        let mock = MockBridge::new();
        mock.add_device("FT230X Basic UART", "DT04HJjX");

        let mut scale = FtdiScaleBuilder::new(ft230x())
            .latency_ms(16)
            .build_with_bridge(mock.clone())
            .unwrap();

        scale.connect().await.unwrap();
        assert_eq!(mock.latency_ms(), Some(16));
    }

    #[tokio::test]
    async fn builder_rejects_empty_signature() {
        let result = FtdiScaleBuilder::new(ft232r())
            .device_signature("")
            .build_with_bridge(MockBridge::new());

        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn builder_rejects_zero_latency() {
        let result = FtdiScaleBuilder::new(ft232r())
            .latency_ms(0)
            .build_with_bridge(MockBridge::new());

        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn builder_fluent_chain() {
        let scale = FtdiScaleBuilder::new(ft232r())
            .device_signature("FT232R USB UART")
            .retry_threshold(5)
            .retry_wait(Duration::from_millis(100))
            .reset_retries_on_success(true)
            .latency_ms(4)
            .build_with_bridge(MockBridge::new())
            .unwrap();

        assert_eq!(scale.info().model_name, "FT232R");
    }
}
