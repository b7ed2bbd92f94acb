//! The [`Scale`] trait -- consumer-facing surface of a scale session.
//!
//! Host programs hold a `Box<dyn Scale>` (or a concrete backend type such
//! as `FtdiScale` from `scalelink-ftdi`) and drive the session lifecycle:
//! register observers, connect with retry, inspect `last_error` on failure,
//! and dispose at shutdown.

use async_trait::async_trait;

use crate::error::Result;
use crate::events::ReadingObserver;
use crate::types::ScaleInfo;

/// A USB-serial scale session.
///
/// Connection state (`retry_count`, `last_error`) belongs to the session
/// object and is mutated only through `connect` / `connect_with_retry` on
/// the caller's task; the background acquisition task never touches it.
#[async_trait]
pub trait Scale: Send + Sync {
    /// Static identity of this session (bridge model and the device
    /// signature it matches on).
    fn info(&self) -> &ScaleInfo;

    /// Make a single connection attempt: enumerate devices, match the
    /// supported description, open, start acquisition, reset the input
    /// path, and minimize read latency.
    ///
    /// Returns `Ok(open)` where `open` is the bridge's reported open state
    /// after the sequence, or a typed error for the enumeration/matching/
    /// open failures. Either way, a failure's display text is retained in
    /// [`last_error`](Scale::last_error) and logged.
    async fn connect(&mut self) -> Result<bool>;

    /// Connect with bounded retries: at most `threshold + 1` attempts with
    /// a fixed delay between them. The delay suspends the calling task
    /// rather than blocking a worker thread.
    ///
    /// Returns `Ok(())` on the first successful attempt (with no delay
    /// incurred), or [`Error::RetryExhausted`](crate::Error::RetryExhausted)
    /// once the threshold is reached.
    async fn connect_with_retry(&mut self) -> Result<()>;

    /// Diagnostic text of the most recent connect-phase failure, if any.
    fn last_error(&self) -> Option<String>;

    /// Failed-attempt counter driving the retry threshold. Whether a
    /// successful connect resets it is a backend configuration choice.
    fn retry_count(&self) -> u32;

    /// Register a reading observer. Observers are invoked synchronously,
    /// in registration order, once per emitted reading.
    fn register_observer(&self, observer: ReadingObserver);

    /// Tear down the session: stop the acquisition task, close the bridge,
    /// release the data-ready signal. Safe to call before any connect and
    /// safe to call repeatedly.
    async fn dispose(&mut self);
}
