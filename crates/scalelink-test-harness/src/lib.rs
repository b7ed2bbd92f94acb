//! Test doubles for exercising scalelink without scale hardware.
//!
//! The harness provides [`MockBridge`], an in-memory [`UartBridge`]
//! implementation with a scripted device table, an RX byte queue, and
//! failure-injection hooks. It backs the crate test suites and the
//! test application's `--mock` mode.
//!
//! [`UartBridge`]: scalelink_core::bridge::UartBridge

pub mod mock_bridge;

pub use mock_bridge::MockBridge;
