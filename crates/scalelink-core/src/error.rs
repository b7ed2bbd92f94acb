//! Error types for scalelink.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Connect-phase failures carry the exact
//! diagnostic strings the scale's deployed control software prints, because
//! host programs surface and match them verbatim.

/// The error type for all scalelink operations.
///
/// The first four variants are the connect-phase failures a host observes
/// through `last_error`. Their display strings are load-bearing and must
/// not be reworded -- including the misspelled enumeration message, which
/// is intentional.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Device enumeration reported zero attached devices.
    #[error("No devices to found.")]
    NoDevicesFound,

    /// Devices are attached, but none carries the supported description.
    #[error("Device not supported.")]
    UnsupportedDevice,

    /// A matching device was found but the driver refused to open it
    /// (typically because another process already claimed it).
    #[error("Error connecting to FTDI chip.")]
    OpenFailed,

    /// `connect_with_retry` reached its attempt threshold without a
    /// successful connection.
    #[error("Could not connect to the scale.")]
    RetryExhausted,

    /// No device session is open.
    #[error("not connected")]
    NotConnected,

    /// A status failure reported by the underlying bridge driver.
    #[error("bridge error: {0}")]
    Bridge(String),

    /// An invalid parameter was passed to a builder or bridge call.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_no_devices_found() {
        // The trailing period and the wording are part of the contract.
        let e = Error::NoDevicesFound;
        assert_eq!(e.to_string(), "No devices to found.");
    }

    #[test]
    fn error_display_unsupported_device() {
        let e = Error::UnsupportedDevice;
        assert_eq!(e.to_string(), "Device not supported.");
    }

    #[test]
    fn error_display_open_failed() {
        let e = Error::OpenFailed;
        assert_eq!(e.to_string(), "Error connecting to FTDI chip.");
    }

    #[test]
    fn error_display_retry_exhausted() {
        let e = Error::RetryExhausted;
        assert_eq!(e.to_string(), "Could not connect to the scale.");
    }

    #[test]
    fn error_display_not_connected() {
        let e = Error::NotConnected;
        assert_eq!(e.to_string(), "not connected");
    }

    #[test]
    fn error_display_bridge() {
        let e = Error::Bridge("FT_IO_ERROR".into());
        assert_eq!(e.to_string(), "bridge error: FT_IO_ERROR");
    }

    #[test]
    fn error_display_invalid_parameter() {
        let e = Error::InvalidParameter("latency timer must be at least 1 ms".into());
        assert_eq!(
            e.to_string(),
            "invalid parameter: latency timer must be at least 1 ms"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<Error>();
    }

    #[test]
    fn result_alias_works() {
        let ok: Result<u32> = Ok(42);
        match ok {
            Ok(val) => assert_eq!(val, 42),
            Err(_) => panic!("expected Ok"),
        }

        let err: Result<u32> = Err(Error::NoDevicesFound);
        assert!(err.is_err());
    }
}
