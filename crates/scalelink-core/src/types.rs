//! Core types used throughout scalelink.

use std::fmt;

/// One entry from the bridge driver's device table.
///
/// The `description` field is the USB product description string stored in
/// the bridge chip's EEPROM. Factory defaults identify the chip model
/// (e.g. `"FT232R USB UART"`); scale vendors sometimes reprogram it, which
/// is why the matching signature is configurable at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Human-readable USB product description.
    pub description: String,
    /// Device serial identifier (e.g. `"A5XK3RJT"`).
    pub serial_number: String,
}

impl DeviceInfo {
    /// Convenience constructor used by bridge implementations and tests.
    pub fn new(description: &str, serial_number: &str) -> Self {
        DeviceInfo {
            description: description.to_string(),
            serial_number: serial_number.to_string(),
        }
    }
}

/// Identity of a scale session, reported by [`Scale::info`](crate::Scale::info).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleInfo {
    /// Bridge model name (e.g. `"FT232R"`).
    pub model_name: String,
    /// Device description this session matches and opens by.
    pub device_signature: String,
}

impl fmt::Display for ScaleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.model_name, self.device_signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_info_new() {
        let info = DeviceInfo::new("FT232R USB UART", "A5XK3RJT");
        assert_eq!(info.description, "FT232R USB UART");
        assert_eq!(info.serial_number, "A5XK3RJT");
    }

    #[test]
    fn scale_info_display() {
        let info = ScaleInfo {
            model_name: "FT232R".into(),
            device_signature: "FT232R USB UART".into(),
        };
        assert_eq!(info.to_string(), "FT232R (FT232R USB UART)");
    }
}
