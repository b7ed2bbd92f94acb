//! FTDI bridge model definitions.
//!
//! Each supported UART bridge chip is described by a [`BridgeModel`] struct
//! that captures the USB product description its EEPROM ships with and the
//! lowest latency-timer value the chip accepts. These are compile-time
//! constants used by the connection manager to match enumerated devices and
//! to program the read latency down for prompt weight reporting.
//!
//! Models are defined as factory functions (e.g. [`ft232r()`]) that return
//! a fully populated [`BridgeModel`]. The following chips are supported:
//!
//! | Model  | Factory USB description | Min latency |
//! |--------|-------------------------|-------------|
//! | FT232R | `FT232R USB UART`       | 2 ms        |
//! | FT230X | `FT230X Basic UART`     | 2 ms        |
//! | FT245R | `FT245R USB FIFO`       | 2 ms        |

use scalelink_core::types::ScaleInfo;

/// Static model definition for an FTDI-style UART bridge chip.
///
/// Contains the information needed to find and configure a scale behind a
/// specific bridge chip: the description string to match during device
/// enumeration and the floor value for the chip's latency timer.
#[derive(Debug, Clone)]
pub struct BridgeModel {
    /// Human-readable chip name (e.g. "FT232R").
    pub name: &'static str,
    /// Factory USB product description stored in the chip's EEPROM.
    ///
    /// Device matching compares enumerated descriptions against this
    /// string. Scale vendors sometimes reprogram the EEPROM; override the
    /// signature through the builder for those units.
    pub device_signature: &'static str,
    /// Lowest latency-timer value the chip accepts, in milliseconds.
    ///
    /// The driver holds received bytes until the latency timer expires, so
    /// the connect sequence programs the timer down to this floor to keep
    /// short weight strings from sitting in the chip's buffer.
    pub min_latency_ms: u8,
}

impl From<&BridgeModel> for ScaleInfo {
    fn from(model: &BridgeModel) -> Self {
        ScaleInfo {
            model_name: model.name.to_string(),
            device_signature: model.device_signature.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Model definitions
// ---------------------------------------------------------------------------

/// FT232R model definition.
///
/// The FT232R is FTDI's ubiquitous single-channel USB-to-UART bridge and
/// the chip found in most serial scale heads. It integrates the USB
/// transceiver, EEPROM, and clock on one die, so vendors rarely bother
/// reprogramming the factory description.
///
/// Key properties:
/// - Factory USB description: `FT232R USB UART`
/// - Latency timer: 2-255 ms, programmed down to 2 ms
pub fn ft232r() -> BridgeModel {
    BridgeModel {
        name: "FT232R",
        device_signature: "FT232R USB UART",
        min_latency_ms: 2,
    }
}

/// FT230X model definition.
///
/// The FT230X is the cost-reduced successor to the FT232R, common in newer
/// scale designs. Functionally identical from the driver's point of view;
/// only the factory description string differs.
///
/// Key properties:
/// - Factory USB description: `FT230X Basic UART`
/// - Latency timer: 2-255 ms, programmed down to 2 ms
pub fn ft230x() -> BridgeModel {
    BridgeModel {
        name: "FT230X",
        device_signature: "FT230X Basic UART",
        min_latency_ms: 2,
    }
}

/// FT245R model definition.
///
/// The FT245R presents a parallel FIFO rather than a UART on the device
/// side. A few industrial scale indicators use it; over USB it enumerates
/// and reads exactly like its UART siblings.
///
/// Key properties:
/// - Factory USB description: `FT245R USB FIFO`
/// - Latency timer: 2-255 ms, programmed down to 2 ms
pub fn ft245r() -> BridgeModel {
    BridgeModel {
        name: "FT245R",
        device_signature: "FT245R USB FIFO",
        min_latency_ms: 2,
    }
}

/// Returns a list of all supported bridge model definitions.
///
/// Useful for building selection UIs or iterating over known chips when
/// probing an unidentified scale.
pub fn all_bridge_models() -> Vec<BridgeModel> {
    vec![ft232r(), ft230x(), ft245r()]
}
