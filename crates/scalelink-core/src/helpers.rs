//! Payload normalization helpers.
//!
//! The scale transmits opaque text delimited only by the driver's own
//! buffering, so the sole protocol-level treatment this library applies is
//! whitespace hygiene: a transmission like `"  12.34 kg\r\n"` becomes the
//! payload `"12.34kg"`, and pure-whitespace noise is rejected before it can
//! become an event.

/// Normalize one raw transmission into a reading payload.
///
/// Decodes `raw` as UTF-8 (invalid sequences become U+FFFD), strips leading
/// and trailing whitespace, then removes every remaining interior space
/// character. Interior whitespace other than plain spaces (tabs, embedded
/// line breaks) is left alone. Returns `None` when nothing printable
/// remains -- that is hardware-notification noise, not a reading.
///
/// Normalization is idempotent: feeding a returned payload back through
/// yields the same payload.
///
/// # Example
///
/// ```
/// use scalelink_core::normalize_reading;
///
/// assert_eq!(normalize_reading(b"12.34 kg\r\n"), Some("12.34kg".to_string()));
/// assert_eq!(normalize_reading(b"   \r\n"), None);
/// ```
pub fn normalize_reading(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let normalized: String = text.trim().chars().filter(|&c| c != ' ').collect();
    if normalized.trim().is_empty() {
        None
    } else {
        Some(normalized)
    }
}
