//! Device name normalization
//!
//! The board stores an 8 character alphanumeric identifier. Names are
//! filtered, left-padded with `'0'` and truncated before being sent.

/// Length of the identifier stored in the board's EEPROM
pub const DEVICE_NAME_LEN: usize = 8;

/// Normalize a requested name to the form the board accepts.
///
/// Drops every character that is not an ASCII letter or digit, left-pads
/// the remainder with `'0'` to [`DEVICE_NAME_LEN`] and keeps the first
/// [`DEVICE_NAME_LEN`] characters.
pub fn normalize_device_name(name: &str) -> String {
    let kept: String = name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let padded = format!("{:0>width$}", kept, width = DEVICE_NAME_LEN);
    padded.chars().take(DEVICE_NAME_LEN).collect()
}
