//! Relay Board Serial Protocol
//!
//! Implements the line-oriented ASCII protocol spoken by USB relay/GPIO/ADC
//! expansion boards: command formatting, reply parsing and relay bit packing.
//!
//! Everything here is pure translation except [`transport`], which moves
//! the bytes.

pub mod commands;
pub mod device_name;
mod error;
pub mod relay;
pub mod response;
pub mod transport;

pub use commands::Command;
pub use device_name::{normalize_device_name, DEVICE_NAME_LEN};
pub use error::{BoardError, PortKind, TransportError};
pub use relay::{decode_relays, encode_relays, relay_word, RelayState, RelayValues};
pub use response::{adc_to_volts, AdcReading};
pub use transport::{SerialTransport, Transport};

/// Baud rate the board firmware runs at
pub const DEFAULT_BAUD_RATE: u32 = 19200;

/// Default timeout for a bounded read in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Bytes requested per command reply; covers every reply shape
pub const DEFAULT_READ_SIZE: usize = 100;

/// Bytes requested per read while draining stray input
pub const DRAIN_READ_SIZE: usize = 50;

/// Non-empty reads tolerated by a drain before giving up
pub const DEFAULT_DRAIN_RETRIES: usize = 10;

/// Number of GPIO pins (0..=9)
pub const GPIO_COUNT: u8 = 10;

/// Number of ADC channels (0..=4)
pub const ADC_COUNT: u8 = 5;

/// Full-scale value of the 10 bit ADC
pub const ADC_MAX_RAW: u16 = 1023;

/// ADC reference voltage. Fixed by the board, not read from hardware.
pub const ADC_REFERENCE_VOLTS: f64 = 3.3;
