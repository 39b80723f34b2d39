//! # Relayboard Core Library
//!
//! Host-side driver for USB relay/GPIO/ADC expansion boards.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Command encoding for the board's line-oriented ASCII protocol
//! - Reply parsing into typed values
//! - Relay bit packing between boolean lists and the hex wire word
//! - A board session that sequences commands over a serial transport
//!
//! ## Supported Boards
//!
//! - Numato-style USB relay modules (4, 8, 16 and 32 channels)
//!
//! ## Example
//!
//! ```rust,no_run
//! use relayboard_core::board::{Board, BoardConfig};
//!
//! # fn main() -> Result<(), relayboard_core::protocol::BoardError> {
//! let mut board = Board::try_open(BoardConfig::new("/dev/ttyACM0", 16))?;
//! board.clear_buffer()?;
//!
//! // Relays 0, 3 and 7 on
//! board.set_relays(0x89u64)?;
//! println!("relays: {:?}", board.get_relays()?.active());
//! println!("ADC 0: {:.2} V", board.read_adc_volts(0)?);
//!
//! board.close()?;
//! # Ok(())
//! # }
//! ```

pub mod board;
pub mod pins;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::board::{Board, BoardConfig, BoardState};
    pub use crate::pins::{PinMapping, PIN_MAP};
    pub use crate::protocol::{
        AdcReading, BoardError, Command, RelayState, RelayValues, SerialTransport, Transport,
        TransportError,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
