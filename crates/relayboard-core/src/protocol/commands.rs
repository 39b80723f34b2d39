//! Protocol commands
//!
//! Defines the ASCII commands understood by the relay board firmware.
//! Every command is a single line terminated by a carriage return; the
//! board echoes it back before sending its reply.

use std::fmt;

use super::{
    device_name::normalize_device_name, relay::encode_relays, BoardError, PortKind, ADC_COUNT,
    GPIO_COUNT,
};

/// A fully-validated board command, ready to be written to the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read the programmed device name (`id get`)
    GetId,

    /// Program a new device name (`id set`), already normalized
    SetId(String),

    /// Read the level of a GPIO pin (`gpio read`)
    GpioRead(u8),

    /// Drive a GPIO pin high (`gpio set`)
    GpioSet(u8),

    /// Drive a GPIO pin low (`gpio clear`)
    GpioClear(u8),

    /// Sample an ADC channel (`adc read`)
    AdcRead(u8),

    /// Read every relay as one hex word (`relay readall`)
    RelayReadAll,

    /// Write every relay from one hex word (`relay writeall`)
    RelayWriteAll(String),
}

fn check_port(kind: PortKind, port: u32, limit: u8) -> Result<u8, BoardError> {
    if port < u32::from(limit) {
        Ok(port as u8)
    } else {
        Err(BoardError::InvalidPort { kind, port })
    }
}

impl Command {
    /// `id set` with the name normalized to the board's 8-character form
    pub fn set_id(name: &str) -> Self {
        Command::SetId(normalize_device_name(name))
    }

    /// `gpio read` for pin 0..=9
    pub fn gpio_read(port: u32) -> Result<Self, BoardError> {
        check_port(PortKind::Gpio, port, GPIO_COUNT).map(Command::GpioRead)
    }

    /// `gpio set` when `high`, `gpio clear` otherwise
    pub fn gpio_write(port: u32, high: bool) -> Result<Self, BoardError> {
        let port = check_port(PortKind::Gpio, port, GPIO_COUNT)?;
        Ok(if high {
            Command::GpioSet(port)
        } else {
            Command::GpioClear(port)
        })
    }

    /// `adc read` for channel 0..=4
    pub fn adc_read(port: u32) -> Result<Self, BoardError> {
        check_port(PortKind::Adc, port, ADC_COUNT).map(Command::AdcRead)
    }

    /// `relay writeall` for a packed relay word on a board with `relay_count` relays
    pub fn relay_write_all(word: u64, relay_count: usize) -> Self {
        Command::RelayWriteAll(encode_relays(word, relay_count))
    }

    /// The exact text sent to the board, terminator included
    pub fn encode(&self) -> String {
        match self {
            Command::GetId => "id get\r".to_string(),
            Command::SetId(name) => format!("id set {}\r", name),
            // The firmware wants the extra newline before the terminator here
            Command::GpioRead(port) => format!("gpio read {}\n\r", port),
            Command::GpioSet(port) => format!("gpio set {} \r", port),
            Command::GpioClear(port) => format!("gpio clear {} \r", port),
            Command::AdcRead(port) => format!("adc read {}\r", port),
            Command::RelayReadAll => "relay readall\r".to_string(),
            Command::RelayWriteAll(hex) => format!("relay writeall {}\r", hex),
        }
    }

    /// Encoded command as raw bytes for the transport
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode().into_bytes()
    }

    /// The line the board echoes back, with whitespace and terminators stripped
    pub fn echo(&self) -> String {
        self.encode().trim().to_string()
    }

    /// Whether the reply carries a payload the caller is waiting for
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            Command::GetId | Command::GpioRead(_) | Command::AdcRead(_) | Command::RelayReadAll
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.echo())
    }
}
