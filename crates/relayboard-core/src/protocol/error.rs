//! Protocol errors

use std::fmt;

use thiserror::Error;

/// Which family of auxiliary pins a port index refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    /// Digital GPIO pin
    Gpio,
    /// Analog input channel
    Adc,
    /// Relay channel
    Relay,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortKind::Gpio => write!(f, "GPIO"),
            PortKind::Adc => write!(f, "ADC"),
            PortKind::Relay => write!(f, "relay"),
        }
    }
}

/// Failures of the byte-level serial link
#[derive(Error, Debug)]
pub enum TransportError {
    /// A bounded read returned no bytes
    #[error("Read timed out with no data")]
    Timeout,

    /// Error reported by the serial port driver
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Read or write failed at the OS level
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serialport::Error> for TransportError {
    fn from(err: serialport::Error) -> Self {
        TransportError::Serial(err.to_string())
    }
}

/// Errors that can occur while talking to a relay board
#[derive(Error, Debug)]
pub enum BoardError {
    /// The port could not be opened
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Operation on a handle that failed to open or was closed
    #[error("Not connected to relay board")]
    NotConnected,

    /// GPIO, ADC or relay index out of range
    #[error("Invalid {kind} port: {port}")]
    InvalidPort {
        /// Pin family the index was meant for
        kind: PortKind,
        /// Rejected index
        port: u32,
    },

    /// Input of the wrong shape or type
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The serial link failed or timed out
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The board replied with something unexpected
    #[error("Malformed response to '{command}': {reason}")]
    MalformedResponse {
        /// Command whose reply failed to parse
        command: String,
        /// What was wrong with the reply
        reason: String,
    },
}

impl BoardError {
    pub(crate) fn malformed(command: &str, reason: impl Into<String>) -> Self {
        BoardError::MalformedResponse {
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether draining the line and repeating the exchange may succeed.
    ///
    /// Caller mistakes (bad ports, bad arguments) and handle lifecycle errors
    /// are never retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BoardError::Transport(_) | BoardError::MalformedResponse { .. }
        )
    }
}
