//! Board session
//!
//! A [`Board`] owns the transport to one relay board together with its
//! geometry, and sequences commands over the half-duplex line: write one
//! command, do one bounded read, parse the reply. Operations take
//! `&mut self`, so one handle can never interleave two exchanges.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::protocol::{
    normalize_device_name,
    relay::MAX_RELAYS,
    response::{check_ack, parse_adc, parse_device_name, parse_gpio, parse_relay_word},
    AdcReading, BoardError, Command, PortKind, RelayState, RelayValues, SerialTransport, Transport,
    TransportError, DEFAULT_BAUD_RATE, DEFAULT_DRAIN_RETRIES, DEFAULT_READ_SIZE,
    DEFAULT_TIMEOUT_MS, DRAIN_READ_SIZE,
};

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_read_size() -> usize {
    DEFAULT_READ_SIZE
}

fn default_drain_read_size() -> usize {
    DRAIN_READ_SIZE
}

/// Per-board configuration, fixed when the board is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Serial port name (e.g., "/dev/ttyACM0" or "COM6")
    pub port_name: String,
    /// Number of relays fitted on the board
    pub relay_count: usize,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Bounded read timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Bytes requested when reading a command reply
    #[serde(default = "default_read_size")]
    pub read_size: usize,
    /// Bytes requested per read while draining the line
    #[serde(default = "default_drain_read_size")]
    pub drain_read_size: usize,
}

impl BoardConfig {
    /// Configuration with the firmware's default line settings
    pub fn new(port_name: impl Into<String>, relay_count: usize) -> Self {
        Self {
            port_name: port_name.into(),
            relay_count,
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            read_size: DEFAULT_READ_SIZE,
            drain_read_size: DRAIN_READ_SIZE,
        }
    }

    /// Parse a configuration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, BoardError> {
        let config: BoardConfig = serde_json::from_str(json)
            .map_err(|e| BoardError::InvalidArgument(format!("board config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BoardError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BoardError::InvalidArgument(format!("reading {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Check the geometry and line settings
    pub fn validate(&self) -> Result<(), BoardError> {
        if self.relay_count == 0 || self.relay_count > MAX_RELAYS {
            return Err(BoardError::InvalidArgument(format!(
                "relay_count must be between 1 and {}, got {}",
                MAX_RELAYS, self.relay_count
            )));
        }
        if self.baud_rate == 0 {
            return Err(BoardError::InvalidArgument("baud_rate must be non-zero".to_string()));
        }
        if self.read_size == 0 || self.drain_read_size == 0 {
            return Err(BoardError::InvalidArgument("read sizes must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Bounded read timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Lifecycle of a board handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardState {
    /// Port open, commands may be sent
    Connected,
    /// Opening failed; the handle can't be used
    Failed {
        /// Why the port could not be opened
        reason: String,
    },
    /// Closed by the caller
    Closed,
}

/// Session with one relay board
pub struct Board {
    config: BoardConfig,
    transport: Option<Box<dyn Transport>>,
    state: BoardState,
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Board {
    /// Open the serial port named in `config`.
    ///
    /// Never fails outright: if the port can't be opened the handle comes
    /// back in [`BoardState::Failed`] and every operation on it returns
    /// [`BoardError::NotConnected`].
    pub fn open(config: BoardConfig) -> Self {
        Self::open_with(config, |config| {
            let transport =
                SerialTransport::open(&config.port_name, config.baud_rate, config.timeout())?;
            Ok(Box::new(transport) as Box<dyn Transport>)
        })
    }

    /// Like [`Board::open`], with a custom transport factory
    pub fn open_with<F>(config: BoardConfig, opener: F) -> Self
    where
        F: FnOnce(&BoardConfig) -> Result<Box<dyn Transport>, TransportError>,
    {
        let opened = match config.validate() {
            Ok(()) => opener(&config).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match opened {
            Ok(transport) => {
                tracing::debug!(
                    port = %config.port_name,
                    relays = config.relay_count,
                    "relay board connected"
                );
                Self {
                    config,
                    transport: Some(transport),
                    state: BoardState::Connected,
                }
            }
            Err(reason) => {
                tracing::warn!(port = %config.port_name, %reason, "failed to open relay board");
                Self {
                    config,
                    transport: None,
                    state: BoardState::Failed { reason },
                }
            }
        }
    }

    /// Open the board, reporting failure as [`BoardError::ConnectionFailed`]
    pub fn try_open(config: BoardConfig) -> Result<Self, BoardError> {
        config.validate()?;
        Self::open(config).into_connected()
    }

    /// Build a connected session around an existing transport
    pub fn with_transport(
        config: BoardConfig,
        transport: Box<dyn Transport>,
    ) -> Result<Self, BoardError> {
        config.validate()?;
        Ok(Self {
            config,
            transport: Some(transport),
            state: BoardState::Connected,
        })
    }

    /// Turn a failed handle into its [`BoardError::ConnectionFailed`]
    pub fn into_connected(self) -> Result<Self, BoardError> {
        match &self.state {
            BoardState::Connected => Ok(self),
            BoardState::Failed { reason } => Err(BoardError::ConnectionFailed(reason.clone())),
            BoardState::Closed => Err(BoardError::NotConnected),
        }
    }

    /// Close the port. The handle is unusable afterwards.
    pub fn close(&mut self) -> Result<(), BoardError> {
        let mut transport = self.transport.take().ok_or(BoardError::NotConnected)?;
        self.state = BoardState::Closed;
        tracing::debug!(port = %self.config.port_name, "closing relay board");
        transport.close()?;
        Ok(())
    }

    /// Current lifecycle state
    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// Whether commands can be sent
    pub fn is_connected(&self) -> bool {
        self.state == BoardState::Connected
    }

    /// Configuration the board was opened with
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Serial port the board was opened on
    pub fn port_name(&self) -> &str {
        &self.config.port_name
    }

    /// Number of relays on the board
    pub fn relay_count(&self) -> usize {
        self.config.relay_count
    }

    fn transport(&mut self) -> Result<&mut Box<dyn Transport>, BoardError> {
        match self.state {
            BoardState::Connected => self.transport.as_mut().ok_or(BoardError::NotConnected),
            _ => Err(BoardError::NotConnected),
        }
    }

    /// Write one command and perform one bounded read for its reply
    fn exchange(&mut self, command: &Command) -> Result<Vec<u8>, BoardError> {
        let read_size = self.config.read_size;
        let transport = self.transport()?;

        let bytes = command.to_bytes();
        tracing::debug!(command = %command, "sending");
        transport.write(&bytes)?;

        let reply = transport.read(read_size)?;
        tracing::trace!(
            command = %command,
            len = reply.len(),
            reply = ?String::from_utf8_lossy(&reply),
            "received"
        );
        if reply.is_empty() {
            return Err(TransportError::Timeout.into());
        }
        Ok(reply)
    }

    /// Drain stray bytes with the default retry limit
    pub fn clear_buffer(&mut self) -> Result<bool, BoardError> {
        self.clear_buffer_with(DEFAULT_DRAIN_RETRIES)
    }

    /// Read until the line is quiet.
    ///
    /// Returns `true` as soon as a read comes back empty, or `false` once
    /// `retry_limit + 1` reads in a row returned data.
    pub fn clear_buffer_with(&mut self, retry_limit: usize) -> Result<bool, BoardError> {
        let read_size = self.config.drain_read_size;
        let transport = self.transport()?;

        for attempt in 0..=retry_limit {
            let stray = transport.read(read_size)?;
            if stray.is_empty() {
                tracing::debug!(attempt = attempt + 1, "buffer clear");
                return Ok(true);
            }
            tracing::trace!(attempt = attempt + 1, len = stray.len(), "drained stray bytes");
        }

        tracing::warn!(retry_limit, "buffer still dirty after draining");
        Ok(false)
    }

    /// Programmed device name
    pub fn get_device_name(&mut self) -> Result<String, BoardError> {
        let raw = self.exchange(&Command::GetId)?;
        parse_device_name(&raw)
    }

    /// Program a new device name, returning the normalized name that was sent
    pub fn set_device_name(&mut self, name: &str) -> Result<String, BoardError> {
        let normalized = normalize_device_name(name);
        let command = Command::SetId(normalized.clone());
        let raw = self.exchange(&command)?;
        check_ack(&command, &raw)?;
        Ok(normalized)
    }

    /// Level of a GPIO pin (0..=9)
    pub fn read_gpio(&mut self, port: u32) -> Result<bool, BoardError> {
        let command = Command::gpio_read(port)?;
        let raw = self.exchange(&command)?;
        parse_gpio(&command, &raw)
    }

    /// Drive a GPIO pin (0..=9) high or low
    pub fn set_gpio(&mut self, port: u32, high: bool) -> Result<(), BoardError> {
        let command = Command::gpio_write(port, high)?;
        let raw = self.exchange(&command)?;
        check_ack(&command, &raw)
    }

    /// Sample an ADC channel (0..=4), raw or converted to volts
    pub fn get_adc(&mut self, port: u32, raw: bool) -> Result<AdcReading, BoardError> {
        let command = Command::adc_read(port)?;
        let reply = self.exchange(&command)?;
        let sample = parse_adc(&command, &reply)?;
        Ok(AdcReading::new(sample, raw))
    }

    /// Raw 10 bit sample of an ADC channel (0..=4)
    pub fn read_adc_raw(&mut self, port: u32) -> Result<u16, BoardError> {
        let command = Command::adc_read(port)?;
        let reply = self.exchange(&command)?;
        parse_adc(&command, &reply)
    }

    /// Voltage on an ADC channel (0..=4)
    pub fn read_adc_volts(&mut self, port: u32) -> Result<f64, BoardError> {
        self.get_adc(port, false).map(|reading| reading.volts())
    }

    /// State of every relay, `relay_count` entries long
    pub fn get_relays(&mut self) -> Result<RelayState, BoardError> {
        let raw = self.exchange(&Command::RelayReadAll)?;
        let word = parse_relay_word(&raw)?;
        Ok(RelayState::from_word(word, self.config.relay_count))
    }

    /// Set every relay at once.
    ///
    /// Entries or bits beyond `relay_count` are dropped. Returns the state
    /// that was written.
    pub fn set_relays(&mut self, values: impl Into<RelayValues>) -> Result<RelayState, BoardError> {
        let relay_count = self.config.relay_count;
        let word = values.into().to_word();
        let command = Command::relay_write_all(word, relay_count);
        let raw = self.exchange(&command)?;
        check_ack(&command, &raw)?;
        Ok(RelayState::from_word(word, relay_count))
    }

    /// Switch a single relay, leaving the others as the board reports them
    pub fn set_relay(&mut self, index: usize, on: bool) -> Result<RelayState, BoardError> {
        if index >= self.config.relay_count {
            return Err(BoardError::InvalidPort {
                kind: PortKind::Relay,
                port: u32::try_from(index).unwrap_or(u32::MAX),
            });
        }
        let mut state = self.get_relays()?;
        state.set(index, on);
        self.set_relays(&state)
    }
}
