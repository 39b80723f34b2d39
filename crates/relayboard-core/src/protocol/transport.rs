//! Serial transport
//!
//! The board session only needs a byte pipe with a bounded read. The
//! [`Transport`] trait captures that, and [`SerialTransport`] provides it
//! on top of the `serialport` crate.

use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use super::TransportError;

/// Byte-oriented, timeout-bounded duplex link to one board
pub trait Transport: Send {
    /// Write all of `data`, returning the number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Read up to `max_bytes`, waiting at most the link's read timeout.
    ///
    /// Returns an empty buffer if nothing arrived before the timeout.
    fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError>;

    /// Release the underlying device
    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Serial port wrapper implementing [`Transport`]
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    timeout: Duration,
}

impl SerialTransport {
    /// Open `name` as 8N1 without flow control
    pub fn open(name: &str, baud_rate: u32, timeout: Duration) -> Result<Self, TransportError> {
        let port = serialport::new(name, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(timeout)
            .open()?;

        Ok(Self::new(port, timeout))
    }

    /// Wrap an already-open port
    pub fn new(port: Box<dyn SerialPort>, timeout: Duration) -> Self {
        Self {
            port: Some(port),
            timeout,
        }
    }

    /// Name reported by the operating system, if any
    pub fn name(&self) -> Option<String> {
        self.port.as_ref().and_then(|p| p.name())
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port
            .as_mut()
            .ok_or_else(|| TransportError::Serial("port is closed".to_string()))
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let port = self.port_mut()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(data.len())
    }

    /// Keeps reading until `max_bytes` arrived or the timeout elapsed,
    /// since the board dribbles its reply out over several USB frames.
    fn read(&mut self, max_bytes: usize) -> Result<Vec<u8>, TransportError> {
        let deadline = Instant::now() + self.timeout;
        let port = self.port_mut()?;
        let mut buffer = vec![0u8; max_bytes];
        let mut filled = 0;

        while filled < max_bytes {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            port.set_timeout(remaining)?;

            match port.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref e)
                    if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock =>
                {
                    break
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Io(e)),
            }
        }

        buffer.truncate(filled);
        Ok(buffer)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        // Dropping the handle closes the OS file descriptor
        self.port = None;
        Ok(())
    }
}
