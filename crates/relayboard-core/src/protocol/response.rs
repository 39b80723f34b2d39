//! Reply parsing
//!
//! The board echoes every command before answering, and separates lines
//! with any mix of `\r` and `\n`. A reply is split into its non-blank
//! lines, the `>` prompt is discarded, the first line must be the echo of
//! the command that was sent and the following line carries the payload.

use serde::{Deserialize, Serialize};

use super::{BoardError, Command, ADC_MAX_RAW, ADC_REFERENCE_VOLTS};

const PROMPT: char = '>';

/// Non-blank reply lines with terminators, padding and prompts removed
fn reply_lines(command: &Command, raw: &[u8]) -> Result<Vec<String>, BoardError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| BoardError::malformed(&command.echo(), format!("not ASCII: {}", e)))?;

    Ok(text
        .split(['\r', '\n'])
        .map(|line| line.trim().trim_start_matches(PROMPT).trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Lines that follow the command echo
fn after_echo(command: &Command, raw: &[u8]) -> Result<Vec<String>, BoardError> {
    let echo = command.echo();
    let mut lines = reply_lines(command, raw)?.into_iter();

    match lines.next() {
        Some(first) if first == echo => Ok(lines.collect()),
        Some(first) => Err(BoardError::malformed(
            &echo,
            format!("expected echo, got {:?}", first),
        )),
        None => Err(BoardError::malformed(&echo, "empty reply")),
    }
}

/// The single payload token of a reply
pub fn payload(command: &Command, raw: &[u8]) -> Result<String, BoardError> {
    let mut rest = after_echo(command, raw)?;
    match rest.len() {
        1 => Ok(rest.remove(0)),
        0 => Err(BoardError::malformed(&command.echo(), "missing payload")),
        n => Err(BoardError::malformed(
            &command.echo(),
            format!("expected one payload line, got {}", n),
        )),
    }
}

/// Check the reply of a command that carries no payload.
///
/// Only the echo is required; anything the firmware prints after it is
/// ignored.
pub fn check_ack(command: &Command, raw: &[u8]) -> Result<(), BoardError> {
    after_echo(command, raw).map(|_| ())
}

/// Reply to `id get`
pub fn parse_device_name(raw: &[u8]) -> Result<String, BoardError> {
    payload(&Command::GetId, raw)
}

/// Reply to `gpio read`: `1` is high, `0` is low
pub fn parse_gpio(command: &Command, raw: &[u8]) -> Result<bool, BoardError> {
    let token = payload(command, raw)?;
    match token.as_str() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(BoardError::malformed(
            &command.echo(),
            format!("invalid GPIO level {:?}", other),
        )),
    }
}

/// Reply to `adc read`: decimal 10 bit sample
pub fn parse_adc(command: &Command, raw: &[u8]) -> Result<u16, BoardError> {
    let token = payload(command, raw)?;
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(BoardError::malformed(
            &command.echo(),
            format!("invalid ADC sample {:?}", token),
        ));
    }
    match token.parse::<u16>() {
        Ok(value) if value <= ADC_MAX_RAW => Ok(value),
        _ => Err(BoardError::malformed(
            &command.echo(),
            format!("ADC sample {} out of range", token),
        )),
    }
}

/// Reply to `relay readall`: hexadecimal relay word
pub fn parse_relay_word(raw: &[u8]) -> Result<u64, BoardError> {
    let command = Command::RelayReadAll;
    let token = payload(&command, raw)?;
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(BoardError::malformed(
            &command.echo(),
            format!("invalid relay word {:?}", token),
        ));
    }
    u64::from_str_radix(&token, 16).map_err(|e| {
        BoardError::malformed(&command.echo(), format!("relay word {:?}: {}", token, e))
    })
}

/// Convert a raw sample to volts against the fixed reference
pub fn adc_to_volts(raw: u16) -> f64 {
    f64::from(raw) / f64::from(ADC_MAX_RAW) * ADC_REFERENCE_VOLTS
}

/// An ADC sample, either as read or scaled to volts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AdcReading {
    /// 10 bit sample, 0..=1023
    Raw(u16),
    /// Pin voltage
    Volts(f64),
}

impl AdcReading {
    /// Keep the sample as-is when `as_raw`, otherwise convert to volts
    pub fn new(raw: u16, as_raw: bool) -> Self {
        if as_raw {
            AdcReading::Raw(raw)
        } else {
            AdcReading::Volts(adc_to_volts(raw))
        }
    }

    /// The reading in volts regardless of how it was requested
    pub fn volts(&self) -> f64 {
        match self {
            AdcReading::Raw(raw) => adc_to_volts(*raw),
            AdcReading::Volts(volts) => *volts,
        }
    }
}
