//! Relay bit packing
//!
//! Relays are addressed as a flat list of booleans, index `i` being relay
//! `i`. On the wire the same state travels as one hexadecimal word where
//! bit `i` is relay `i`, zero-padded to `relay_count / 4` digits.
//!
//! Encoding keeps only the low `relay_count` bits. Anything above that is
//! dropped without error, so a 32 bit word sent to an 8 relay board only
//! drives the first 8 relays.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::BoardError;

/// Widest board the packed word can describe
pub const MAX_RELAYS: usize = 64;

/// Mask selecting the low `relay_count` bits
pub fn relay_mask(relay_count: usize) -> u64 {
    if relay_count >= MAX_RELAYS {
        u64::MAX
    } else {
        (1u64 << relay_count) - 1
    }
}

/// Minimum number of hex digits sent for `relay_count` relays
pub fn hex_width(relay_count: usize) -> usize {
    relay_count / 4
}

/// Pack a list of relay states into a word, bit `i` from entry `i`.
///
/// Entries past [`MAX_RELAYS`] cannot be represented and are ignored.
pub fn relay_word(bits: &[bool]) -> u64 {
    bits.iter()
        .take(MAX_RELAYS)
        .enumerate()
        .filter(|(_, on)| **on)
        .fold(0u64, |word, (i, _)| word | (1u64 << i))
}

/// Format a relay word for `relay writeall`: lower-case hex, no prefix
pub fn encode_relays(word: u64, relay_count: usize) -> String {
    format!(
        "{:0width$x}",
        word & relay_mask(relay_count),
        width = hex_width(relay_count)
    )
}

/// Expand a relay word into `relay_count` states
pub fn decode_relays(word: u64, relay_count: usize) -> RelayState {
    RelayState::from_word(word, relay_count)
}

/// State of every relay on a board, relay 0 first
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayState(Vec<bool>);

impl RelayState {
    /// All relays off
    pub fn all_off(relay_count: usize) -> Self {
        Self(vec![false; relay_count])
    }

    /// Expand the low `relay_count` bits of `word`
    pub fn from_word(word: u64, relay_count: usize) -> Self {
        Self(
            (0..relay_count)
                .map(|i| i < MAX_RELAYS && (word >> i) & 1 == 1)
                .collect(),
        )
    }

    /// Pack back into a wire word
    pub fn to_word(&self) -> u64 {
        relay_word(&self.0)
    }

    /// Number of relays
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the board has no relays
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// State of relay `index`, if it exists
    pub fn get(&self, index: usize) -> Option<bool> {
        self.0.get(index).copied()
    }

    /// Change one relay. Returns `false` if `index` is out of range.
    pub fn set(&mut self, index: usize, on: bool) -> bool {
        match self.0.get_mut(index) {
            Some(slot) => {
                *slot = on;
                true
            }
            None => false,
        }
    }

    /// Indices of the relays that are energized
    pub fn active(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, on)| on.then_some(i))
            .collect()
    }

    /// States as a slice, relay 0 first
    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// States as a vector, relay 0 first
    pub fn into_inner(self) -> Vec<bool> {
        self.0
    }
}

impl From<Vec<bool>> for RelayState {
    fn from(bits: Vec<bool>) -> Self {
        Self(bits)
    }
}

/// Values accepted by `set_relays`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayValues {
    /// One boolean per relay, relay 0 first
    Bits(Vec<bool>),
    /// One integer per relay; zero is off, anything else is on
    Levels(Vec<i64>),
    /// A pre-built wire word
    Word(u64),
}

impl RelayValues {
    /// The packed word, before truncation to the board width
    pub fn to_word(&self) -> u64 {
        match self {
            RelayValues::Bits(bits) => relay_word(bits),
            RelayValues::Levels(levels) => {
                let bits: Vec<bool> = levels.iter().map(|level| *level != 0).collect();
                relay_word(&bits)
            }
            RelayValues::Word(word) => *word,
        }
    }
}

impl From<Vec<bool>> for RelayValues {
    fn from(bits: Vec<bool>) -> Self {
        RelayValues::Bits(bits)
    }
}

impl From<&[bool]> for RelayValues {
    fn from(bits: &[bool]) -> Self {
        RelayValues::Bits(bits.to_vec())
    }
}

impl From<Vec<i64>> for RelayValues {
    fn from(levels: Vec<i64>) -> Self {
        RelayValues::Levels(levels)
    }
}

impl From<u64> for RelayValues {
    fn from(word: u64) -> Self {
        RelayValues::Word(word)
    }
}

impl From<RelayState> for RelayValues {
    fn from(state: RelayState) -> Self {
        RelayValues::Bits(state.into_inner())
    }
}

impl From<&RelayState> for RelayValues {
    fn from(state: &RelayState) -> Self {
        RelayValues::Bits(state.as_slice().to_vec())
    }
}

fn json_level(value: &Value) -> Result<i64, BoardError> {
    match value {
        Value::Bool(on) => Ok(i64::from(*on)),
        Value::Number(n) => n.as_i64().ok_or_else(|| {
            BoardError::InvalidArgument(format!("relay level must be an integer, got {}", n))
        }),
        Value::String(_) => Err(BoardError::InvalidArgument(
            "relay level can't be a string".to_string(),
        )),
        other => Err(BoardError::InvalidArgument(format!(
            "unsupported relay level: {}",
            other
        ))),
    }
}

/// Relay values from loosely-typed input such as a JSON request body.
///
/// Accepts a non-negative integer word or an array of booleans/integers.
/// Floats and strings are rejected.
impl TryFrom<&Value> for RelayValues {
    type Error = BoardError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Number(n) => n.as_u64().map(RelayValues::Word).ok_or_else(|| {
                BoardError::InvalidArgument(format!(
                    "relay word must be a non-negative integer, got {}",
                    n
                ))
            }),
            Value::String(_) => Err(BoardError::InvalidArgument(
                "relay setting can't be a string".to_string(),
            )),
            Value::Array(items) => {
                if items.iter().all(Value::is_boolean) {
                    let bits = items.iter().filter_map(Value::as_bool).collect();
                    return Ok(RelayValues::Bits(bits));
                }
                items
                    .iter()
                    .map(json_level)
                    .collect::<Result<Vec<_>, _>>()
                    .map(RelayValues::Levels)
            }
            other => Err(BoardError::InvalidArgument(format!(
                "unsupported relay setting: {}",
                other
            ))),
        }
    }
}
