//! Auxiliary header pinout
//!
//! Where each GPIO and ADC channel comes out on the board's 10 pin
//! auxiliary header. Several pins double as GPIO and ADC inputs.

use serde::Serialize;

/// One pin of the auxiliary header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PinMapping {
    /// Physical header pin, 1-based
    pub pin: u8,
    /// GPIO number driven/read by `gpio` commands
    pub gpio: u8,
    /// ADC channel sharing the pin, if any
    pub adc: Option<u8>,
}

const fn pin(pin: u8, gpio: u8, adc: Option<u8>) -> PinMapping {
    PinMapping { pin, gpio, adc }
}

/// Header pinout, pin 1 first
pub const PIN_MAP: [PinMapping; 10] = [
    pin(1, 0, Some(0)),
    pin(2, 1, Some(1)),
    pin(3, 2, None),
    pin(4, 3, None),
    pin(5, 4, None),
    pin(6, 5, None),
    pin(7, 6, None),
    pin(8, 7, Some(2)),
    pin(9, 8, Some(3)),
    pin(10, 9, Some(4)),
];

/// ADC channel that shares a pin with `gpio`
pub fn adc_channel_for_gpio(gpio: u8) -> Option<u8> {
    PIN_MAP.iter().find(|p| p.gpio == gpio).and_then(|p| p.adc)
}

/// GPIO number that shares a pin with ADC `channel`
pub fn gpio_for_adc(channel: u8) -> Option<u8> {
    PIN_MAP
        .iter()
        .find(|p| p.adc == Some(channel))
        .map(|p| p.gpio)
}

/// Mapping for a physical header pin
pub fn header_pin(pin: u8) -> Option<&'static PinMapping> {
    PIN_MAP.iter().find(|p| p.pin == pin)
}
