//! Three-digit multiplexed 7-segment readout (common cathode).
//!
//! All slots share the segment lines, so only one slot may be lit at a time.
//! Every draw blanks the slots, sets the pattern, and only then enables the
//! target slot; a pattern written while a slot is still enabled would ghost
//! onto it.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as PinError, ErrorKind, OutputPin, PinState};
use thiserror::Error;

use crate::config::DISPLAY_CEILING;
use crate::sampling::WeightDisplay;

pub const SEGMENT_COUNT: usize = 7;
pub const SLOT_COUNT: usize = 3;

const ONES_SLOT: usize = 1;

/// Segment patterns for 0-9, bit 6 = a down to bit 0 = g.
/// Bit `i` drives segment line `i`.
pub const SEGMENT_PATTERNS: [u8; 10] = [
    0b1111110, // 0
    0b0110000, // 1
    0b1101101, // 2
    0b1111001, // 3
    0b0110011, // 4
    0b1011011, // 5
    0b1011111, // 6
    0b1110000, // 7
    0b1111111, // 8
    0b1111011, // 9
];

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    #[error("digit {0} has no 7-segment pattern")]
    DigitOutOfRange(i32),
    #[error("no digit slot at position {0}")]
    NoSuchSlot(usize),
    #[error("gpio error: {0}")]
    Pin(ErrorKind),
}

fn pin_fault<E: PinError>(err: E) -> DisplayError {
    DisplayError::Pin(err.kind())
}

/// Break a weight into tens, ones and tenths digits.
///
/// The value is clamped to `[0, 99]` first. The integer digits truncate; the
/// tenths digit is `floor((v - round(v)) * 10)` with ties rounded to even,
/// which goes negative whenever the fraction rounds up. Such a digit is a
/// `DigitOutOfRange` fault rather than a pattern.
pub fn split(value: f32) -> Result<[u8; 3], DisplayError> {
    let clamped = if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, DISPLAY_CEILING)
    };
    let whole = clamped as u8;
    let tenths = ((clamped - clamped.round_ties_even()) * 10.0).floor() as i32;
    if !(0..=9).contains(&tenths) {
        return Err(DisplayError::DigitOutOfRange(tenths));
    }
    Ok([whole / 10, whole % 10, tenths as u8])
}

pub struct SevenSegment<P, D> {
    segments: [P; SEGMENT_COUNT],
    digits: [P; SLOT_COUNT],
    point: P,
    delay: D,
    dwell_ms: u32,
}

impl<P, D> SevenSegment<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    /// Digit-select lines are active low. Starts with every slot off.
    pub fn new(
        segments: [P; SEGMENT_COUNT],
        digits: [P; SLOT_COUNT],
        point: P,
        delay: D,
        dwell_ms: u32,
    ) -> Result<Self, DisplayError> {
        let mut display = Self {
            segments,
            digits,
            point,
            delay,
            dwell_ms,
        };
        display.blank()?;
        display.point.set_low().map_err(pin_fault)?;
        Ok(display)
    }

    /// Turn every digit slot off. Segment lines keep their last pattern.
    pub fn blank(&mut self) -> Result<(), DisplayError> {
        for digit in self.digits.iter_mut() {
            digit.set_high().map_err(pin_fault)?;
        }
        Ok(())
    }

    /// Light `value` on slot `position` and leave it lit.
    pub fn display_digit(&mut self, value: u8, position: usize) -> Result<(), DisplayError> {
        self.draw(value, position, false)
    }

    fn draw(&mut self, value: u8, position: usize, point: bool) -> Result<(), DisplayError> {
        let pattern = *SEGMENT_PATTERNS
            .get(usize::from(value))
            .ok_or(DisplayError::DigitOutOfRange(i32::from(value)))?;
        if position >= SLOT_COUNT {
            return Err(DisplayError::NoSuchSlot(position));
        }

        self.blank()?;
        for (i, segment) in self.segments.iter_mut().enumerate() {
            let lit = (pattern >> i) & 1 == 1;
            segment.set_state(PinState::from(lit)).map_err(pin_fault)?;
        }
        self.point.set_state(PinState::from(point)).map_err(pin_fault)?;
        self.digits[position].set_low().map_err(pin_fault)
    }

    /// One refresh pass over all three slots. The decimal point sits after
    /// the ones digit. The caller has to keep calling this to avoid flicker.
    pub fn show_number(&mut self, value: f32) -> Result<(), DisplayError> {
        let digits = split(value)?;
        for (position, digit) in digits.into_iter().enumerate() {
            self.draw(digit, position, position == ONES_SLOT)?;
            self.delay.delay_ms(self.dwell_ms);
        }
        Ok(())
    }
}

impl<P, D> WeightDisplay for SevenSegment<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    fn show_number(&mut self, value: f32) -> Result<(), DisplayError> {
        SevenSegment::show_number(self, value)
    }
}
