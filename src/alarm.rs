//! Over-weight alarm: a buzzer and an LED switched together.

use embedded_hal::digital::{Error as PinError, ErrorKind, OutputPin, PinState};
use thiserror::Error;

/// Derived from the latest weight on every sample, never remembered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlarmState {
    Clear,
    Tripped,
}

impl AlarmState {
    /// Trips strictly above `threshold`. A weight equal to it stays clear.
    pub fn evaluate(weight: f32, threshold: f32) -> Self {
        if weight > threshold {
            AlarmState::Tripped
        } else {
            AlarmState::Clear
        }
    }

    pub fn is_tripped(self) -> bool {
        self == AlarmState::Tripped
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AlarmError {
    #[error("gpio error: {0}")]
    Pin(ErrorKind),
}

fn pin_fault<E: PinError>(err: E) -> AlarmError {
    AlarmError::Pin(err.kind())
}

pub struct Alarm<P> {
    buzzer: P,
    led: P,
}

impl<P: OutputPin> Alarm<P> {
    /// Both outputs are active high and start switched off.
    pub fn new(buzzer: P, led: P) -> Result<Self, AlarmError> {
        let mut alarm = Self { buzzer, led };
        alarm.apply(AlarmState::Clear)?;
        Ok(alarm)
    }

    pub fn apply(&mut self, state: AlarmState) -> Result<(), AlarmError> {
        let level = PinState::from(state.is_tripped());
        self.buzzer.set_state(level).map_err(pin_fault)?;
        self.led.set_state(level).map_err(pin_fault)
    }
}
