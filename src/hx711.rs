//! HX711 load cell amplifier, bit-banged over a clock/data line pair.
//!
//! A conversion is available when the data line drops low. The 24 data bits
//! are clocked out MSB first, then 1 to 3 extra pulses select the gain of the
//! *next* conversion.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as PinError, ErrorKind, InputPin, OutputPin};
use log::{error, info, trace, warn};
use thiserror::Error;

use crate::scale::{Calibration, Scale};

const SIGN_BIT: i32 = 1 << 23;
const MODULUS: i32 = 1 << 24;
const WORD_MASK: u32 = 0x00FF_FFFF;

/// Each clock level is held this long. The chip powers down if the clock
/// stays high past 60 µs.
const PULSE_WIDTH_US: u32 = 1;
const SETTLE_MS: u32 = 1;

const AVERAGE_RETRY_MS: u32 = 10;
const AVERAGE_ATTEMPTS_PER_SAMPLE: usize = 4;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("sensor did not signal ready after {polls} polls")]
    NotReady { polls: u32 },
    #[error("unsupported gain {0}, expected 32, 64 or 128")]
    UnsupportedGain(u8),
    #[error("reference unit is zero")]
    ZeroReferenceUnit,
    #[error("gpio error: {0}")]
    Pin(ErrorKind),
}

fn pin_fault<E: PinError>(err: E) -> SensorError {
    SensorError::Pin(err.kind())
}

/// Amplifier gain. Channel A runs at 128 or 64, channel B at 32.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gain {
    G128,
    G64,
    G32,
}

impl Gain {
    /// Extra clock pulses after the data bits. Not ordered by gain.
    pub const fn pulse_count(self) -> u8 {
        match self {
            Gain::G128 => 1,
            Gain::G64 => 3,
            Gain::G32 => 2,
        }
    }

    pub const fn factor(self) -> u8 {
        match self {
            Gain::G128 => 128,
            Gain::G64 => 64,
            Gain::G32 => 32,
        }
    }
}

impl TryFrom<u8> for Gain {
    type Error = SensorError;

    fn try_from(factor: u8) -> Result<Self, Self::Error> {
        match factor {
            128 => Ok(Gain::G128),
            64 => Ok(Gain::G64),
            32 => Ok(Gain::G32),
            other => Err(SensorError::UnsupportedGain(other)),
        }
    }
}

/// How long to wait for the data line to signal a finished conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyWait {
    /// Spin on the data line until it drops. Hangs if the sensor is gone.
    Forever,
    /// Check up to `polls` times, sleeping `interval_us` between checks.
    Bounded { polls: u32, interval_us: u32 },
}

/// Recover a signed value from a 24-bit two's-complement word.
pub const fn decode(word: u32) -> i32 {
    let value = (word & WORD_MASK) as i32;
    if value & SIGN_BIT != 0 {
        value - MODULUS
    } else {
        value
    }
}

/// Device driver for the HX711. Owns both lines for its whole life.
pub struct Hx711<Sck, Dt, D> {
    sck: Sck,
    dt: Dt,
    delay: D,
    gain: Gain,
    wait: ReadyWait,
    calibration: Calibration,
}

impl<Sck, Dt, D> Hx711<Sck, Dt, D>
where
    Sck: OutputPin,
    Dt: InputPin,
    D: DelayNs,
{
    /// Takes the lines, applies `gain` and discards the conversion that was
    /// pending at power-up.
    pub fn new(
        sck: Sck,
        dt: Dt,
        delay: D,
        gain: Gain,
        wait: ReadyWait,
    ) -> Result<Self, SensorError> {
        info!("Initializing HX711");
        let mut hx711 = Self::detached(sck, dt, delay, gain, wait);
        hx711.set_gain(gain)?;
        hx711.delay.delay_ms(SETTLE_MS);
        info!("HX711 initialized");
        Ok(hx711)
    }

    /// Takes the lines without talking to the sensor. `start` has to run
    /// before the first reading.
    pub fn detached(sck: Sck, dt: Dt, delay: D, gain: Gain, wait: ReadyWait) -> Self {
        Self {
            sck,
            dt,
            delay,
            gain,
            wait,
            calibration: Calibration::default(),
        }
    }

    /// The start-up read of `new`, repeated every `backoff_ms` until the
    /// sensor answers.
    pub fn start(&mut self, backoff_ms: u32) {
        info!("Initializing HX711");
        while let Err(err) = self.set_gain(self.gain) {
            error!("HX711 start-up failed: {}", err);
            self.delay.delay_ms(backoff_ms);
        }
        self.delay.delay_ms(SETTLE_MS);
        info!("HX711 initialized");
    }

    /// The chip latches a new gain only after a full conversion, so this
    /// performs one blocking read.
    pub fn set_gain(&mut self, gain: Gain) -> Result<(), SensorError> {
        info!("Setting gain to {}", gain.factor());
        self.gain = gain;
        self.sck.set_low().map_err(pin_fault)?;
        self.read_raw_bytes().map(|_| ())
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    /// True when a finished conversion is waiting to be clocked out.
    pub fn is_ready(&mut self) -> Result<bool, SensorError> {
        self.dt.is_low().map_err(pin_fault)
    }

    fn wait_ready(&mut self) -> Result<(), SensorError> {
        match self.wait {
            ReadyWait::Forever => {
                while !self.is_ready()? {
                    core::hint::spin_loop();
                }
                Ok(())
            }
            ReadyWait::Bounded { polls, interval_us } => {
                for _ in 0..polls {
                    if self.is_ready()? {
                        return Ok(());
                    }
                    self.delay.delay_us(interval_us);
                }
                Err(SensorError::NotReady { polls })
            }
        }
    }

    fn pulse(&mut self) -> Result<(), SensorError> {
        self.sck.set_high().map_err(pin_fault)?;
        self.delay.delay_us(PULSE_WIDTH_US);
        self.sck.set_low().map_err(pin_fault)?;
        self.delay.delay_us(PULSE_WIDTH_US);
        Ok(())
    }

    fn read_bit(&mut self) -> Result<u8, SensorError> {
        self.pulse()?;
        Ok(u8::from(self.dt.is_high().map_err(pin_fault)?))
    }

    fn read_byte(&mut self) -> Result<u8, SensorError> {
        let mut byte = 0u8;
        for _ in 0..8 {
            byte = (byte << 1) | self.read_bit()?;
        }
        Ok(byte)
    }

    /// Wait for a conversion and clock it out, most significant byte first.
    /// The trailing gain pulses are sent before returning.
    pub fn read_raw_bytes(&mut self) -> Result<[u8; 3], SensorError> {
        self.wait_ready()?;

        let bytes = [self.read_byte()?, self.read_byte()?, self.read_byte()?];

        for _ in 0..self.gain.pulse_count() {
            self.pulse()?;
        }

        trace!("HX711 raw bytes {:02x?}", bytes);
        Ok(bytes)
    }

    /// Signed conversion result, without calibration.
    pub fn read_raw(&mut self) -> Result<i32, SensorError> {
        let [high, mid, low] = self.read_raw_bytes()?;
        Ok(decode(u32::from_be_bytes([0, high, mid, low])))
    }

    /// Calibrated weight, in the unit the reference unit was measured in.
    pub fn read_weight(&mut self) -> Result<f32, SensorError> {
        let raw = self.read_raw()?;
        self.calibration.apply(raw)
    }

    pub fn set_offset(&mut self, offset: i32) {
        info!("Setting offset to {}", offset);
        self.calibration.offset = offset;
    }

    /// Must be non-zero; reads fail with `ZeroReferenceUnit` otherwise.
    pub fn set_reference_unit(&mut self, reference_unit: f32) {
        info!("Setting reference unit to {}", reference_unit);
        self.calibration.reference_unit = reference_unit;
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    /// Mean of `num_samples` raw readings, `None` when no samples were asked
    /// for. Failed reads are retried after a short sleep. All samples share
    /// one budget of `4 * num_samples` attempts; the last error is returned
    /// once it runs out.
    pub fn read_average(&mut self, num_samples: usize) -> Result<Option<f32>, SensorError> {
        if num_samples == 0 {
            return Ok(None);
        }

        let mut sum: i64 = 0;
        let mut count: usize = 0;
        let mut attempts: usize = 0;
        while count < num_samples {
            attempts += 1;
            match self.read_raw() {
                Ok(reading) => {
                    sum += i64::from(reading);
                    count += 1;
                }
                Err(err) if attempts >= num_samples * AVERAGE_ATTEMPTS_PER_SAMPLE => {
                    return Err(err);
                }
                Err(err) => {
                    warn!("HX711 read failed while averaging: {}", err);
                    self.delay.delay_ms(AVERAGE_RETRY_MS);
                }
            }
        }
        Ok(Some((sum as f64 / count as f64) as f32))
    }

    /// Zero the scale on whatever is currently on it.
    pub fn tare(&mut self, num_samples: usize) -> Result<(), SensorError> {
        info!("Taring scale over {} samples", num_samples);
        if let Some(average) = self.read_average(num_samples)? {
            self.set_offset(average.round() as i32);
        }
        Ok(())
    }

    /// Tare, keeping the current offset when the sensor cannot deliver.
    pub fn tare_or_keep(&mut self, num_samples: usize) {
        if let Err(err) = self.tare(num_samples) {
            error!(
                "Tare failed, keeping offset {}: {}",
                self.calibration.offset, err
            );
        }
    }
}

impl<Sck, Dt, D> Scale for Hx711<Sck, Dt, D>
where
    Sck: OutputPin,
    Dt: InputPin,
    D: DelayNs,
{
    fn read_weight(&mut self) -> Result<f32, SensorError> {
        Hx711::read_weight(self)
    }
}
