//! Load-cell weigh station: an HX711 driver, a multiplexed 7-segment
//! readout and an over-weight alarm, sequenced by one sampling loop.
//!
//! Everything here is written against `embedded-hal` 1.0 lines and delays,
//! so it runs on the ESP32 (see `main.rs`) and in host tests alike.

pub mod alarm;
pub mod config;
pub mod hx711;
pub mod sampling;
pub mod scale;
pub mod seven_segment;

#[cfg(any(test, feature = "sim"))]
pub mod mock;

pub use alarm::{Alarm, AlarmState};
pub use hx711::{Gain, Hx711, ReadyWait, SensorError};
pub use sampling::{LoopError, Sample, SamplingLoop, WeightDisplay};
pub use scale::{Calibration, Scale};
pub use seven_segment::{DisplayError, SevenSegment};
