//! Calibration, timing and alarm constants.
//!
//! Pin numbers are board wiring and live in `main.rs`.

use crate::hx711::ReadyWait;

// Load cell

/// Amplifier gain on channel A.
pub const SENSOR_GAIN: u8 = 128;

/// Raw counts per kilogram for the fitted load cell.
pub const REFERENCE_UNIT: f32 = 420.0;

/// Raw reading of the empty platform. `None` tares at start-up instead.
pub const CALIBRATION_OFFSET: Option<i32> = None;

/// Readings averaged by the start-up tare.
pub const TARE_SAMPLES: usize = 16;

/// At 10 SPS a conversion takes 100 ms; give the sensor twice that.
pub const SENSOR_READY_POLLS: u32 = 200;
pub const SENSOR_READY_POLL_INTERVAL_US: u32 = 1_000;

/// Ready wait used by the firmware. A silent sensor becomes a loop fault
/// instead of hanging the device.
pub const SENSOR_READY_WAIT: ReadyWait = ReadyWait::Bounded {
    polls: SENSOR_READY_POLLS,
    interval_us: SENSOR_READY_POLL_INTERVAL_US,
};

// Display

/// How long each digit slot stays lit during one refresh.
pub const DIGIT_DWELL_MS: u32 = 5;

/// Largest value the two integer digits can show.
pub const DISPLAY_CEILING: f32 = 99.0;

// Alarm

/// Buzzer and LED trip strictly above this weight (kg).
///
/// The board was wired for 20 kg while its notes mention 200 kg; keep this
/// the single place to change it.
pub const ALARM_THRESHOLD: f32 = 20.0;

// Loop pacing

pub const SAMPLE_INTERVAL_MS: u32 = 100;
pub const FAULT_BACKOFF_MS: u32 = 500;

/// Runtime knobs of the sampling loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoopConfig {
    pub alarm_threshold: f32,
    pub sample_interval_ms: u32,
    pub fault_backoff_ms: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            alarm_threshold: ALARM_THRESHOLD,
            sample_interval_ms: SAMPLE_INTERVAL_MS,
            fault_backoff_ms: FAULT_BACKOFF_MS,
        }
    }
}
