//! The control loop: read, display, alarm, sleep, forever.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, error, warn};
use thiserror::Error;

use crate::alarm::{Alarm, AlarmError, AlarmState};
use crate::config::{LoopConfig, DISPLAY_CEILING};
use crate::hx711::SensorError;
use crate::scale::Scale;
use crate::seven_segment::DisplayError;

/// Anything that can render a weight reading.
pub trait WeightDisplay {
    fn show_number(&mut self, value: f32) -> Result<(), DisplayError>;
}

/// A fault that abandons one iteration. None of them stop the loop.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LoopError {
    #[error("sensor: {0}")]
    Sensor(#[from] SensorError),
    #[error("display: {0}")]
    Display(#[from] DisplayError),
    #[error("alarm: {0}")]
    Alarm(#[from] AlarmError),
}

/// What one successful iteration measured and did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Absolute weight, unclamped.
    pub weight: f32,
    /// Value handed to the display.
    pub shown: f32,
    pub alarm: AlarmState,
}

pub struct SamplingLoop<S, W, P, D> {
    scale: S,
    display: W,
    alarm: Alarm<P>,
    delay: D,
    config: LoopConfig,
}

impl<S, W, P, D> SamplingLoop<S, W, P, D>
where
    S: Scale,
    W: WeightDisplay,
    P: OutputPin,
    D: DelayNs,
{
    pub fn new(scale: S, display: W, alarm: Alarm<P>, delay: D, config: LoopConfig) -> Self {
        Self {
            scale,
            display,
            alarm,
            delay,
            config,
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// One iteration without the trailing sleep.
    ///
    /// Negative readings count as tare noise, so the weight is taken
    /// absolute. The alarm compares the unclamped weight and is driven even
    /// when the display rejects the reading; the render fault is returned
    /// afterwards.
    pub fn tick(&mut self) -> Result<Sample, LoopError> {
        let weight = self.scale.read_weight()?.abs();
        debug!("Current weight: {:.2}", weight);

        let shown = weight.min(DISPLAY_CEILING);
        let rendered = self.display.show_number(shown);

        let alarm = AlarmState::evaluate(weight, self.config.alarm_threshold);
        self.alarm.apply(alarm)?;
        if alarm.is_tripped() {
            warn!(
                "ALARM: weight {:.2} exceeds {}",
                weight, self.config.alarm_threshold
            );
        }
        rendered?;

        Ok(Sample {
            weight,
            shown,
            alarm,
        })
    }

    /// One iteration followed by its sleep: the sample interval after a
    /// success, the longer backoff after a fault.
    pub fn iterate(&mut self) -> Result<Sample, LoopError> {
        let outcome = self.tick();
        match &outcome {
            Ok(_) => self.delay.delay_ms(self.config.sample_interval_ms),
            Err(err) => {
                error!("Error reading weight: {}", err);
                self.delay.delay_ms(self.config.fault_backoff_ms);
            }
        }
        outcome
    }

    pub fn run(&mut self) -> ! {
        loop {
            let _ = self.iterate();
        }
    }
}
