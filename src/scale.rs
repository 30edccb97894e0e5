use crate::hx711::SensorError;

/// Anything that can produce a calibrated weight on demand.
pub trait Scale {
    fn read_weight(&mut self) -> Result<f32, SensorError>;
}

/// Linear transform from raw counts to weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    /// Raw reading of the empty platform.
    pub offset: i32,
    /// Raw counts per unit of weight.
    pub reference_unit: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            offset: 0,
            reference_unit: 1.0,
        }
    }
}

impl Calibration {
    pub fn apply(&self, raw: i32) -> Result<f32, SensorError> {
        if self.reference_unit == 0.0 {
            return Err(SensorError::ZeroReferenceUnit);
        }
        let counts = i64::from(raw) - i64::from(self.offset);
        Ok(counts as f32 / self.reference_unit)
    }
}
