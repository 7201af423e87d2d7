//! Pressure → drive frequency calibration.
//!
//! The compressor drive has no closed pressure loop: the sequencer picks a
//! frequency from a calibration table measured on the station and waits for
//! the pressure to settle. [`FrequencyMap`] is the validated, immutable form
//! of that table. A recalibration builds a new map and replaces the old one.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// One measured operating point of the drive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibrationPoint {
    /// Settled pressure in bar.
    pub pressure: f64,
    /// Drive frequency in Hz that produced it.
    pub frequency: f64,
}

impl CalibrationPoint {
    pub const fn new(pressure: f64, frequency: f64) -> Self {
        Self {
            pressure,
            frequency,
        }
    }
}

/// Factory calibration of the reference station.
pub fn default_table() -> Vec<CalibrationPoint> {
    vec![
        CalibrationPoint::new(1.0, 25.0),
        CalibrationPoint::new(1.5, 30.0),
        CalibrationPoint::new(2.0, 35.0),
        CalibrationPoint::new(2.5, 40.0),
        CalibrationPoint::new(3.0, 45.0),
        CalibrationPoint::new(3.5, 47.0),
        CalibrationPoint::new(4.0, 49.0),
        CalibrationPoint::new(4.5, 50.0),
    ]
}

/// Validated piecewise-linear calibration table.
///
/// Invariants (checked by [`FrequencyMap::new`]):
/// - at least two points, all values finite
/// - pressure strictly increasing
/// - frequency non-decreasing
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyMap {
    points: Vec<CalibrationPoint>,
}

impl FrequencyMap {
    /// Build a map from measured points.
    ///
    /// # Errors
    /// `ConfigError::ValidationError` when any invariant is violated. The
    /// table is never reordered or clamped to make it valid.
    pub fn new(points: Vec<CalibrationPoint>) -> Result<Self, ConfigError> {
        if points.len() < 2 {
            return Err(ConfigError::ValidationError(format!(
                "calibration table needs at least 2 points, got {}",
                points.len()
            )));
        }

        for (idx, point) in points.iter().enumerate() {
            if !point.pressure.is_finite() || !point.frequency.is_finite() {
                return Err(ConfigError::ValidationError(format!(
                    "calibration point {idx} is not finite"
                )));
            }
        }

        for (idx, pair) in points.windows(2).enumerate() {
            let (lo, hi) = (pair[0], pair[1]);
            if hi.pressure <= lo.pressure {
                return Err(ConfigError::ValidationError(format!(
                    "calibration pressure must strictly increase: point {} ({} bar) after {} bar",
                    idx + 1,
                    hi.pressure,
                    lo.pressure
                )));
            }
            if hi.frequency < lo.frequency {
                return Err(ConfigError::ValidationError(format!(
                    "calibration frequency must not decrease: point {} ({} Hz) after {} Hz",
                    idx + 1,
                    hi.frequency,
                    lo.frequency
                )));
            }
        }

        Ok(Self { points })
    }

    /// The calibration points in ascending pressure order.
    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    /// Drive frequency that settles at `pressure`.
    ///
    /// Below the first point the first frequency is returned, above the last
    /// point the last one. Between points the result is linearly interpolated
    /// on the bracketing pair.
    pub fn frequency_for(&self, pressure: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];

        if pressure.is_nan() || pressure <= first.pressure {
            return first.frequency;
        }
        if pressure >= last.pressure {
            return last.frequency;
        }

        for pair in self.points.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if pressure <= hi.pressure {
                return lo.frequency
                    + (pressure - lo.pressure) * (hi.frequency - lo.frequency)
                        / (hi.pressure - lo.pressure);
            }
        }
        last.frequency
    }

    /// Settled pressure for a drive frequency (inverse of
    /// [`frequency_for`](Self::frequency_for)).
    ///
    /// Flat segments resolve to their lowest pressure. Frequencies outside
    /// the table clamp to the end pressures.
    pub fn pressure_for(&self, frequency: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];

        if frequency.is_nan() || frequency <= first.frequency {
            return first.pressure;
        }
        if frequency >= last.frequency {
            return last.pressure;
        }

        for pair in self.points.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if frequency <= hi.frequency {
                if hi.frequency == lo.frequency {
                    return lo.pressure;
                }
                return lo.pressure
                    + (frequency - lo.frequency) * (hi.pressure - lo.pressure)
                        / (hi.frequency - lo.frequency);
            }
        }
        last.pressure
    }
}

impl Default for FrequencyMap {
    fn default() -> Self {
        Self {
            points: default_table(),
        }
    }
}
