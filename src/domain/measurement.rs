// Gravimetric measurement domain model and PM2.5 concentration calculation
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One gravimetric filter sample.
///
/// Masses are in mg, flow rate in L/min and the sampling window in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub initial_mass_mg: f64,
    pub final_mass_mg: f64,
    pub flow_rate_lpm: f64,
    pub start_time_min: f64,
    pub stop_time_min: f64,
}

/// Reasons a measurement cannot produce a meaningful concentration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidMeasurement {
    #[error("invalid measurement: flow rate must be greater than 0 (got {0})")]
    NonPositiveFlowRate(f64),
    #[error("invalid measurement: stop time ({stop}) must be greater than start time ({start})")]
    NonIncreasingWindow { start: f64, stop: f64 },
    #[error("invalid measurement: {0} is not a finite number")]
    NotFinite(&'static str),
}

/// Conditions that are physically suspicious but still produce a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementWarning {
    /// The filter weighed less after sampling than before.
    MassDecreased,
}

impl MeasurementWarning {
    pub fn message(&self) -> &'static str {
        match self {
            MeasurementWarning::MassDecreased => {
                "final mass is less than initial mass; this may indicate a measurement error"
            }
        }
    }
}

/// PM2.5 mass concentration in µg/m³.
///
/// Total over its inputs: when the sampled volume is not positive
/// (flow rate <= 0 or stop <= start) the result is 0. No rounding is applied.
pub fn compute_concentration(
    initial_mass_mg: f64,
    final_mass_mg: f64,
    flow_rate_lpm: f64,
    start_time_min: f64,
    stop_time_min: f64,
) -> f64 {
    if flow_rate_lpm <= 0.0 || stop_time_min <= start_time_min {
        return 0.0;
    }

    let mass_diff_mg = final_mass_mg - initial_mass_mg;
    let volume_l = flow_rate_lpm * (stop_time_min - start_time_min);
    let volume_m3 = volume_l / 1000.0;

    (mass_diff_mg / volume_m3) * 1000.0
}

impl Measurement {
    pub fn new(
        initial_mass_mg: f64,
        final_mass_mg: f64,
        flow_rate_lpm: f64,
        start_time_min: f64,
        stop_time_min: f64,
    ) -> Self {
        Self {
            initial_mass_mg,
            final_mass_mg,
            flow_rate_lpm,
            start_time_min,
            stop_time_min,
        }
    }

    pub fn sampled_minutes(&self) -> f64 {
        self.stop_time_min - self.start_time_min
    }

    /// Sampled air volume in m³.
    pub fn sampled_volume_m3(&self) -> f64 {
        self.flow_rate_lpm * self.sampled_minutes() / 1000.0
    }

    pub fn concentration(&self) -> f64 {
        compute_concentration(
            self.initial_mass_mg,
            self.final_mass_mg,
            self.flow_rate_lpm,
            self.start_time_min,
            self.stop_time_min,
        )
    }

    /// Hard preconditions: finite fields, flow rate > 0 and stop > start.
    /// On success returns the soft warnings that still apply.
    pub fn validate(&self) -> Result<Vec<MeasurementWarning>, InvalidMeasurement> {
        let fields = [
            ("initial mass", self.initial_mass_mg),
            ("final mass", self.final_mass_mg),
            ("flow rate", self.flow_rate_lpm),
            ("start time", self.start_time_min),
            ("stop time", self.stop_time_min),
        ];
        if let Some(&(name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(InvalidMeasurement::NotFinite(name));
        }

        if self.flow_rate_lpm <= 0.0 {
            return Err(InvalidMeasurement::NonPositiveFlowRate(self.flow_rate_lpm));
        }

        if self.stop_time_min <= self.start_time_min {
            return Err(InvalidMeasurement::NonIncreasingWindow {
                start: self.start_time_min,
                stop: self.stop_time_min,
            });
        }

        let mut warnings = Vec::new();
        if self.final_mass_mg < self.initial_mass_mg {
            warnings.push(MeasurementWarning::MassDecreased);
        }
        Ok(warnings)
    }

    /// Validating variant of [`Measurement::concentration`].
    pub fn try_concentration(&self) -> Result<f64, InvalidMeasurement> {
        self.validate()?;
        Ok(self.concentration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day_sample() -> Measurement {
        Measurement::new(100.0, 102.5, 16.7, 0.0, 1440.0)
    }

    #[test]
    fn test_compute_concentration() {
        let c = compute_concentration(100.0, 102.5, 16.7, 0.0, 1440.0);
        assert!((c - 103.959).abs() < 0.001, "got {c}");
        assert!((day_sample().sampled_volume_m3() - 24.048).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_volume_yields_zero() {
        assert_eq!(compute_concentration(100.0, 102.5, 0.0, 0.0, 1440.0), 0.0);
        assert_eq!(compute_concentration(100.0, 102.5, -5.0, 0.0, 1440.0), 0.0);
        assert_eq!(compute_concentration(100.0, 102.5, 16.7, 60.0, 60.0), 0.0);
        assert_eq!(compute_concentration(100.0, 102.5, 16.7, 90.0, 60.0), 0.0);
    }

    #[test]
    fn test_mass_decrease_is_a_warning() {
        let m = Measurement::new(102.5, 100.0, 16.7, 0.0, 1440.0);
        assert_eq!(m.validate(), Ok(vec![MeasurementWarning::MassDecreased]));
        assert!(m.try_concentration().unwrap() < 0.0);
        assert_eq!(day_sample().validate(), Ok(vec![]));
    }

    #[test]
    fn test_strict_validation() {
        let mut m = day_sample();
        m.flow_rate_lpm = 0.0;
        assert_eq!(m.try_concentration(), Err(InvalidMeasurement::NonPositiveFlowRate(0.0)));

        let mut m = day_sample();
        m.stop_time_min = 0.0;
        assert_eq!(
            m.try_concentration(),
            Err(InvalidMeasurement::NonIncreasingWindow { start: 0.0, stop: 0.0 })
        );

        let mut m = day_sample();
        m.final_mass_mg = f64::NAN;
        assert_eq!(m.validate(), Err(InvalidMeasurement::NotFinite("final mass")));
    }
}
