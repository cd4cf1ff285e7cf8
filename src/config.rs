//! Scheduler configuration and validation (spec.md §6, §3.1 of
//! SPEC_FULL.md). Field names follow the original service's
//! `backend/schemas/planning.py::PlanningRequest`.

use serde::{Deserialize, Serialize};

use crate::conflict::ConflictStrategy;
use crate::error::PlanError;
use crate::feasibility::SlewLimits;
use crate::quality::{MultiCriteriaWeights, QualityModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    FirstFit,
    BestFit,
    RollPitchFirstFit,
    RollPitchBestFit,
}

impl Algorithm {
    pub fn uses_pitch(&self) -> bool {
        matches!(self, Algorithm::RollPitchFirstFit | Algorithm::RollPitchBestFit)
    }

    pub fn is_best_fit(&self) -> bool {
        matches!(self, Algorithm::BestFit | Algorithm::RollPitchBestFit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub imaging_time_s: f64,
    pub max_roll_rate_dps: f64,
    pub max_roll_accel_dps2: f64,
    #[serde(default)]
    pub max_pitch_rate_dps: f64,
    #[serde(default)]
    pub max_pitch_accel_dps2: f64,
    pub max_spacecraft_roll_deg: f64,
    #[serde(default)]
    pub max_spacecraft_pitch_deg: f64,
    pub look_window_s: f64,
    #[serde(default)]
    pub quality_model: QualityModel,
    #[serde(default = "default_ideal_incidence")]
    pub ideal_incidence_deg: f64,
    #[serde(default = "default_band_width")]
    pub band_width_deg: f64,
    #[serde(default)]
    pub weights: MultiCriteriaWeights,
    #[serde(default)]
    pub conflict_strategy: ConflictStrategy,
    #[serde(default = "default_time_threshold")]
    pub conflict_time_threshold_s: f64,
    #[serde(default)]
    pub settle_time_s: f64,
}

fn default_ideal_incidence() -> f64 {
    35.0
}

fn default_band_width() -> f64 {
    7.5
}

fn default_time_threshold() -> f64 {
    300.0
}

impl SchedulerConfig {
    pub fn slew_limits(&self) -> SlewLimits {
        SlewLimits {
            max_roll_rate_dps: self.max_roll_rate_dps,
            max_roll_accel_dps2: self.max_roll_accel_dps2,
            max_pitch_rate_dps: self.max_pitch_rate_dps,
            max_pitch_accel_dps2: self.max_pitch_accel_dps2,
            max_spacecraft_roll_deg: self.max_spacecraft_roll_deg,
            max_spacecraft_pitch_deg: self.max_spacecraft_pitch_deg,
            settle_time_s: self.settle_time_s,
        }
    }

    /// Validates every field named in spec.md §6; invalid configs fail the
    /// run fast with `SCHEDULER_CONFIG_INVALID` before any computation.
    pub fn validate(&self) -> Result<(), PlanError> {
        let invalid = |field: &str, reason: &str| PlanError::SchedulerConfigInvalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        macro_rules! require {
            ($cond:expr, $field:literal, $reason:literal) => {
                if !$cond {
                    return Err(invalid($field, $reason));
                }
            };
        }

        require!(self.imaging_time_s.is_finite() && self.imaging_time_s > 0.0, "imaging_time_s", "must be > 0");
        require!(
            self.max_roll_rate_dps.is_finite() && self.max_roll_rate_dps > 0.0,
            "max_roll_rate_dps",
            "must be > 0"
        );
        require!(
            self.max_roll_accel_dps2.is_finite() && self.max_roll_accel_dps2 > 0.0,
            "max_roll_accel_dps2",
            "must be > 0"
        );
        require!(
            self.max_pitch_rate_dps.is_finite() && self.max_pitch_rate_dps >= 0.0,
            "max_pitch_rate_dps",
            "must be >= 0"
        );
        require!(
            self.max_pitch_accel_dps2.is_finite() && self.max_pitch_accel_dps2 >= 0.0,
            "max_pitch_accel_dps2",
            "must be >= 0"
        );
        require!(
            self.max_spacecraft_roll_deg.is_finite() && self.max_spacecraft_roll_deg >= 0.0,
            "max_spacecraft_roll_deg",
            "must be >= 0"
        );
        require!(
            self.max_spacecraft_pitch_deg.is_finite() && self.max_spacecraft_pitch_deg >= 0.0,
            "max_spacecraft_pitch_deg",
            "must be >= 0"
        );
        require!(self.look_window_s.is_finite() && self.look_window_s > 0.0, "look_window_s", "must be > 0");
        require!(self.ideal_incidence_deg.is_finite(), "ideal_incidence_deg", "must be finite");
        require!(
            self.band_width_deg.is_finite() && self.band_width_deg > 0.0,
            "band_width_deg",
            "must be > 0"
        );
        require!(
            self.conflict_time_threshold_s.is_finite() && self.conflict_time_threshold_s >= 0.0,
            "conflict_time_threshold_s",
            "must be >= 0"
        );

        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            imaging_time_s: 5.0,
            max_roll_rate_dps: 1.0,
            max_roll_accel_dps2: 10_000.0,
            max_pitch_rate_dps: 1.0,
            max_pitch_accel_dps2: 10_000.0,
            max_spacecraft_roll_deg: 45.0,
            max_spacecraft_pitch_deg: 0.0,
            look_window_s: 600.0,
            quality_model: QualityModel::Monotonic,
            ideal_incidence_deg: default_ideal_incidence(),
            band_width_deg: default_band_width(),
            weights: MultiCriteriaWeights::balanced(),
            conflict_strategy: ConflictStrategy::BestGeometry,
            conflict_time_threshold_s: default_time_threshold(),
            settle_time_s: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SchedulerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_imaging_time_is_invalid() {
        let mut cfg = SchedulerConfig::default();
        cfg.imaging_time_s = 0.0;
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.kind(), "SCHEDULER_CONFIG_INVALID");
    }

    #[test]
    fn test_nan_roll_rate_is_invalid() {
        let mut cfg = SchedulerConfig::default();
        cfg.max_roll_rate_dps = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_negative_roll_limit_is_invalid() {
        let mut cfg = SchedulerConfig::default();
        cfg.max_spacecraft_roll_deg = -1.0;
        assert!(cfg.validate().is_err());
    }
}
