//! Feasibility kernel (spec.md §4.5).
//!
//! Maintains per-satellite [`AttitudeState`] and answers whether an
//! opportunity can be reached from the current attitude under a
//! trapezoidal slew profile bounded by rate and acceleration limits.

use serde::{Deserialize, Serialize};

use crate::types::{AttitudeState, Opportunity};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlewLimits {
    pub max_roll_rate_dps: f64,
    pub max_roll_accel_dps2: f64,
    pub max_pitch_rate_dps: f64,
    pub max_pitch_accel_dps2: f64,
    pub max_spacecraft_roll_deg: f64,
    pub max_spacecraft_pitch_deg: f64,
    pub settle_time_s: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeasibilityFailure {
    AttitudeLimit,
    InsufficientSlack,
    ExceedsWindow,
}

impl FeasibilityFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeasibilityFailure::AttitudeLimit => "ATTITUDE_LIMIT",
            FeasibilityFailure::InsufficientSlack => "INSUFFICIENT_SLACK",
            FeasibilityFailure::ExceedsWindow => "EXCEEDS_WINDOW",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeasibilityResult {
    pub maneuver_time_s: f64,
    pub slack_s: f64,
    pub new_attitude: AttitudeState,
}

/// Single-axis maneuver time under a trapezoidal rate/accel profile
/// (spec.md §4.5). Returns `0.0` when `delta == 0`, regardless of
/// `settle_time` — the settle time is added once by the caller, not per
/// axis, and only when the axis actually moves (spec.md §9 open question:
/// "source elides it when delta = 0; preserve that convention").
fn axis_maneuver_time_s(delta_deg: f64, max_rate_dps: f64, max_accel_dps2: f64) -> f64 {
    let delta = delta_deg.abs();
    if delta <= 0.0 || max_rate_dps <= 0.0 || max_accel_dps2 <= 0.0 {
        return 0.0;
    }

    let t_accel = max_rate_dps / max_accel_dps2;
    let d_accel = 0.5 * max_accel_dps2 * t_accel * t_accel;

    if delta <= 2.0 * d_accel {
        2.0 * (delta / max_accel_dps2).sqrt()
    } else {
        2.0 * t_accel + (delta - 2.0 * d_accel) / max_rate_dps
    }
}

/// `maneuver_time = max(t_roll, t_pitch)`, axes moving in parallel; a fixed
/// `settle_time` is added once iff at least one axis actually moved
/// (spec.md §4.5, §9).
pub fn maneuver_time_s(current: AttitudeState, target: AttitudeState, limits: &SlewLimits) -> f64 {
    let delta_roll = target.roll_deg - current.roll_deg;
    let delta_pitch = target.pitch_deg - current.pitch_deg;

    let t_roll = axis_maneuver_time_s(delta_roll, limits.max_roll_rate_dps, limits.max_roll_accel_dps2);
    let t_pitch =
        axis_maneuver_time_s(delta_pitch, limits.max_pitch_rate_dps, limits.max_pitch_accel_dps2);

    let base = t_roll.max(t_pitch);
    if delta_roll == 0.0 && delta_pitch == 0.0 {
        0.0
    } else {
        base + limits.settle_time_s
    }
}

/// Checks whether `opportunity` is feasible from `current` attitude at
/// `t_now`, returning the realised maneuver and new attitude on success or
/// the failure reason otherwise (spec.md §4.5).
pub fn check_feasibility(
    current: AttitudeState,
    t_now: f64,
    opportunity: &Opportunity,
    imaging_time_s: f64,
    limits: &SlewLimits,
) -> Result<FeasibilityResult, FeasibilityFailure> {
    let target_attitude = AttitudeState { roll_deg: opportunity.roll_deg, pitch_deg: opportunity.pitch_deg };

    if target_attitude.roll_deg.abs() > limits.max_spacecraft_roll_deg
        || target_attitude.pitch_deg.abs() > limits.max_spacecraft_pitch_deg
    {
        return Err(FeasibilityFailure::AttitudeLimit);
    }

    let maneuver_time_s = maneuver_time_s(current, target_attitude, limits);

    if t_now + maneuver_time_s + imaging_time_s > opportunity.end {
        return Err(FeasibilityFailure::ExceedsWindow);
    }

    let slack = opportunity.start - (t_now + maneuver_time_s);
    if slack < 0.0 {
        return Err(FeasibilityFailure::InsufficientSlack);
    }

    Ok(FeasibilityResult { maneuver_time_s, slack_s: slack, new_attitude: target_attitude })
}
