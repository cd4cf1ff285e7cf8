//! Core data model (spec.md §3).
//!
//! Field names follow the original service's pydantic schemas
//! (`backend/schemas/{target,satellite,tle,planning}.py`) so that a
//! `PlanRequest` deserialized from the legacy JSON shape needs no renaming.

use serde::{Deserialize, Serialize};

pub type SatelliteId = String;
pub type TargetId = String;
pub type OpportunityId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MissionMode {
    Optical,
    Sar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetKind {
    Optical,
    Sar,
    Communication,
}

/// Two-Line Element set. Immutable once loaded; consumed by the propagator
/// adapter. Lines are kept verbatim — spec.md §6 requires bit-exact TLE
/// input, never re-serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tle {
    pub name: String,
    pub line1: String,
    pub line2: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorParams {
    pub sensor_half_fov_deg: f64,
    pub max_roll_deg: f64,
    pub max_pitch_deg: f64,
}

impl Default for SensorParams {
    fn default() -> Self {
        SensorParams {
            sensor_half_fov_deg: 45.0,
            max_roll_deg: 45.0,
            max_pitch_deg: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Satellite {
    pub id: SatelliteId,
    pub name: String,
    pub tle: Tle,
    #[serde(default)]
    pub sensor: SensorParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTarget {
    pub id: String,
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
    pub mission_type: TargetKind,
    pub elevation_mask_deg: f64,
    pub sensor_half_fov_deg: f64,
    pub max_roll_deg: f64,
    pub priority: u8,
}

impl GroundTarget {
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassWindow {
    pub satellite_id_index: usize,
    pub aos_time: f64,
    pub tca_time: f64,
    pub los_time: f64,
    pub aos_azimuth_deg: f64,
    pub tca_azimuth_deg: f64,
    pub los_azimuth_deg: f64,
    pub peak_elevation_deg: f64,
    pub ascending: bool,
}

impl PassWindow {
    pub fn duration_s(&self) -> f64 {
        self.los_time - self.aos_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub satellite_id: SatelliteId,
    pub target_id: TargetId,
    pub start: f64,
    pub end: f64,
    pub peak_elevation_deg: f64,
    /// Signed off-nadir incidence angle; positive = right-of-track.
    pub roll_deg: f64,
    /// Signed along-track pitch angle; positive = forward-looking.
    pub pitch_deg: f64,
    /// True off-nadir (incidence) angle between nadir and the line of
    /// sight, from `geometry::off_nadir_deg` (spec.md §4.2 law of
    /// cosines) — NOT `roll_deg.hypot(pitch_deg)`, which is only a
    /// small-angle approximation once both axes are nonzero.
    pub off_nadir_deg: f64,
    pub base_value: f64,
    pub quality: f64,
    pub composite_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttitudeState {
    pub roll_deg: f64,
    pub pitch_deg: f64,
}

impl Default for AttitudeState {
    fn default() -> Self {
        AttitudeState { roll_deg: 0.0, pitch_deg: 0.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledOpportunity {
    pub opportunity_id: OpportunityId,
    pub satellite_id: SatelliteId,
    pub target_id: TargetId,
    pub start: f64,
    pub end: f64,
    pub roll_deg: f64,
    pub pitch_deg: f64,
    pub off_nadir_deg: f64,
    pub delta_roll_deg: f64,
    pub delta_pitch_deg: f64,
    pub maneuver_time_s: f64,
    pub slack_time_s: f64,
    pub composite_value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleMetrics {
    pub total_candidates: usize,
    pub accepted: usize,
    pub rejected_attitude_limit: usize,
    pub rejected_insufficient_slack: usize,
    pub rejected_exceeds_window: usize,
    pub targets_covered: usize,
    pub targets_total: usize,
    pub mean_incidence_deg: f64,
    pub mean_composite_value: f64,
    pub total_slew_time_s: f64,
    pub runtime_ms: f64,
    pub propagation_error_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvariantCheck {
    pub name: String,
    pub ok: bool,
    pub details: Option<String>,
}
