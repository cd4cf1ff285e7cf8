//! Opportunity builder (spec.md §4.3).
//!
//! Converts a [`PassWindow`] into zero, one, or many [`Opportunity`]
//! candidates depending on whether the satellite can pitch.

use uuid::Uuid;

use crate::cache::{PositionCache, TargetEcefCache};
use crate::error::PropagatorError;
use crate::geometry;
use crate::orbit::OrbitPropagator;
use crate::types::{GroundTarget, Opportunity, PassWindow, Satellite};

/// Deterministic namespace for opportunity ids (spec.md §8 "Determinism":
/// two runs with identical inputs must be byte-equal, which rules out
/// random ids).
const OPPORTUNITY_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6d, 0x69, 0x73, 0x73, 0x69, 0x6f, 0x6e, 0x2d, 0x70, 0x6c, 0x61, 0x6e, 0x6e, 0x65, 0x72, 0x21,
]);

fn opportunity_id(satellite_id: &str, target_id: &str, start: f64) -> String {
    let key = format!("{satellite_id}|{target_id}|{start:.3}");
    Uuid::new_v5(&OPPORTUNITY_NAMESPACE, key.as_bytes()).to_string()
}

fn effective_max_roll_deg(satellite: &Satellite, target: &GroundTarget) -> f64 {
    satellite.sensor.max_roll_deg.min(target.max_roll_deg)
}

fn quantize(angle_deg: f64, granularity_deg: f64) -> i64 {
    (angle_deg / granularity_deg).round() as i64
}

/// Chooses a sample count in `[3, 11]` depending on pass duration, at the
/// finest resolution that fits (spec.md §4.3).
fn choose_sample_count(duration_s: f64) -> usize {
    let raw = duration_s.floor().max(0.0) as i64 + 1;
    raw.clamp(3, 11) as usize
}

fn sample_times(aos: f64, los: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![aos];
    }
    let step = (los - aos) / (n - 1) as f64;
    (0..n).map(|i| aos + step * i as f64).collect()
}

fn roll_pitch_at(
    propagator: &dyn OrbitPropagator,
    cache: Option<&PositionCache>,
    satellite_id: &str,
    target_ecef: geometry::Vec3,
    t: f64,
) -> Result<(f64, f64, f64), PropagatorError> {
    let sat = match cache {
        Some(c) => c.position_at(satellite_id, propagator, t)?,
        None => propagator.position_at(t)?,
    };
    let (roll_deg, pitch_deg) = geometry::signed_roll_pitch_deg(sat.ecef_km, sat.vel_ecef_km_s, target_ecef);
    Ok((roll_deg, pitch_deg, sat.alt_km))
}

/// Elevation and true off-nadir angle (spec.md §4.2 law of cosines, NOT
/// `roll.hypot(pitch)`) of the satellite as seen/seeing at `sat_ecef`.
fn elevation_and_off_nadir(
    target: &GroundTarget,
    target_ecef: geometry::Vec3,
    sat_alt_km: f64,
    sat_ecef: geometry::Vec3,
) -> (f64, f64) {
    let (elevation_deg, _az, slant_range_km) =
        geometry::elevation_azimuth_deg(target_ecef, target.latitude_deg, target.longitude_deg, sat_ecef);
    let off_nadir_deg = geometry::off_nadir_deg(sat_alt_km, slant_range_km);
    (elevation_deg, off_nadir_deg)
}

fn new_opportunity(
    satellite: &Satellite,
    target: &GroundTarget,
    t_sample: f64,
    imaging_time_s: f64,
    roll_deg: f64,
    pitch_deg: f64,
    off_nadir_deg: f64,
    peak_elevation_deg: f64,
) -> Opportunity {
    Opportunity {
        id: opportunity_id(&satellite.id, &target.id, t_sample),
        satellite_id: satellite.id.clone(),
        target_id: target.id.clone(),
        start: t_sample,
        end: t_sample + imaging_time_s,
        peak_elevation_deg,
        roll_deg,
        pitch_deg,
        off_nadir_deg,
        base_value: 0.0,
        quality: 1.0,
        composite_value: 0.0,
    }
}

/// Builds opportunities for one pass. `imaging_time_s` is the scheduler
/// config's `tau`.
pub fn build_opportunities(
    propagator: &dyn OrbitPropagator,
    cache: Option<&PositionCache>,
    satellite: &Satellite,
    target: &GroundTarget,
    target_ecef_cache: &TargetEcefCache,
    pass: &PassWindow,
    imaging_time_s: f64,
) -> Result<Vec<Opportunity>, PropagatorError> {
    let target_ecef = target_ecef_cache.ecef_of(target);
    let max_roll = effective_max_roll_deg(satellite, target);
    let max_pitch = satellite.sensor.max_pitch_deg;

    if max_pitch <= 0.0 {
        // Roll-only mode: a single opportunity at TCA.
        let (roll_deg, _pitch_deg, sat_alt) =
            roll_pitch_at(propagator, cache, &satellite.id, target_ecef, pass.tca_time)?;
        if roll_deg.abs() > max_roll {
            return Ok(Vec::new());
        }
        let sat = match cache {
            Some(c) => c.position_at(&satellite.id, propagator, pass.tca_time)?,
            None => propagator.position_at(pass.tca_time)?,
        };
        let (_elevation_deg, off_nadir_deg) = elevation_and_off_nadir(target, target_ecef, sat_alt, sat.ecef_km);
        return Ok(vec![new_opportunity(
            satellite,
            target,
            pass.tca_time,
            imaging_time_s,
            roll_deg,
            0.0,
            off_nadir_deg,
            pass.peak_elevation_deg,
        )]);
    }

    // Roll+pitch mode: sample the interior of the pass, time-uniform
    // (spec.md §9 "pitch samples ... uniformly spaced in time").
    let n = choose_sample_count(pass.duration_s());
    let mut opportunities = Vec::with_capacity(n);
    let mut last_key: Option<(i64, i64)> = None;

    for t in sample_times(pass.aos_time, pass.los_time, n) {
        let (roll_deg, pitch_deg, sat_alt) =
            roll_pitch_at(propagator, cache, &satellite.id, target_ecef, t)?;

        if roll_deg.abs() > max_roll || pitch_deg.abs() > max_pitch {
            continue;
        }

        let key = (quantize(roll_deg, 0.5), quantize(pitch_deg, 0.5));
        if last_key == Some(key) {
            continue;
        }
        last_key = Some(key);

        let sat = match cache {
            Some(c) => c.position_at(&satellite.id, propagator, t)?,
            None => propagator.position_at(t)?,
        };
        let (elevation_deg, off_nadir_deg) = elevation_and_off_nadir(target, target_ecef, sat_alt, sat.ecef_km);

        opportunities.push(new_opportunity(
            satellite,
            target,
            t,
            imaging_time_s,
            roll_deg,
            pitch_deg,
            off_nadir_deg,
            elevation_deg,
        ));
    }

    Ok(opportunities)
}
