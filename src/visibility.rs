//! Visibility engine (spec.md §4.2).
//!
//! Produces the ordered sequence of [`PassWindow`]s for one (satellite,
//! target) pair, via two independently-verified strategies (fixed-step,
//! adaptive) that must agree to within the tolerances in spec.md §8.
//! Structured after the teacher's `orbital::build_passes` /
//! `find_max_elevation` (coarse scan, bisect to a boundary, refine the
//! interior) and `jdiez17-sat-o-mat`'s `pass_finder::predict_passes` /
//! `refine_crossing`.

use crate::cache::{PositionCache, TargetEcefCache};
use crate::error::PropagatorError;
use crate::geometry;
use crate::orbit::{OrbitPropagator, SatState};
use crate::types::{GroundTarget, PassWindow, TargetKind};

/// Passes separated by less than this many seconds of invisibility are
/// candidates for merging (spec.md §4.2, §9 "Pass merging vs splitting").
pub const PASS_GAP_THRESHOLD_S: f64 = 300.0;
pub const MIN_STEP_S: f64 = 1.0;

/// Earth-central angle (degrees) of the visibility circle around the
/// sub-satellite point at altitude `alt_km`, for a required elevation
/// `min_elevation_deg`. Standard spherical-triangle relation between
/// satellite, Earth's center, and the ground point.
pub fn visibility_radius_deg(alt_km: f64, min_elevation_deg: f64) -> f64 {
    let e = min_elevation_deg.to_radians();
    let ratio = (geometry::R_EARTH_KM / (geometry::R_EARTH_KM + alt_km)) * e.cos();
    let rho = ratio.clamp(-1.0, 1.0).asin();
    (std::f64::consts::FRAC_PI_2 - e - rho).to_degrees().max(0.0)
}

/// Visibility test (spec.md §4.2): optical/SAR targets require the
/// line-of-sight off-nadir angle within the sensor half-FOV *and* positive
/// satellite elevation; communication targets require elevation at or
/// above the elevation mask.
pub fn is_visible(target: &GroundTarget, sat: &SatState, target_ecef: geometry::Vec3) -> bool {
    let (elevation_deg, _azimuth_deg, slant_range_km) =
        geometry::elevation_azimuth_deg(target_ecef, target.latitude_deg, target.longitude_deg, sat.ecef_km);

    match target.mission_type {
        TargetKind::Optical | TargetKind::Sar => {
            if elevation_deg <= 0.0 {
                return false;
            }
            let off_nadir = geometry::off_nadir_deg(sat.alt_km, slant_range_km);
            off_nadir <= target.sensor_half_fov_deg
        }
        TargetKind::Communication => elevation_deg >= target.elevation_mask_deg,
    }
}

fn sample(
    propagator: &dyn OrbitPropagator,
    cache: Option<&PositionCache>,
    satellite_id: &str,
    t: f64,
) -> Result<SatState, PropagatorError> {
    match cache {
        Some(c) => c.position_at(satellite_id, propagator, t),
        None => propagator.position_at(t),
    }
}

fn elevation_at(
    propagator: &dyn OrbitPropagator,
    cache: Option<&PositionCache>,
    satellite_id: &str,
    target: &GroundTarget,
    target_ecef: geometry::Vec3,
    t: f64,
) -> Result<f64, PropagatorError> {
    let sat = sample(propagator, cache, satellite_id, t)?;
    let (elevation_deg, _az, _range) =
        geometry::elevation_azimuth_deg(target_ecef, target.latitude_deg, target.longitude_deg, sat.ecef_km);
    Ok(elevation_deg)
}

fn visible_at(
    propagator: &dyn OrbitPropagator,
    cache: Option<&PositionCache>,
    satellite_id: &str,
    target: &GroundTarget,
    target_ecef: geometry::Vec3,
    t: f64,
) -> Result<bool, PropagatorError> {
    let sat = sample(propagator, cache, satellite_id, t)?;
    Ok(is_visible(target, &sat, target_ecef))
}

fn ascending_at(
    propagator: &dyn OrbitPropagator,
    cache: Option<&PositionCache>,
    satellite_id: &str,
    t: f64,
) -> Result<bool, PropagatorError> {
    let sat = sample(propagator, cache, satellite_id, t)?;
    Ok(sat.vel_ecef_km_s[2] >= 0.0)
}

fn window_at(
    propagator: &dyn OrbitPropagator,
    cache: Option<&PositionCache>,
    satellite_id: &str,
    target: &GroundTarget,
    target_ecef: geometry::Vec3,
    t: f64,
) -> Result<(f64, f64), PropagatorError> {
    let sat = sample(propagator, cache, satellite_id, t)?;
    let (elevation_deg, azimuth_deg, _range) =
        geometry::elevation_azimuth_deg(target_ecef, target.latitude_deg, target.longitude_deg, sat.ecef_km);
    Ok((elevation_deg, azimuth_deg))
}

/// Bisects the boundary between `lo` (not visible) and `hi` (visible) to
/// 1-second precision. The caller must ensure the visibility predicate
/// genuinely differs at the endpoints (spec.md §9 "never extrapolate").
fn bisect_boundary(
    propagator: &dyn OrbitPropagator,
    cache: Option<&PositionCache>,
    satellite_id: &str,
    target: &GroundTarget,
    target_ecef: geometry::Vec3,
    mut lo: f64,
    mut hi: f64,
) -> Result<f64, PropagatorError> {
    while hi - lo > MIN_STEP_S {
        let mid = (lo + hi) / 2.0;
        if visible_at(propagator, cache, satellite_id, target, target_ecef, mid)? {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok(hi)
}

fn refine_tca(
    propagator: &dyn OrbitPropagator,
    cache: Option<&PositionCache>,
    satellite_id: &str,
    target: &GroundTarget,
    target_ecef: geometry::Vec3,
    aos: f64,
    los: f64,
    step_s: f64,
) -> Result<(f64, f64), PropagatorError> {
    let mut best_t = aos;
    let mut best_elev = f64::NEG_INFINITY;
    let mut t = aos;
    while t <= los {
        let elev = elevation_at(propagator, cache, satellite_id, target, target_ecef, t)?;
        if elev > best_elev {
            best_elev = elev;
            best_t = t;
        }
        t += step_s.max(MIN_STEP_S);
    }
    Ok((best_t, best_elev))
}

fn build_window(
    propagator: &dyn OrbitPropagator,
    cache: Option<&PositionCache>,
    satellite_id: &str,
    target: &GroundTarget,
    target_ecef: geometry::Vec3,
    aos: f64,
    los: f64,
    tca_step_s: f64,
) -> Result<PassWindow, PropagatorError> {
    let (aos_elev, aos_az) = window_at(propagator, cache, satellite_id, target, target_ecef, aos)?;
    let (los_elev, los_az) = window_at(propagator, cache, satellite_id, target, target_ecef, los)?;
    let (tca, peak_elevation_deg) =
        refine_tca(propagator, cache, satellite_id, target, target_ecef, aos, los, tca_step_s)?;
    let (tca_elev, tca_az) = window_at(propagator, cache, satellite_id, target, target_ecef, tca)?;
    let peak_elevation_deg = peak_elevation_deg.max(aos_elev).max(los_elev).max(tca_elev);
    let ascending = ascending_at(propagator, cache, satellite_id, tca)?;

    Ok(PassWindow {
        satellite_id_index: 0,
        aos_time: aos,
        tca_time: tca,
        los_time: los,
        aos_azimuth_deg: aos_az,
        tca_azimuth_deg: tca_az,
        los_azimuth_deg: los_az,
        peak_elevation_deg,
        ascending,
    })
}

/// Merges adjacent raw passes per spec.md §9: merge when the gap is
/// shorter than [`PASS_GAP_THRESHOLD_S`] *and* elevation never drops below
/// zero during the gap; otherwise keep them split.
fn maybe_merge(
    propagator: &dyn OrbitPropagator,
    cache: Option<&PositionCache>,
    satellite_id: &str,
    target: &GroundTarget,
    target_ecef: geometry::Vec3,
    passes: Vec<(f64, f64)>,
) -> Result<Vec<(f64, f64)>, PropagatorError> {
    if passes.is_empty() {
        return Ok(passes);
    }
    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(passes.len());
    merged.push(passes[0]);

    for &(aos, los) in &passes[1..] {
        let (_, prev_los) = *merged.last().unwrap();
        let gap = aos - prev_los;
        if gap < PASS_GAP_THRESHOLD_S {
            let mut never_below_zero = true;
            let mut t = prev_los;
            while t <= aos {
                let elev = elevation_at(propagator, cache, satellite_id, target, target_ecef, t)?;
                if elev < 0.0 {
                    never_below_zero = false;
                    break;
                }
                t += 1.0;
            }
            if never_below_zero {
                let last = merged.last_mut().unwrap();
                last.1 = los;
                continue;
            }
        }
        merged.push((aos, los));
    }

    Ok(merged)
}

/// Fixed-step pass finder (spec.md §4.2 "Fixed-step").
pub fn find_passes_fixed_step(
    propagator: &dyn OrbitPropagator,
    cache: Option<&PositionCache>,
    satellite_id: &str,
    target: &GroundTarget,
    target_ecef_cache: &TargetEcefCache,
    t0: f64,
    t1: f64,
    step_s: f64,
) -> Result<Vec<PassWindow>, PropagatorError> {
    let target_ecef = target_ecef_cache.ecef_of(target);
    let mut raw = Vec::new();
    let mut prev_visible = visible_at(propagator, cache, satellite_id, target, target_ecef, t0)?;
    let mut aos: Option<f64> = if prev_visible { Some(t0) } else { None };
    let mut t = t0 + step_s;

    while t <= t1 {
        let visible = visible_at(propagator, cache, satellite_id, target, target_ecef, t)?;
        if visible && !prev_visible {
            let a = bisect_boundary(propagator, cache, satellite_id, target, target_ecef, t - step_s, t)?;
            aos = Some(a);
        } else if !visible && prev_visible {
            if let Some(a) = aos.take() {
                let l = bisect_boundary(propagator, cache, satellite_id, target, target_ecef, t - step_s, t)?;
                raw.push((a, l));
            }
        }
        prev_visible = visible;
        t += step_s;
    }
    if let Some(a) = aos {
        raw.push((a, t1));
    }

    let merged = maybe_merge(propagator, cache, satellite_id, target, target_ecef, raw)?;
    merged
        .into_iter()
        .map(|(a, l)| build_window(propagator, cache, satellite_id, target, target_ecef, a, l, 1.0))
        .collect()
}

/// Adaptive pass finder (spec.md §4.2 "Adaptive"): expands the step while
/// far from visibility, contracts near the visibility circle, then bisects
/// to locate AOS/LOS precisely.
pub fn find_passes_adaptive(
    propagator: &dyn OrbitPropagator,
    cache: Option<&PositionCache>,
    satellite_id: &str,
    target: &GroundTarget,
    target_ecef_cache: &TargetEcefCache,
    t0: f64,
    t1: f64,
    orbital_period_s: f64,
) -> Result<Vec<PassWindow>, PropagatorError> {
    let target_ecef = target_ecef_cache.ecef_of(target);
    let coarse_seed = (orbital_period_s / 30.0).max(MIN_STEP_S);
    let max_step = (orbital_period_s / 4.0).max(coarse_seed);

    let required_radius_deg = match target.mission_type {
        TargetKind::Communication => {
            // Use a representative altitude sample at t0 for step sizing only.
            let sat0 = sample(propagator, cache, satellite_id, t0)?;
            visibility_radius_deg(sat0.alt_km, target.elevation_mask_deg)
        }
        TargetKind::Optical | TargetKind::Sar => {
            let sat0 = sample(propagator, cache, satellite_id, t0)?;
            visibility_radius_deg(sat0.alt_km, 0.0).max(target.sensor_half_fov_deg)
        }
    };

    let mut raw = Vec::new();
    let mut t = t0;
    let mut prev_visible = visible_at(propagator, cache, satellite_id, target, target_ecef, t)?;
    let mut aos: Option<f64> = if prev_visible { Some(t0) } else { None };

    while t < t1 {
        let sat = sample(propagator, cache, satellite_id, t)?;
        let angle = geometry::geocentric_angle_deg(sat.ecef_km, target_ecef);
        let proximity = (angle - required_radius_deg).abs();

        let step = if proximity < 2.0 * required_radius_deg.max(1.0) {
            MIN_STEP_S
        } else {
            max_step
        };
        let next_t = (t + step).min(t1);

        let visible = visible_at(propagator, cache, satellite_id, target, target_ecef, next_t)?;
        if visible && !prev_visible {
            let a = bisect_boundary(propagator, cache, satellite_id, target, target_ecef, t, next_t)?;
            aos = Some(a);
        } else if !visible && prev_visible {
            if let Some(a) = aos.take() {
                let l = bisect_boundary(propagator, cache, satellite_id, target, target_ecef, t, next_t)?;
                raw.push((a, l));
            }
        }
        prev_visible = visible;
        t = next_t;
    }
    if let Some(a) = aos {
        raw.push((a, t1));
    }

    let merged = maybe_merge(propagator, cache, satellite_id, target, target_ecef, raw)?;
    merged
        .into_iter()
        .map(|(a, l)| {
            let tca_step = ((l - a) / 20.0).clamp(1.0, 5.0);
            build_window(propagator, cache, satellite_id, target, target_ecef, a, l, tca_step)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbit::{OrbitPropagator, Sgp4Propagator};
    use crate::tle::tle_epoch_line1;
    use crate::types::Tle;

    fn iceye_tle() -> Tle {
        Tle {
            name: "ICEYE-X1".into(),
            line1: "1 43800U 18099AC  23045.50000000  .00000500  00000-0  25000-4 0  9997".into(),
            line2: "2 43800  97.6900 120.0000 0010000  80.0000 280.0000 15.23000000123456".into(),
        }
    }

    fn dubai() -> GroundTarget {
        GroundTarget {
            id: "t-dubai".into(),
            name: "Dubai".into(),
            latitude_deg: 25.2048,
            longitude_deg: 55.2708,
            altitude_km: 0.0,
            mission_type: TargetKind::Optical,
            elevation_mask_deg: 5.0,
            sensor_half_fov_deg: 45.0,
            max_roll_deg: 45.0,
            priority: 5,
        }
    }

    #[test]
    fn test_visibility_radius_shrinks_with_elevation_mask() {
        let at_horizon = visibility_radius_deg(500.0, 0.0);
        let at_ten_deg = visibility_radius_deg(500.0, 10.0);
        assert!(at_horizon > at_ten_deg);
    }

    #[test]
    fn test_fixed_step_finds_at_least_one_pass_over_12h() {
        let prop = Sgp4Propagator::new(&iceye_tle()).unwrap();
        let t0 = tle_epoch_line1(iceye_tle().line1.trim()).unwrap();
        let t1 = t0 + 12.0 * 3600.0;
        let ecef_cache = TargetEcefCache::new();
        let target = dubai();

        let passes =
            find_passes_fixed_step(&prop, None, "sat-1", &target, &ecef_cache, t0, t1, 1.0).unwrap();

        assert!(!passes.is_empty(), "expected at least one pass over 12h");
        for p in &passes {
            assert!(p.aos_time <= p.tca_time);
            assert!(p.tca_time <= p.los_time);
        }
    }

    #[test]
    fn test_adaptive_matches_fixed_step_pass_count() {
        let prop = Sgp4Propagator::new(&iceye_tle()).unwrap();
        let t0 = tle_epoch_line1(iceye_tle().line1.trim()).unwrap();
        let t1 = t0 + 12.0 * 3600.0;
        let ecef_cache = TargetEcefCache::new();
        let target = dubai();

        let fixed =
            find_passes_fixed_step(&prop, None, "sat-1", &target, &ecef_cache, t0, t1, 1.0).unwrap();
        let adaptive = find_passes_adaptive(
            &prop,
            None,
            "sat-1",
            &target,
            &ecef_cache,
            t0,
            t1,
            prop.orbital_period_s(),
        )
        .unwrap();

        assert_eq!(fixed.len(), adaptive.len());
        for (f, a) in fixed.iter().zip(adaptive.iter()) {
            assert!((f.aos_time - a.aos_time).abs() <= 1.0);
            assert!((f.los_time - a.los_time).abs() <= 1.0);
            assert!((f.peak_elevation_deg - a.peak_elevation_deg).abs() <= 0.1);
        }
    }
}
