//! Orbital propagator adapter (spec.md §4.1).
//!
//! Wraps `sgp4` directly rather than through `predict-rs` (see DESIGN.md):
//! the spec's roll/pitch decomposition needs the satellite's inertial
//! velocity vector, which `predict-rs`'s observer-only API does not expose.
//! The adapter is a pure function of time; callers are expected to front it
//! with [`crate::cache::PositionCache`].

use sgp4::{Constants, Elements, MinutesSinceEpoch};

use crate::error::PropagatorError;
use crate::geometry::{self, Vec3};
use crate::tle::tle_epoch_line1;
use crate::types::Tle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatState {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_km: f64,
    pub ecef_km: Vec3,
    pub vel_ecef_km_s: Vec3,
}

/// Contract every propagator adapter satisfies (spec.md §4.1). Parameterised
/// so tests can substitute a synthetic propagator without an SGP4 element
/// set.
pub trait OrbitPropagator: Send + Sync {
    fn position_at(&self, unix_time_s: f64) -> Result<SatState, PropagatorError>;
    fn orbital_period_s(&self) -> f64;
}

pub struct Sgp4Propagator {
    constants: Constants,
    epoch_unix_s: f64,
    period_s: f64,
}

impl Sgp4Propagator {
    pub fn new(tle: &Tle) -> Result<Self, PropagatorError> {
        let elements = Elements::from_tle(
            Some(tle.name.clone()),
            tle.line1.as_bytes(),
            tle.line2.as_bytes(),
        )
        .map_err(|e| PropagatorError::Sgp4(e.to_string()))?;

        let epoch_unix_s = tle_epoch_line1(tle.line1.trim())
            .ok_or_else(|| PropagatorError::UnusableEpoch(tle.line1.clone()))?;

        // Mean motion is revolutions per day.
        let period_s = if elements.mean_motion > 0.0 {
            86_400.0 / elements.mean_motion
        } else {
            return Err(PropagatorError::UnusableEpoch(
                "mean motion is non-positive".to_string(),
            ));
        };

        let constants = Constants::from_elements(&elements)
            .map_err(|e| PropagatorError::Sgp4(e.to_string()))?;

        Ok(Sgp4Propagator { constants, epoch_unix_s, period_s })
    }
}

impl OrbitPropagator for Sgp4Propagator {
    fn position_at(&self, unix_time_s: f64) -> Result<SatState, PropagatorError> {
        let minutes_since_epoch = (unix_time_s - self.epoch_unix_s) / 60.0;

        let prediction = self
            .constants
            .propagate(MinutesSinceEpoch(minutes_since_epoch))
            .map_err(|e| PropagatorError::Sgp4(e.to_string()))?;

        let (ecef_km, vel_ecef_km_s) =
            geometry::teme_to_ecef(prediction.position, prediction.velocity, unix_time_s);
        let (lat_deg, lon_deg, alt_km) = geometry::ecef_to_geodetic(ecef_km);

        Ok(SatState { lat_deg, lon_deg, alt_km, ecef_km, vel_ecef_km_s })
    }

    fn orbital_period_s(&self) -> f64 {
        self.period_s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iss_tle() -> Tle {
        Tle {
            name: "ISS (ZARYA)".into(),
            line1: "1 25544U 98067A   23045.50000000  .00001764  00000-0  40295-4 0  9991".into(),
            line2: "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.49560609373456".into(),
        }
    }

    #[test]
    fn test_propagator_builds_from_valid_tle() {
        let prop = Sgp4Propagator::new(&iss_tle()).unwrap();
        assert!(prop.orbital_period_s() > 5000.0 && prop.orbital_period_s() < 6500.0);
    }

    #[test]
    fn test_position_roundtrips_to_plausible_altitude() {
        let prop = Sgp4Propagator::new(&iss_tle()).unwrap();
        let epoch = tle_epoch_line1(iss_tle().line1.trim()).unwrap();
        let state = prop.position_at(epoch + 600.0).unwrap();
        // ISS orbits at roughly 400-420 km.
        assert!(state.alt_km > 300.0 && state.alt_km < 500.0);
        assert!(state.lat_deg.abs() <= 90.0);
    }

    #[test]
    fn test_position_is_deterministic() {
        let prop = Sgp4Propagator::new(&iss_tle()).unwrap();
        let epoch = tle_epoch_line1(iss_tle().line1.trim()).unwrap();
        let a = prop.position_at(epoch + 1234.0).unwrap();
        let b = prop.position_at(epoch + 1234.0).unwrap();
        assert_eq!(a.ecef_km, b.ecef_km);
    }
}
