//! Read-heavy caches for the propagator and target geometry (spec.md §4.1,
//! §5, §9 "Look-back caches"). Pure optimisations: every caller must get
//! the same answer with caching disabled. Backed by `DashMap` for the
//! fine-grained concurrent access the spec calls for.

use dashmap::DashMap;

use crate::error::PropagatorError;
use crate::geometry::{self, Vec3};
use crate::orbit::{OrbitPropagator, SatState};
use crate::types::{GroundTarget, SatelliteId};

/// `(satellite_id, t quantised to whole seconds) -> SatState`.
#[derive(Default)]
pub struct PositionCache {
    entries: DashMap<(SatelliteId, i64), SatState>,
}

impl PositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position_at(
        &self,
        satellite_id: &str,
        propagator: &dyn OrbitPropagator,
        unix_time_s: f64,
    ) -> Result<SatState, PropagatorError> {
        let key = (satellite_id.to_string(), unix_time_s.round() as i64);
        if let Some(state) = self.entries.get(&key) {
            return Ok(*state);
        }
        let state = propagator.position_at(unix_time_s)?;
        self.entries.insert(key, state);
        Ok(state)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `target_id -> ECEF km`, since a target's ground position never changes
/// within a run.
#[derive(Default)]
pub struct TargetEcefCache {
    entries: DashMap<String, Vec3>,
}

impl TargetEcefCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ecef_of(&self, target: &GroundTarget) -> Vec3 {
        if let Some(v) = self.entries.get(target.id()) {
            return *v;
        }
        let v = geometry::geodetic_to_ecef(
            target.latitude_deg,
            target.longitude_deg,
            target.altitude_km,
        );
        self.entries.insert(target.id().to_string(), v);
        v
    }
}
