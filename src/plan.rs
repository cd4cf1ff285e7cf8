//! Planning orchestration facade (spec.md §6).
//!
//! Validates a [`PlanRequest`], fans the (satellite, target) visibility and
//! opportunity search out across `rayon`, runs every requested scheduler
//! algorithm, resolves constellation conflicts, and assembles a
//! [`PlanResponse`]. Mirrors the teacher's `main.rs` top-level shape
//! (parse config, `par_iter` the satellite/target matrix, collect) scaled up
//! to the richer error and metrics model this spec needs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{PositionCache, TargetEcefCache};
use crate::config::{Algorithm, SchedulerConfig};
use crate::conflict::{self, ConflictResolutionResult};
use crate::error::{PlanError, PlanResult, PropagatorError};
use crate::opportunity;
use crate::orbit::{OrbitPropagator, Sgp4Propagator};
use crate::quality;
use crate::scheduler;
use crate::tle::validate_tle;
use crate::types::{GroundTarget, InvariantCheck, Opportunity, PassWindow, ScheduleMetrics, ScheduledOpportunity, Satellite};
use crate::visibility;

/// Cooperative cancellation (spec.md §5): checked between pairs and between
/// algorithm runs, never pre-empted mid-computation.
#[derive(Debug, Default)]
pub struct CancellationToken(AtomicBool);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Relaxed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Horizon {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Horizon {
    fn start_unix(&self) -> f64 {
        self.start.timestamp() as f64
    }

    fn end_unix(&self) -> f64 {
        self.end.timestamp() as f64
    }
}

fn default_algorithms() -> Vec<Algorithm> {
    vec![Algorithm::FirstFit]
}

/// Top-level planning request (spec.md §6). Field names follow the
/// original service's `backend/schemas/planning.py::PlanningRequest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub satellites: Vec<Satellite>,
    pub targets: Vec<GroundTarget>,
    pub horizon: Horizon,
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<Algorithm>,
    #[serde(default)]
    pub scheduler_config: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmRun {
    pub algorithm: Algorithm,
    pub schedule: Vec<ScheduledOpportunity>,
    pub metrics: ScheduleMetrics,
    pub invariants: Vec<InvariantCheck>,
    pub conflicts: ConflictResolutionResult,
    pub rejected_opportunities: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub runs: Vec<AlgorithmRun>,
}

fn validate_target(target: &GroundTarget) -> PlanResult<()> {
    let invalid = |reason: &str| PlanError::InvalidTarget { target_id: target.id.clone(), reason: reason.to_string() };
    if !(-90.0..=90.0).contains(&target.latitude_deg) {
        return Err(invalid("latitude_deg must be within [-90, 90]"));
    }
    if !(-180.0..=180.0).contains(&target.longitude_deg) {
        return Err(invalid("longitude_deg must be within [-180, 180]"));
    }
    if !(1..=5).contains(&target.priority) {
        return Err(invalid("priority must be within [1, 5]"));
    }
    if !target.elevation_mask_deg.is_finite() {
        return Err(invalid("elevation_mask_deg must be finite"));
    }
    if target.sensor_half_fov_deg <= 0.0 {
        return Err(invalid("sensor_half_fov_deg must be > 0"));
    }
    if target.max_roll_deg < 0.0 {
        return Err(invalid("max_roll_deg must be >= 0"));
    }
    Ok(())
}

/// Validates the whole request (spec.md §6: "validation errors abort a run
/// before any computation").
pub fn validate_request(request: &PlanRequest) -> PlanResult<()> {
    if request.horizon.end <= request.horizon.start {
        return Err(PlanError::InvalidHorizon { reason: "horizon end must be after horizon start".to_string() });
    }
    for satellite in &request.satellites {
        validate_tle(&satellite.id, &satellite.tle)?;
    }
    for target in &request.targets {
        validate_target(target)?;
    }
    request.scheduler_config.validate()?;
    Ok(())
}

/// Returns the satellite sensor's pitch capability as seen by one
/// algorithm: roll-only variants never pitch regardless of hardware, and a
/// `max_spacecraft_pitch_deg` of zero in the scheduler config collapses
/// every variant to roll-only (this is what makes the
/// roll+pitch-first-fit/first-fit equivalence in spec.md §8 hold without a
/// special case).
fn effective_satellite_for_algorithm(satellite: &Satellite, algorithm: Algorithm, config: &SchedulerConfig) -> Satellite {
    let mut effective = satellite.clone();
    effective.sensor.max_pitch_deg = if algorithm.uses_pitch() {
        satellite.sensor.max_pitch_deg.min(config.max_spacecraft_pitch_deg)
    } else {
        0.0
    };
    effective
}

struct PassEntry {
    passes: Vec<PassWindow>,
}

/// Computes AOS/TCA/LOS windows for every (satellite, target) pair in
/// parallel. Passes don't depend on pitch capability, so this result is
/// shared across every algorithm run. A propagation failure removes that
/// one pair from the candidate pool and is counted, never aborts the run.
fn compute_passes(
    satellites: &[Satellite],
    targets: &[GroundTarget],
    horizon: &Horizon,
    cache: &PositionCache,
    target_cache: &TargetEcefCache,
    token: Option<&CancellationToken>,
) -> PlanResult<(HashMap<(String, String), PassEntry>, HashMap<String, Sgp4Propagator>, usize)> {
    let mut propagators = HashMap::new();
    let mut propagation_errors = 0usize;

    for satellite in satellites {
        match Sgp4Propagator::new(&satellite.tle) {
            Ok(prop) => {
                propagators.insert(satellite.id.clone(), prop);
            }
            Err(e) => {
                warn!(satellite_id = %satellite.id, error = %e, "propagator construction failed");
                propagation_errors += targets.len();
            }
        }
    }

    let pairs: Vec<(&Satellite, &GroundTarget)> = satellites
        .iter()
        .filter(|s| propagators.contains_key(&s.id))
        .flat_map(|s| targets.iter().map(move |t| (s, t)))
        .collect();

    if let Some(token) = token {
        if token.is_cancelled() {
            return Err(PlanError::RunCancelled);
        }
    }

    let t0 = horizon.start_unix();
    let t1 = horizon.end_unix();

    let results: Vec<((String, String), Result<Vec<PassWindow>, PropagatorError>)> = pairs
        .par_iter()
        .map(|(satellite, target)| {
            let prop = propagators.get(&satellite.id).expect("filtered above");
            let result = visibility::find_passes_adaptive(
                prop,
                Some(cache),
                &satellite.id,
                target,
                target_cache,
                t0,
                t1,
                prop.orbital_period_s(),
            );
            ((satellite.id.clone(), target.id.clone()), result)
        })
        .collect();

    let mut entries = HashMap::new();
    for (key, result) in results {
        match result {
            Ok(passes) => {
                entries.insert(key, PassEntry { passes });
            }
            Err(e) => {
                debug!(satellite_id = %key.0, target_id = %key.1, error = %e, "visibility computation failed");
                propagation_errors += 1;
            }
        }
    }

    Ok((entries, propagators, propagation_errors))
}

/// spec.md §4.6 "Pre-filter": for roll-only algorithms, keep only the
/// single best (lowest |off-nadir|) opportunity per target across every
/// pass in the horizon, before scheduling. Ties keep the earliest start.
fn prefilter_best_per_target(candidates: Vec<Opportunity>) -> Vec<Opportunity> {
    let mut best: HashMap<String, Opportunity> = HashMap::new();
    for opp in candidates {
        match best.get(&opp.target_id) {
            Some(current) if current.off_nadir_deg.abs() <= opp.off_nadir_deg.abs() => {}
            _ => {
                best.insert(opp.target_id.clone(), opp);
            }
        }
    }
    best.into_values().collect()
}

/// Builds and scores every candidate opportunity for one algorithm, grouped
/// by satellite id.
fn build_scored_opportunities(
    algorithm: Algorithm,
    satellites: &[Satellite],
    targets_by_id: &HashMap<&str, &GroundTarget>,
    passes: &HashMap<(String, String), PassEntry>,
    propagators: &HashMap<String, Sgp4Propagator>,
    cache: &PositionCache,
    target_cache: &TargetEcefCache,
    config: &SchedulerConfig,
) -> (HashMap<String, Vec<Opportunity>>, usize) {
    let mut propagation_errors = 0usize;
    let mut by_satellite: HashMap<String, Vec<Opportunity>> = HashMap::new();

    for satellite in satellites {
        let Some(prop) = propagators.get(&satellite.id) else { continue };
        let effective = effective_satellite_for_algorithm(satellite, algorithm, config);
        let mut candidates = Vec::new();

        for (&target_id, &target) in targets_by_id.iter() {
            let Some(entry) = passes.get(&(satellite.id.clone(), target_id.to_string())) else { continue };
            let mut per_pair = Vec::new();
            let mut failed = false;
            for pass in &entry.passes {
                match opportunity::build_opportunities(
                    prop,
                    Some(cache),
                    &effective,
                    target,
                    target_cache,
                    pass,
                    config.imaging_time_s,
                ) {
                    Ok(opps) => per_pair.extend(opps),
                    Err(e) => {
                        debug!(satellite_id = %satellite.id, target_id = %target.id, error = %e, "opportunity build failed");
                        failed = true;
                        break;
                    }
                }
            }
            if failed {
                propagation_errors += 1;
                continue;
            }
            candidates.extend(per_pair);
        }

        // spec.md §4.6 pre-filter: roll-only algorithms collapse a target
        // visible across multiple passes to its single lowest-|off-nadir|
        // opportunity before scheduling ever sees it. Roll+pitch algorithms
        // keep every sampled candidate since the scheduler itself picks
        // among them.
        let candidates = if algorithm.uses_pitch() {
            candidates
        } else {
            prefilter_best_per_target(candidates)
        };

        // Score each (satellite, target) group's samples chronologically for
        // the timing term (spec.md §4.4).
        let mut scored = candidates;
        let mut grouped: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, opp) in scored.iter().enumerate() {
            grouped.entry(opp.target_id.clone()).or_default().push(idx);
        }
        for (target_id, idxs) in grouped {
            let total = idxs.len();
            let Some(target) = targets_by_id.get(target_id.as_str()) else { continue };
            let mut ranked = idxs;
            ranked.sort_by(|&a, &b| scored[a].start.partial_cmp(&scored[b].start).unwrap_or(std::cmp::Ordering::Equal));
            for (rank, idx) in ranked.into_iter().enumerate() {
                let off_nadir = scored[idx].off_nadir_deg;
                let q = quality::quality(config.quality_model, Some(off_nadir), config.ideal_incidence_deg, config.band_width_deg);
                let value = quality::composite_value(&config.weights, target.priority, q, rank, total);
                scored[idx].quality = q;
                scored[idx].base_value = quality::priority_term(target.priority);
                scored[idx].composite_value = value;
            }
        }

        by_satellite.insert(satellite.id.clone(), scored);
    }

    (by_satellite, propagation_errors)
}

/// Runs a single algorithm end to end: score, schedule per satellite,
/// combine, resolve conflicts, check invariants.
fn run_algorithm(
    algorithm: Algorithm,
    satellites: &[Satellite],
    targets_by_id: &HashMap<&str, &GroundTarget>,
    passes: &HashMap<(String, String), PassEntry>,
    propagators: &HashMap<String, Sgp4Propagator>,
    cache: &PositionCache,
    target_cache: &TargetEcefCache,
    config: &SchedulerConfig,
    base_propagation_errors: usize,
) -> AlgorithmRun {
    let started = Instant::now();
    let (candidates_by_satellite, extra_errors) =
        build_scored_opportunities(algorithm, satellites, targets_by_id, passes, propagators, cache, target_cache, config);

    let per_satellite: Vec<(Vec<ScheduledOpportunity>, HashMap<String, &'static str>, ScheduleMetrics)> =
        candidates_by_satellite
            .into_par_iter()
            .map(|(_satellite_id, candidates)| scheduler::schedule_satellite(algorithm, candidates, config))
            .collect();

    let mut schedule = Vec::new();
    let mut rejected_opportunities = HashMap::new();
    let mut metrics = ScheduleMetrics::default();

    for (accepted, rejections, partial) in per_satellite {
        schedule.extend(accepted);
        for (id, reason) in rejections {
            rejected_opportunities.insert(id, reason.to_string());
        }
        metrics.total_candidates += partial.total_candidates;
        metrics.accepted += partial.accepted;
        metrics.rejected_attitude_limit += partial.rejected_attitude_limit;
        metrics.rejected_insufficient_slack += partial.rejected_insufficient_slack;
        metrics.rejected_exceeds_window += partial.rejected_exceeds_window;
        metrics.targets_covered += partial.targets_covered;
        metrics.targets_total += partial.targets_total;
        metrics.total_slew_time_s += partial.total_slew_time_s;
    }

    schedule.sort_by(|a, b| {
        a.satellite_id.cmp(&b.satellite_id).then_with(|| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal))
    });

    let limits = config.slew_limits();
    let mut invariants = Vec::new();
    {
        let mut start = 0;
        while start < schedule.len() {
            let mut end = start + 1;
            while end < schedule.len() && schedule[end].satellite_id == schedule[start].satellite_id {
                end += 1;
            }
            invariants.extend(scheduler::check_invariants(&schedule[start..end], &limits));
            start = end;
        }
    }

    let (resolved_schedule, conflicts) =
        conflict::resolve_conflicts(schedule, config.conflict_strategy, config.conflict_time_threshold_s);

    if !resolved_schedule.is_empty() {
        let n = resolved_schedule.len() as f64;
        metrics.mean_incidence_deg = resolved_schedule.iter().map(|s| s.off_nadir_deg).sum::<f64>() / n;
        metrics.mean_composite_value = resolved_schedule.iter().map(|s| s.composite_value).sum::<f64>() / n;
    }
    metrics.accepted = resolved_schedule.len();
    metrics.propagation_error_count = base_propagation_errors + extra_errors;
    metrics.runtime_ms = started.elapsed().as_secs_f64() * 1000.0;

    AlgorithmRun { algorithm, schedule: resolved_schedule, metrics, invariants, conflicts, rejected_opportunities }
}

/// Runs the full plan: validate, compute visibility once, run every
/// requested algorithm, and assemble the response (spec.md §6).
pub fn run(request: &PlanRequest, token: Option<&CancellationToken>) -> PlanResult<PlanResponse> {
    validate_request(request)?;

    let cache = PositionCache::new();
    let target_cache = TargetEcefCache::new();

    let (passes, propagators, base_propagation_errors) =
        compute_passes(&request.satellites, &request.targets, &request.horizon, &cache, &target_cache, token)?;

    let targets_by_id: HashMap<&str, &GroundTarget> = request.targets.iter().map(|t| (t.id.as_str(), t)).collect();

    let mut runs = Vec::with_capacity(request.algorithms.len());
    for &algorithm in &request.algorithms {
        if let Some(token) = token {
            if token.is_cancelled() {
                return Err(PlanError::RunCancelled);
            }
        }
        info!(?algorithm, "running scheduler algorithm");
        runs.push(run_algorithm(
            algorithm,
            &request.satellites,
            &targets_by_id,
            &passes,
            &propagators,
            &cache,
            &target_cache,
            &request.scheduler_config,
            base_propagation_errors,
        ));
    }

    Ok(PlanResponse { runs })
}
