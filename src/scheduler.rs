//! Scheduler (spec.md §4.6).
//!
//! Four algorithm variants share one skeleton (pre-filter feeds in the
//! right opportunity set, sort by start time, single chronological pass
//! mutating per-satellite [`AttitudeState`]). Satellites are scheduled
//! independently since attitude state is partitioned by satellite id
//! (spec.md §5) — nothing here depends on any other satellite's schedule,
//! so callers are free to fan this out with `rayon`.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::config::{Algorithm, SchedulerConfig};
use crate::feasibility::{check_feasibility, FeasibilityFailure, SlewLimits};
use crate::types::{AttitudeState, InvariantCheck, Opportunity, ScheduleMetrics, ScheduledOpportunity};

fn rejection_reason_str(failure: FeasibilityFailure) -> &'static str {
    failure.as_str()
}

fn bump_rejection_metric(metrics: &mut ScheduleMetrics, failure: FeasibilityFailure) {
    match failure {
        FeasibilityFailure::AttitudeLimit => metrics.rejected_attitude_limit += 1,
        FeasibilityFailure::InsufficientSlack => metrics.rejected_insufficient_slack += 1,
        FeasibilityFailure::ExceedsWindow => metrics.rejected_exceeds_window += 1,
    }
}

fn to_scheduled(
    opportunity: &Opportunity,
    maneuver_time_s: f64,
    slack_s: f64,
    previous_attitude: AttitudeState,
    new_attitude: AttitudeState,
) -> ScheduledOpportunity {
    ScheduledOpportunity {
        opportunity_id: opportunity.id.clone(),
        satellite_id: opportunity.satellite_id.clone(),
        target_id: opportunity.target_id.clone(),
        start: opportunity.start,
        end: opportunity.end,
        roll_deg: new_attitude.roll_deg,
        pitch_deg: new_attitude.pitch_deg,
        off_nadir_deg: opportunity.off_nadir_deg,
        delta_roll_deg: (new_attitude.roll_deg - previous_attitude.roll_deg).abs(),
        delta_pitch_deg: (new_attitude.pitch_deg - previous_attitude.pitch_deg).abs(),
        maneuver_time_s,
        slack_time_s: slack_s,
        composite_value: opportunity.composite_value,
    }
}

/// Schedules one satellite's candidates for the first-fit variants: accept
/// the first feasible candidate for a still-uncovered target, in
/// chronological order.
fn schedule_first_fit(
    mut candidates: Vec<Opportunity>,
    imaging_time_s: f64,
    limits: &SlewLimits,
    metrics: &mut ScheduleMetrics,
) -> (Vec<ScheduledOpportunity>, HashMap<String, &'static str>) {
    candidates.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal));

    let mut attitude = AttitudeState::default();
    let mut last_end = f64::NEG_INFINITY;
    let mut covered: HashSet<String> = HashSet::new();
    let mut accepted = Vec::new();
    let mut rejections = HashMap::new();

    for cand in &candidates {
        if covered.contains(&cand.target_id) {
            continue;
        }
        match check_feasibility(attitude, last_end, cand, imaging_time_s, limits) {
            Ok(result) => {
                accepted.push(to_scheduled(cand, result.maneuver_time_s, result.slack_s, attitude, result.new_attitude));
                attitude = result.new_attitude;
                last_end = cand.end;
                covered.insert(cand.target_id.clone());
                metrics.accepted += 1;
            }
            Err(failure) => {
                rejections.insert(cand.id.clone(), rejection_reason_str(failure));
                bump_rejection_metric(metrics, failure);
            }
        }
    }

    (accepted, rejections)
}

/// Schedules one satellite's candidates for the best-fit variants: within
/// a sliding look-ahead of the earliest feasible moment, accept the
/// highest composite-value candidate (tie-break lowest |incidence|, then
/// earliest start).
fn schedule_best_fit(
    mut candidates: Vec<Opportunity>,
    imaging_time_s: f64,
    look_window_s: f64,
    limits: &SlewLimits,
    metrics: &mut ScheduleMetrics,
) -> (Vec<ScheduledOpportunity>, HashMap<String, &'static str>) {
    candidates.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal));

    let mut attitude = AttitudeState::default();
    let mut last_end = f64::NEG_INFINITY;
    let mut covered: HashSet<String> = HashSet::new();
    let mut consumed = vec![false; candidates.len()];
    let mut accepted = Vec::new();
    let mut rejections = HashMap::new();

    loop {
        let mut feasible: Vec<(usize, crate::feasibility::FeasibilityResult)> = Vec::new();

        for (idx, cand) in candidates.iter().enumerate() {
            if consumed[idx] {
                continue;
            }
            if covered.contains(&cand.target_id) {
                consumed[idx] = true;
                continue;
            }
            match check_feasibility(attitude, last_end, cand, imaging_time_s, limits) {
                Ok(result) => feasible.push((idx, result)),
                Err(failure) => {
                    rejections.insert(cand.id.clone(), rejection_reason_str(failure));
                    bump_rejection_metric(metrics, failure);
                    consumed[idx] = true;
                }
            }
        }

        if feasible.is_empty() {
            break;
        }

        let earliest_start = feasible
            .iter()
            .map(|&(idx, _)| candidates[idx].start)
            .fold(f64::INFINITY, f64::min);

        let window: Vec<_> = feasible
            .into_iter()
            .filter(|&(idx, _)| candidates[idx].start <= earliest_start + look_window_s)
            .collect();

        let &(best_idx, best_result) = window
            .iter()
            .max_by(|&&(a, _), &&(b, _)| {
                let ca = &candidates[a];
                let cb = &candidates[b];
                ca.composite_value
                    .partial_cmp(&cb.composite_value)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| cb.off_nadir_deg.partial_cmp(&ca.off_nadir_deg).unwrap_or(Ordering::Equal))
                    .then_with(|| cb.start.partial_cmp(&ca.start).unwrap_or(Ordering::Equal))
            })
            .expect("window is non-empty");

        consumed[best_idx] = true;
        let cand = &candidates[best_idx];
        covered.insert(cand.target_id.clone());
        accepted.push(to_scheduled(
            cand,
            best_result.maneuver_time_s,
            best_result.slack_s,
            attitude,
            best_result.new_attitude,
        ));
        attitude = best_result.new_attitude;
        last_end = cand.end;
        metrics.accepted += 1;
    }

    (accepted, rejections)
}

/// Runs one algorithm's schedule for a single satellite's candidate
/// opportunities. `targets_total` is the number of distinct targets this
/// satellite had at least one candidate for, used for the metrics'
/// coverage ratio.
pub fn schedule_satellite(
    algorithm: Algorithm,
    candidates: Vec<Opportunity>,
    config: &SchedulerConfig,
) -> (Vec<ScheduledOpportunity>, HashMap<String, &'static str>, ScheduleMetrics) {
    let limits = config.slew_limits();
    let mut metrics = ScheduleMetrics {
        total_candidates: candidates.len(),
        targets_total: candidates.iter().map(|o| o.target_id.as_str()).collect::<HashSet<_>>().len(),
        ..Default::default()
    };

    let (accepted, rejections) = if algorithm.is_best_fit() {
        schedule_best_fit(candidates, config.imaging_time_s, config.look_window_s, &limits, &mut metrics)
    } else {
        schedule_first_fit(candidates, config.imaging_time_s, &limits, &mut metrics)
    };

    metrics.targets_covered = accepted.iter().map(|s| s.target_id.as_str()).collect::<HashSet<_>>().len();
    if !accepted.is_empty() {
        let n = accepted.len() as f64;
        metrics.mean_incidence_deg = accepted.iter().map(|s| s.off_nadir_deg).sum::<f64>() / n;
        metrics.mean_composite_value = accepted.iter().map(|s| s.composite_value).sum::<f64>() / n;
        metrics.total_slew_time_s = accepted.iter().map(|s| s.maneuver_time_s).sum();
    }

    (accepted, rejections, metrics)
}

/// Checks the invariants spec.md §4.6/§8 requires for a single satellite's
/// accepted schedule. Returns one [`InvariantCheck`] per property.
pub fn check_invariants(schedule: &[ScheduledOpportunity], limits: &SlewLimits) -> Vec<InvariantCheck> {
    let mut checks = Vec::new();

    let mut no_overlap = true;
    let mut overlap_detail = None;
    for pair in schedule.windows(2) {
        if pair[0].end > pair[1].start {
            no_overlap = false;
            overlap_detail = Some(format!(
                "{} ends at {} after {} starts at {}",
                pair[0].opportunity_id, pair[0].end, pair[1].opportunity_id, pair[1].start
            ));
            break;
        }
    }
    checks.push(InvariantCheck { name: "no_overlap".into(), ok: no_overlap, details: overlap_detail });

    let mut attitude_bounds = true;
    let mut attitude_detail = None;
    for s in schedule {
        if s.roll_deg.abs() > limits.max_spacecraft_roll_deg + 1e-9
            || s.pitch_deg.abs() > limits.max_spacecraft_pitch_deg + 1e-9
        {
            attitude_bounds = false;
            attitude_detail = Some(format!("{} exceeds attitude limits", s.opportunity_id));
            break;
        }
    }
    checks.push(InvariantCheck { name: "attitude_bounds".into(), ok: attitude_bounds, details: attitude_detail });

    let mut non_negative_slack = true;
    let mut slack_detail = None;
    for s in schedule {
        if s.slack_time_s < -1e-9 {
            non_negative_slack = false;
            slack_detail = Some(format!("{} has slack {}", s.opportunity_id, s.slack_time_s));
            break;
        }
    }
    checks.push(InvariantCheck { name: "non_negative_slack".into(), ok: non_negative_slack, details: slack_detail });

    let mut time_monotonic = true;
    let mut monotonic_detail = None;
    for pair in schedule.windows(2) {
        if pair[1].start < pair[0].start {
            time_monotonic = false;
            monotonic_detail = Some(format!("{} precedes {}", pair[1].opportunity_id, pair[0].opportunity_id));
            break;
        }
    }
    checks.push(InvariantCheck { name: "time_monotonicity".into(), ok: time_monotonic, details: monotonic_detail });

    checks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::MultiCriteriaWeights;

    fn limits() -> SlewLimits {
        SlewLimits {
            max_roll_rate_dps: 5.0,
            max_roll_accel_dps2: 5.0,
            max_pitch_rate_dps: 5.0,
            max_pitch_accel_dps2: 5.0,
            max_spacecraft_roll_deg: 45.0,
            max_spacecraft_pitch_deg: 45.0,
            settle_time_s: 0.0,
        }
    }

    fn opp(id: &str, target: &str, start: f64, roll: f64, value: f64) -> Opportunity {
        Opportunity {
            id: id.into(),
            satellite_id: "sat-1".into(),
            target_id: target.into(),
            start,
            end: start + 5.0,
            peak_elevation_deg: 60.0,
            roll_deg: roll,
            pitch_deg: 0.0,
            off_nadir_deg: roll.abs(),
            base_value: 0.0,
            quality: 1.0,
            composite_value: value,
        }
    }

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            imaging_time_s: 5.0,
            max_roll_rate_dps: 5.0,
            max_roll_accel_dps2: 5.0,
            max_pitch_rate_dps: 5.0,
            max_pitch_accel_dps2: 5.0,
            max_spacecraft_roll_deg: 45.0,
            max_spacecraft_pitch_deg: 45.0,
            look_window_s: 600.0,
            quality_model: crate::quality::QualityModel::Off,
            ideal_incidence_deg: 35.0,
            band_width_deg: 7.5,
            weights: MultiCriteriaWeights::balanced(),
            conflict_strategy: crate::conflict::ConflictStrategy::BestGeometry,
            conflict_time_threshold_s: 300.0,
            settle_time_s: 0.0,
        }
    }

    #[test]
    fn test_first_fit_accepts_non_overlapping_targets() {
        let candidates = vec![
            opp("a", "t1", 0.0, 5.0, 0.5),
            opp("b", "t2", 100.0, 5.0, 0.5),
        ];
        let (accepted, rejections, metrics) = schedule_satellite(Algorithm::FirstFit, candidates, &config());
        assert_eq!(accepted.len(), 2);
        assert!(rejections.is_empty());
        assert_eq!(metrics.accepted, 2);
    }

    #[test]
    fn test_first_fit_skips_second_opportunity_for_covered_target() {
        let candidates = vec![opp("a", "t1", 0.0, 5.0, 0.5), opp("b", "t1", 100.0, 5.0, 0.9)];
        let (accepted, _rej, _metrics) = schedule_satellite(Algorithm::FirstFit, candidates, &config());
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].opportunity_id, "a");
    }

    #[test]
    fn test_best_fit_prefers_higher_priority_within_window() {
        // spec.md §8 scenario 4: later, higher-value candidate wins.
        let candidates = vec![opp("early", "t1", 0.0, 5.0, 0.4), opp("late", "t2", 50.0, 5.0, 0.9)];
        let mut cfg = config();
        cfg.look_window_s = 600.0;
        let (accepted, _rej, _metrics) = schedule_satellite(Algorithm::BestFit, candidates, &cfg);
        assert_eq!(accepted[0].opportunity_id, "late");
    }

    #[test]
    fn test_no_overlap_invariant_detects_overlap() {
        let schedule = vec![
            ScheduledOpportunity {
                opportunity_id: "a".into(),
                satellite_id: "s".into(),
                target_id: "t1".into(),
                start: 0.0,
                end: 10.0,
                roll_deg: 0.0,
                pitch_deg: 0.0,
                off_nadir_deg: 0.0,
                delta_roll_deg: 0.0,
                delta_pitch_deg: 0.0,
                maneuver_time_s: 0.0,
                slack_time_s: 0.0,
                composite_value: 1.0,
            },
            ScheduledOpportunity {
                opportunity_id: "b".into(),
                satellite_id: "s".into(),
                target_id: "t2".into(),
                start: 5.0,
                end: 15.0,
                roll_deg: 0.0,
                pitch_deg: 0.0,
                off_nadir_deg: 0.0,
                delta_roll_deg: 0.0,
                delta_pitch_deg: 0.0,
                maneuver_time_s: 0.0,
                slack_time_s: 0.0,
                composite_value: 1.0,
            },
        ];
        let checks = check_invariants(&schedule, &limits());
        let overlap_check = checks.iter().find(|c| c.name == "no_overlap").unwrap();
        assert!(!overlap_check.ok);
    }

    #[test]
    fn test_pitch_zero_equivalence() {
        // spec.md §8: with max_spacecraft_pitch=0, roll+pitch variants must
        // match their roll-only counterparts shot-for-shot when given the
        // same (roll-only) candidate set.
        let candidates = vec![opp("a", "t1", 0.0, 10.0, 0.5), opp("b", "t2", 200.0, -5.0, 0.5)];
        let cfg = config();
        let (ff, _, _) = schedule_satellite(Algorithm::FirstFit, candidates.clone(), &cfg);
        let (rpff, _, _) = schedule_satellite(Algorithm::RollPitchFirstFit, candidates, &cfg);
        assert_eq!(ff.len(), rpff.len());
        for (a, b) in ff.iter().zip(rpff.iter()) {
            assert_eq!(a.opportunity_id, b.opportunity_id);
            assert_eq!(a.start, b.start);
        }
    }
}
