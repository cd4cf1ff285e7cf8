//! Constellation conflict resolution (spec.md §4.7).
//!
//! Detects scheduling conflicts where two *different* satellites both
//! accept an opportunity for the same target with overlapping (or
//! near-overlapping) windows, then picks a single winner per conflict
//! group under one of three strategies. Grounded on the original
//! service's `ConstellationConflictResolver`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::ScheduledOpportunity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    BestGeometry,
    FirstAvailable,
    LoadBalance,
}

impl Default for ConflictStrategy {
    fn default() -> Self {
        ConflictStrategy::BestGeometry
    }
}

impl ConflictStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictStrategy::BestGeometry => "best_geometry",
            ConflictStrategy::FirstAvailable => "first_available",
            ConflictStrategy::LoadBalance => "load_balance",
        }
    }
}

/// Audit record for one resolved conflict (spec.md §4.7, mirrors the
/// original service's `ConflictInfo.to_dict()`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub target_id: String,
    pub conflicting_satellite_ids: Vec<String>,
    pub resolution_strategy: String,
    pub winner_satellite_id: String,
    pub winner_opportunity_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConflictResolutionResult {
    pub conflicts: Vec<ConflictRecord>,
    pub conflicts_resolved: usize,
    pub passes_removed: usize,
}

/// Two windows conflict when they overlap once each is extended outward by
/// `time_threshold_s` on both ends.
fn overlaps_within_threshold(a: &ScheduledOpportunity, b: &ScheduledOpportunity, time_threshold_s: f64) -> bool {
    let a_start = a.start - time_threshold_s;
    let a_end = a.end + time_threshold_s;
    !(b.end < a_start || b.start > a_end)
}

/// Groups schedule entries by target, one group per target that has at
/// least one cross-satellite overlap (indices into `schedule`). Matches
/// the original's single-group-per-target behaviour rather than computing
/// full connected components.
fn detect_conflict_groups(schedule: &[ScheduledOpportunity], time_threshold_s: f64) -> Vec<(String, Vec<usize>)> {
    let mut by_target: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, s) in schedule.iter().enumerate() {
        by_target.entry(s.target_id.as_str()).or_default().push(idx);
    }

    let mut groups = Vec::new();
    for (target, idxs) in by_target {
        if idxs.len() < 2 {
            continue;
        }
        let mut group: Vec<usize> = Vec::new();
        for (i, &idx1) in idxs.iter().enumerate() {
            for &idx2 in &idxs[i + 1..] {
                if schedule[idx1].satellite_id == schedule[idx2].satellite_id {
                    continue;
                }
                if overlaps_within_threshold(&schedule[idx1], &schedule[idx2], time_threshold_s) {
                    if group.is_empty() {
                        group.push(idx1);
                    }
                    if !group.contains(&idx2) {
                        group.push(idx2);
                    }
                }
            }
        }
        if !group.is_empty() {
            groups.push((target.to_string(), group));
        }
    }
    groups
}

fn select_winner(
    schedule: &[ScheduledOpportunity],
    group: &[usize],
    strategy: ConflictStrategy,
    loads: &HashMap<String, usize>,
) -> usize {
    match strategy {
        ConflictStrategy::BestGeometry => *group
            .iter()
            .min_by(|&&a, &&b| {
                schedule[a]
                    .off_nadir_deg
                    .abs()
                    .partial_cmp(&schedule[b].off_nadir_deg.abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("group is non-empty"),
        ConflictStrategy::FirstAvailable => *group
            .iter()
            .min_by(|&&a, &&b| schedule[a].start.partial_cmp(&schedule[b].start).unwrap_or(std::cmp::Ordering::Equal))
            .expect("group is non-empty"),
        ConflictStrategy::LoadBalance => *group
            .iter()
            .min_by_key(|&&idx| loads.get(&schedule[idx].satellite_id).copied().unwrap_or(0))
            .expect("group is non-empty"),
    }
}

/// Detects and resolves conflicts across a combined, multi-satellite
/// schedule. Idempotent: re-running on an already-resolved schedule
/// detects no further conflicts, since each target then has at most one
/// surviving satellite.
pub fn resolve_conflicts(
    schedule: Vec<ScheduledOpportunity>,
    strategy: ConflictStrategy,
    time_threshold_s: f64,
) -> (Vec<ScheduledOpportunity>, ConflictResolutionResult) {
    let groups = detect_conflict_groups(&schedule, time_threshold_s);
    if groups.is_empty() {
        return (schedule, ConflictResolutionResult::default());
    }

    let mut loads: HashMap<String, usize> = HashMap::new();
    let mut to_remove = vec![false; schedule.len()];
    let mut records = Vec::with_capacity(groups.len());

    for (target_id, group) in &groups {
        let winner_idx = select_winner(&schedule, group, strategy, &loads);
        let winner_satellite_id = schedule[winner_idx].satellite_id.clone();

        let conflicting_satellite_ids: Vec<String> =
            group.iter().map(|&idx| schedule[idx].satellite_id.clone()).collect();

        for &idx in group {
            if idx != winner_idx {
                to_remove[idx] = true;
            }
        }

        *loads.entry(winner_satellite_id.clone()).or_insert(0) += 1;

        records.push(ConflictRecord {
            target_id: target_id.clone(),
            conflicting_satellite_ids,
            resolution_strategy: strategy.as_str().to_string(),
            winner_satellite_id,
            winner_opportunity_id: schedule[winner_idx].opportunity_id.clone(),
        });
    }

    let passes_removed = to_remove.iter().filter(|&&r| r).count();
    let resolved: Vec<ScheduledOpportunity> = schedule
        .into_iter()
        .zip(to_remove)
        .filter_map(|(s, removed)| if removed { None } else { Some(s) })
        .collect();

    let conflicts_resolved = records.len();
    (resolved, ConflictResolutionResult { conflicts: records, conflicts_resolved, passes_removed })
}
