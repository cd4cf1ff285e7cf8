//! Export adapters (spec.md §6 "Bit-exact formats").
//!
//! Pure serialization over the public [`PlanResponse`]/[`ScheduledOpportunity`]
//! types — no planning logic lives here.

use std::io::Write;

use serde::Serialize;

use crate::error::{PlanError, PlanResult};
use crate::plan::{AlgorithmRun, PlanResponse};

/// Serializes the full response as pretty JSON.
pub fn to_json(response: &PlanResponse) -> PlanResult<String> {
    serde_json::to_string_pretty(response).map_err(|e| PlanError::internal(format!("JSON serialization failed: {e}")))
}

#[derive(Serialize)]
struct CsvRow<'a> {
    algorithm: String,
    opportunity_id: &'a str,
    satellite_id: &'a str,
    target_id: &'a str,
    start_unix_s: f64,
    end_unix_s: f64,
    roll_deg: f64,
    pitch_deg: f64,
    off_nadir_deg: f64,
    maneuver_time_s: f64,
    slack_time_s: f64,
    composite_value: f64,
}

/// Flattens every algorithm run's schedule into one CSV, declared field
/// order: algorithm, opportunity_id, satellite_id, target_id,
/// start_unix_s, end_unix_s, roll_deg, pitch_deg, off_nadir_deg,
/// maneuver_time_s, slack_time_s, composite_value.
pub fn to_csv(response: &PlanResponse) -> PlanResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for run in &response.runs {
        write_run(&mut writer, run)?;
    }
    let bytes =
        writer.into_inner().map_err(|e| PlanError::internal(format!("CSV writer flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| PlanError::internal(format!("CSV output was not valid UTF-8: {e}")))
}

fn write_run<W: Write>(writer: &mut csv::Writer<W>, run: &AlgorithmRun) -> PlanResult<()> {
    let algorithm = serde_json::to_value(run.algorithm)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "UNKNOWN".to_string());

    for scheduled in &run.schedule {
        let row = CsvRow {
            algorithm: algorithm.clone(),
            opportunity_id: &scheduled.opportunity_id,
            satellite_id: &scheduled.satellite_id,
            target_id: &scheduled.target_id,
            start_unix_s: scheduled.start,
            end_unix_s: scheduled.end,
            roll_deg: scheduled.roll_deg,
            pitch_deg: scheduled.pitch_deg,
            off_nadir_deg: scheduled.off_nadir_deg,
            maneuver_time_s: scheduled.maneuver_time_s,
            slack_time_s: scheduled.slack_time_s,
            composite_value: scheduled.composite_value,
        };
        writer.serialize(row).map_err(|e| PlanError::internal(format!("CSV row serialization failed: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ConflictResolutionResult;
    use crate::config::Algorithm;
    use crate::types::{InvariantCheck, ScheduleMetrics, ScheduledOpportunity};
    use std::collections::HashMap;

    fn sample_response() -> PlanResponse {
        PlanResponse {
            runs: vec![AlgorithmRun {
                algorithm: Algorithm::FirstFit,
                schedule: vec![ScheduledOpportunity {
                    opportunity_id: "opp-1".into(),
                    satellite_id: "sat-1".into(),
                    target_id: "t1".into(),
                    start: 100.0,
                    end: 105.0,
                    roll_deg: 12.5,
                    pitch_deg: 0.0,
                    off_nadir_deg: 12.5,
                    delta_roll_deg: 12.5,
                    delta_pitch_deg: 0.0,
                    maneuver_time_s: 3.0,
                    slack_time_s: 2.0,
                    composite_value: 0.75,
                }],
                metrics: ScheduleMetrics::default(),
                invariants: vec![InvariantCheck { name: "no_overlap".into(), ok: true, details: None }],
                conflicts: ConflictResolutionResult::default(),
                rejected_opportunities: HashMap::new(),
            }],
        }
    }

    #[test]
    fn test_json_roundtrips_schedule_length() {
        let json = to_json(&sample_response()).unwrap();
        let parsed: PlanResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.runs[0].schedule.len(), 1);
    }

    #[test]
    fn test_csv_has_header_and_one_row() {
        let csv_text = to_csv(&sample_response()).unwrap();
        let lines: Vec<&str> = csv_text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("algorithm,opportunity_id"));
        assert!(lines[1].contains("opp-1"));
    }
}
