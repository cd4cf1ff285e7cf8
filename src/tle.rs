//! TLE parsing and validation.
//!
//! Epoch-to-timestamp conversion is carried over from the teacher's
//! `TLEManager::tle_epoch_to_timestamp`; validation rules (line prefixes,
//! minimum length) are ported field-for-field from the original service's
//! `backend/schemas/tle.py::TLEData`.

use chrono::{Duration, NaiveDate};

use crate::error::PlanError;
use crate::types::Tle;

/// Converts a TLE epoch field (`YYDDD.DDDDDDDD`) to a Unix timestamp.
pub fn tle_epoch_to_timestamp(tle_epoch: &str) -> Option<f64> {
    let year: i32 = tle_epoch.get(0..2)?.parse().ok()?;
    let year_full = if year < 57 { 2000 + year } else { 1900 + year };
    let day_of_year: f64 = tle_epoch.get(2..)?.parse().ok()?;

    let naive_date = NaiveDate::from_yo_opt(year_full, day_of_year.floor() as u32)?;
    let seconds_in_day = ((day_of_year - day_of_year.floor()) * 86400.0).round() as i64;
    let naive_datetime = naive_date
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::seconds(seconds_in_day))?;

    Some(naive_datetime.and_utc().timestamp() as f64)
}

/// Extracts and parses the epoch field from a TLE line1.
pub fn tle_epoch_line1(line1: &str) -> Option<f64> {
    let field = line1.get(18..32)?;
    tle_epoch_to_timestamp(field.trim())
}

/// Validates a TLE against the 69-character two-line format (spec.md §6).
/// Does not re-serialize the lines — they are consumed verbatim downstream.
pub fn validate_tle(satellite_id: &str, tle: &Tle) -> Result<(), PlanError> {
    let invalid = |reason: &str| PlanError::InvalidTle {
        satellite_id: satellite_id.to_string(),
        reason: reason.to_string(),
    };

    let line1 = tle.line1.trim();
    let line2 = tle.line2.trim();

    if !line1.starts_with("1 ") {
        return Err(invalid("TLE line1 must start with \"1 \""));
    }
    if line1.len() < 69 {
        return Err(invalid("TLE line1 must be at least 69 characters"));
    }
    if !line2.starts_with("2 ") {
        return Err(invalid("TLE line2 must start with \"2 \""));
    }
    if line2.len() < 69 {
        return Err(invalid("TLE line2 must be at least 69 characters"));
    }
    if tle_epoch_line1(line1).is_none() {
        return Err(invalid("TLE line1 epoch field is unparsable"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tle_epoch_to_timestamp() {
        let timestamp = tle_epoch_to_timestamp("23045.5").unwrap();
        assert_eq!(timestamp, 1676376000.0);
    }

    #[test]
    fn test_validate_tle_rejects_short_lines() {
        let tle = Tle {
            name: "X".into(),
            line1: "1 25544U".into(),
            line2: "2 25544".into(),
        };
        assert!(validate_tle("sat-1", &tle).is_err());
    }

    #[test]
    fn test_validate_tle_rejects_bad_prefix() {
        let tle = Tle {
            name: "X".into(),
            line1: "X 25544U 98067A   23045.50000000  .00001764  00000-0  40295-4 0  9995".into(),
            line2: "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.49560609373456".into(),
        };
        assert!(validate_tle("sat-1", &tle).is_err());
    }

    #[test]
    fn test_validate_tle_accepts_iss() {
        let tle = Tle {
            name: "ISS".into(),
            line1: "1 25544U 98067A   23045.50000000  .00001764  00000-0  40295-4 0  9995".into(),
            line2: "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.49560609373456".into(),
        };
        assert!(validate_tle("sat-1", &tle).is_ok());
    }
}
