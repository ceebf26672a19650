//! # Time Clock
//!
//! Shift rules for staff time entries.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. A user has at most one open entry.          (every role)            │
//! │  2. At most one `staff`-role user is on shift.  (admin/driver exempt)   │
//! │  3. Closing an entry records fractional hours.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rules 1 and 2 are enforced by the database (partial unique indexes) so the
//! check and the insert are one atomic statement; this module decides which
//! entries take part in rule 2 and computes hours.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::types::{Role, TimeEntry};

/// Value stored in the shift-slot column for entries subject to rule 2.
pub const STAFF_SHIFT_SLOT: i64 = 1;

/// Whether this role competes for the single staff shift.
pub const fn requires_exclusive_shift(role: Role) -> bool {
    matches!(role, Role::Staff)
}

/// Shift-slot column value for an open entry of `role`.
pub const fn shift_slot(role: Role) -> Option<i64> {
    if requires_exclusive_shift(role) {
        Some(STAFF_SHIFT_SLOT)
    } else {
        None
    }
}

/// Hours between two instants, rounded to hundredths.
///
/// ```rust
/// use chrono::{Duration, Utc};
/// use kleen_core::timeclock::hours_between;
///
/// let start = Utc::now();
/// assert_eq!(hours_between(start, start + Duration::minutes(450)), 7.5);
/// ```
pub fn hours_between(clock_in: DateTime<Utc>, clock_out: DateTime<Utc>) -> f64 {
    let seconds = (clock_out - clock_in).num_seconds().max(0) as f64;
    (seconds / 36.0).round() / 100.0
}

/// Clock-in request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct ClockIn {
    /// Machine cycle counter reading at the start of the shift.
    pub machine_counter_start: Option<i64>,
}

/// Clock-out request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct ClockOut {
    pub machine_counter_end: Option<i64>,
    pub shift_notes: Option<String>,
}

impl ClockIn {
    pub fn validate(&self) -> CoreResult<()> {
        validate_counter("machine_counter_start", self.machine_counter_start)
    }
}

impl ClockOut {
    pub fn validate(&self) -> CoreResult<()> {
        validate_counter("machine_counter_end", self.machine_counter_end)
    }
}

fn validate_counter(field: &str, value: Option<i64>) -> CoreResult<()> {
    if matches!(value, Some(v) if v < 0) {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Closes an open entry in memory.
pub fn close_entry(entry: &mut TimeEntry, now: DateTime<Utc>, clock_out: &ClockOut) {
    entry.clock_out = Some(now);
    entry.hours_worked = Some(hours_between(entry.clock_in, now));
    if clock_out.machine_counter_end.is_some() {
        entry.machine_counter_end = clock_out.machine_counter_end;
    }
    if clock_out.shift_notes.is_some() {
        entry.shift_notes = clock_out.shift_notes.clone();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_only_staff_is_exclusive() {
        assert!(requires_exclusive_shift(Role::Staff));
        assert!(!requires_exclusive_shift(Role::Admin));
        assert!(!requires_exclusive_shift(Role::Driver));
        assert_eq!(shift_slot(Role::Staff), Some(STAFF_SHIFT_SLOT));
        assert_eq!(shift_slot(Role::Driver), None);
    }

    #[test]
    fn test_hours_between() {
        let start = Utc::now();
        assert_eq!(hours_between(start, start + Duration::minutes(90)), 1.5);
        assert_eq!(hours_between(start, start + Duration::seconds(60)), 0.02);
        assert_eq!(hours_between(start, start - Duration::minutes(5)), 0.0);
    }

    #[test]
    fn test_close_entry() {
        let start = Utc::now() - Duration::hours(8);
        let mut entry = TimeEntry {
            id: "t-1".to_string(),
            user_id: "u-2".to_string(),
            user_name: "Beni".to_string(),
            role: Role::Staff,
            clock_in: start,
            clock_out: None,
            hours_worked: None,
            machine_counter_start: Some(1200),
            machine_counter_end: None,
            shift_notes: None,
            business_date: NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
        };

        close_entry(
            &mut entry,
            start + Duration::hours(8),
            &ClockOut {
                machine_counter_end: Some(1264),
                shift_notes: Some("Dryer 3 squeaks".to_string()),
            },
        );

        assert!(!entry.is_open());
        assert_eq!(entry.hours_worked, Some(8.0));
        assert_eq!(entry.machine_counter_end, Some(1264));
    }

    #[test]
    fn test_negative_counter_rejected() {
        let clock_in = ClockIn {
            machine_counter_start: Some(-4),
        };
        assert!(clock_in.validate().is_err());
        assert!(ClockOut::default().validate().is_ok());
    }
}
