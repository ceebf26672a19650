//! # Reporting
//!
//! Report windows, prior-period comparison and ranking. The SQL rollups live
//! in `kleen-db`; everything here is arithmetic over their results.
//!
//! ## Windows
//! ```text
//! period=today       [today, today]
//! period=this_week   [today − 6, today]
//! (default)          [today − 29, today]
//! start=…&end=…      [start, end]           (inclusive, local dates)
//!
//! compare=previous   the equal-length window ending the day before start
//! compare=prior_year the same dates one year earlier (Feb 29 → Feb 28)
//! ```

use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::lifecycle::Stage;

/// Default number of customers in the top-customers ranking.
pub const TOP_CUSTOMER_LIMIT: usize = 10;

const TRAILING_DAYS: i64 = 30;
const WEEK_DAYS: i64 = 7;

// =============================================================================
// Date Ranges
// =============================================================================

/// An inclusive range of business dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: NaiveDate,
    #[ts(as = "String")]
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> CoreResult<Self> {
        if start > end {
            return Err(ValidationError::invalid_format("start", "must not be after end").into());
        }
        Ok(DateRange { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        DateRange { start: day, end: day }
    }

    /// The `days`-long window ending on `end`.
    pub fn trailing(end: NaiveDate, days: i64) -> Self {
        DateRange {
            start: end - Duration::days(days.max(1) - 1),
            end,
        }
    }

    /// Number of calendar days covered.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// The equal-length window immediately before this one.
    pub fn previous(&self) -> Self {
        let end = self.start - Duration::days(1);
        DateRange::trailing(end, self.days())
    }

    /// The same dates one year earlier.
    pub fn prior_year(&self) -> Self {
        let shift = |d: NaiveDate| {
            d.checked_sub_months(Months::new(12))
                .unwrap_or(d - Duration::days(365))
        };
        DateRange {
            start: shift(self.start),
            end: shift(self.end),
        }
    }
}

/// Named report windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    Today,
    ThisWeek,
    Trailing30Days,
}

impl ReportPeriod {
    /// Unknown or missing names fall back to the trailing 30 days.
    pub fn parse(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some("today") => ReportPeriod::Today,
            Some("this_week") | Some("week") => ReportPeriod::ThisWeek,
            _ => ReportPeriod::Trailing30Days,
        }
    }

    pub fn range(&self, today: NaiveDate) -> DateRange {
        match self {
            ReportPeriod::Today => DateRange::single(today),
            ReportPeriod::ThisWeek => DateRange::trailing(today, WEEK_DAYS),
            ReportPeriod::Trailing30Days => DateRange::trailing(today, TRAILING_DAYS),
        }
    }
}

/// Resolves the report window from query parameters.
///
/// An explicit `start`/`end` pair wins over `period`; supplying only one end
/// is a validation error.
pub fn resolve_range(
    period: Option<&str>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> CoreResult<DateRange> {
    match (start, end) {
        (Some(start), Some(end)) => DateRange::new(start, end),
        (Some(_), None) => Err(ValidationError::required("end").into()),
        (None, Some(_)) => Err(ValidationError::required("start").into()),
        (None, None) => Ok(ReportPeriod::parse(period).range(today)),
    }
}

/// Which earlier window to compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Previous,
    PriorYear,
}

impl Comparison {
    pub fn parse(name: &str) -> CoreResult<Self> {
        match name.trim() {
            "previous" => Ok(Comparison::Previous),
            "prior_year" => Ok(Comparison::PriorYear),
            _ => Err(ValidationError::NotAllowed {
                field: "compare".to_string(),
                allowed: vec!["previous".to_string(), "prior_year".to_string()],
            }
            .into()),
        }
    }

    pub fn prior_range(&self, range: &DateRange) -> DateRange {
        match self {
            Comparison::Previous => range.previous(),
            Comparison::PriorYear => range.prior_year(),
        }
    }
}

// =============================================================================
// Totals & Comparison
// =============================================================================

/// Aggregates over non-cancelled orders in a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PeriodTotals {
    pub order_count: i64,
    pub revenue_cents: i64,
    pub weight_lbs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PeriodComparison {
    pub mode: Comparison,
    pub prior_range: DateRange,
    pub prior: PeriodTotals,
    pub revenue_change_cents: i64,
    /// `None` when the prior window had no revenue.
    pub revenue_change_pct: Option<f64>,
    pub order_count_change: i64,
}

/// Compares current totals against a prior window.
pub fn compare(
    mode: Comparison,
    current: &PeriodTotals,
    prior_range: DateRange,
    prior: PeriodTotals,
) -> PeriodComparison {
    let revenue_change_cents = current.revenue_cents - prior.revenue_cents;
    let revenue_change_pct = if prior.revenue_cents == 0 {
        None
    } else {
        let pct = revenue_change_cents as f64 / prior.revenue_cents as f64 * 100.0;
        Some((pct * 10.0).round() / 10.0)
    };

    PeriodComparison {
        mode,
        prior_range,
        revenue_change_cents,
        revenue_change_pct,
        order_count_change: current.order_count - prior.order_count,
        prior,
    }
}

// =============================================================================
// Top Customers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CustomerRevenue {
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub order_count: i64,
    pub total_cents: i64,
}

/// Ranks customers by revenue, highest first; ties by name ascending.
pub fn rank_top_customers(mut rows: Vec<CustomerRevenue>, limit: usize) -> Vec<CustomerRevenue> {
    rows.sort_by(|a, b| {
        b.total_cents
            .cmp(&a.total_cents)
            .then_with(|| a.customer_name.cmp(&b.customer_name))
    });
    rows.truncate(limit);
    rows
}

// =============================================================================
// Staff Productivity
// =============================================================================

/// Orders a staff member stamped at one stage within the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageActivity {
    pub staff_name: String,
    pub stage: Stage,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StaffProductivity {
    pub staff_name: String,
    pub received: i64,
    pub cleaned: i64,
    pub ready: i64,
    pub delivered: i64,
    pub picked_up: i64,
    /// Paid cash orders this person took at the counter.
    pub cash_collected_cents: i64,
    pub hours_worked: f64,
}

/// Merges per-stage counts, cash and hours into one row per staff name,
/// sorted by name.
pub fn merge_staff_productivity(
    activity: Vec<StageActivity>,
    cash: Vec<(String, i64)>,
    hours: Vec<(String, f64)>,
) -> Vec<StaffProductivity> {
    fn row<'a>(
        rows: &'a mut BTreeMap<String, StaffProductivity>,
        name: &str,
    ) -> &'a mut StaffProductivity {
        rows.entry(name.to_string()).or_insert_with(|| StaffProductivity {
            staff_name: name.to_string(),
            ..StaffProductivity::default()
        })
    }

    let mut rows: BTreeMap<String, StaffProductivity> = BTreeMap::new();

    for a in activity {
        let entry = row(&mut rows, &a.staff_name);
        match a.stage {
            Stage::Received => entry.received += a.count,
            Stage::Cleaned => entry.cleaned += a.count,
            Stage::Ready => entry.ready += a.count,
            Stage::Delivered => entry.delivered += a.count,
            Stage::Pickup => entry.picked_up += a.count,
            Stage::Cancelled => {}
        }
    }
    for (name, cents) in cash {
        row(&mut rows, &name).cash_collected_cents += cents;
    }
    for (name, h) in hours {
        let entry = row(&mut rows, &name);
        entry.hours_worked = ((entry.hours_worked + h) * 100.0).round() / 100.0;
    }

    rows.into_values().collect()
}

// =============================================================================
// Report
// =============================================================================

/// The sales report returned to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesReport {
    pub range: DateRange,
    pub totals: PeriodTotals,
    pub comparison: Option<PeriodComparison>,
    pub top_customers: Vec<CustomerRevenue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StaffSummary {
    pub range: DateRange,
    pub staff: Vec<StaffProductivity>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_named_periods() {
        let today = d(2024, 6, 14);
        assert_eq!(ReportPeriod::parse(Some("today")).range(today), DateRange::single(today));

        let week = ReportPeriod::parse(Some("this_week")).range(today);
        assert_eq!(week.start, d(2024, 6, 8));
        assert_eq!(week.days(), 7);

        let default = ReportPeriod::parse(None).range(today);
        assert_eq!(default.start, d(2024, 5, 16));
        assert_eq!(default.days(), 30);
    }

    #[test]
    fn test_explicit_range_wins() {
        let today = d(2024, 6, 14);
        let range = resolve_range(Some("today"), Some(d(2024, 1, 1)), Some(d(2024, 1, 31)), today)
            .unwrap();
        assert_eq!(range.days(), 31);

        assert!(resolve_range(None, Some(d(2024, 1, 1)), None, today).is_err());
        assert!(resolve_range(None, Some(d(2024, 2, 1)), Some(d(2024, 1, 1)), today).is_err());
    }

    #[test]
    fn test_previous_window_is_adjacent_and_equal_length() {
        let range = DateRange::new(d(2024, 3, 1), d(2024, 3, 10)).unwrap();
        let prior = range.previous();
        assert_eq!(prior.end, d(2024, 2, 29));
        assert_eq!(prior.start, d(2024, 2, 20));
        assert_eq!(prior.days(), range.days());
    }

    #[test]
    fn test_prior_year_clamps_leap_day() {
        let range = DateRange::new(d(2024, 2, 29), d(2024, 3, 2)).unwrap();
        let prior = range.prior_year();
        assert_eq!(prior.start, d(2023, 2, 28));
        assert_eq!(prior.end, d(2023, 3, 2));
    }

    #[test]
    fn test_compare_percent_change() {
        let current = PeriodTotals {
            order_count: 12,
            revenue_cents: 15_000,
            weight_lbs: 80.0,
        };
        let prior = PeriodTotals {
            order_count: 10,
            revenue_cents: 10_000,
            weight_lbs: 70.0,
        };
        let range = DateRange::single(d(2024, 6, 13));
        let cmp = compare(Comparison::Previous, &current, range, prior);
        assert_eq!(cmp.revenue_change_cents, 5_000);
        assert_eq!(cmp.revenue_change_pct, Some(50.0));
        assert_eq!(cmp.order_count_change, 2);

        let cmp = compare(Comparison::PriorYear, &current, range, PeriodTotals::default());
        assert_eq!(cmp.revenue_change_pct, None);
    }

    #[test]
    fn test_top_customers_ties_broken_by_name() {
        let row = |name: &str, total| CustomerRevenue {
            customer_name: name.to_string(),
            customer_phone: None,
            order_count: 1,
            total_cents: total,
        };
        let ranked = rank_top_customers(
            vec![row("Zoe", 5_000), row("Ana", 5_000), row("Mia", 9_000), row("Bob", 100)],
            3,
        );
        let names: Vec<_> = ranked.iter().map(|r| r.customer_name.as_str()).collect();
        assert_eq!(names, vec!["Mia", "Ana", "Zoe"]);
    }

    #[test]
    fn test_merge_staff_productivity() {
        let activity = vec![
            StageActivity {
                staff_name: "Erika".to_string(),
                stage: Stage::Received,
                count: 4,
            },
            StageActivity {
                staff_name: "Beni".to_string(),
                stage: Stage::Cleaned,
                count: 3,
            },
            StageActivity {
                staff_name: "Erika".to_string(),
                stage: Stage::Delivered,
                count: 2,
            },
        ];
        let rows = merge_staff_productivity(
            activity,
            vec![("Erika".to_string(), 12_345)],
            vec![("Beni".to_string(), 7.5), ("Clara".to_string(), 3.25)],
        );

        let names: Vec<_> = rows.iter().map(|r| r.staff_name.as_str()).collect();
        assert_eq!(names, vec!["Beni", "Clara", "Erika"]);
        assert_eq!(rows[2].received, 4);
        assert_eq!(rows[2].delivered, 2);
        assert_eq!(rows[2].cash_collected_cents, 12_345);
        assert_eq!(rows[0].hours_worked, 7.5);
    }

    #[test]
    fn test_comparison_parse() {
        assert_eq!(Comparison::parse("previous").unwrap(), Comparison::Previous);
        assert_eq!(Comparison::parse("prior_year").unwrap(), Comparison::PriorYear);
        assert!(Comparison::parse("decade").is_err());
    }
}
