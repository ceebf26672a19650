//! # Report Repository
//!
//! Read-only SQL rollups feeding the dashboard. Window math, comparison and
//! ranking live in [`kleen_core::reporting`]; this module only aggregates.
//!
//! ## Windows
//! ```text
//! Sales totals / top customers   orders.business_date in [start, end]
//!                                cancelled orders excluded
//! Stage activity                 date({stage}_at, localtime) in [start, end]
//! Cash collected                 business_date in window, cash + paid,
//!                                grouped by the staff member who created it
//! Hours                          time_entries.business_date in window
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use kleen_core::lifecycle::Stage;
use kleen_core::reporting::{
    self, Comparison, CustomerRevenue, DateRange, PeriodTotals, SalesReport, StaffSummary,
    StageActivity, TOP_CUSTOMER_LIMIT,
};

/// Stages counted for staff productivity, with their stamp column prefix.
const COUNTED_STAGES: [(Stage, &str); 5] = [
    (Stage::Received, "received"),
    (Stage::Cleaned, "cleaned"),
    (Stage::Ready, "ready"),
    (Stage::Delivered, "delivered"),
    (Stage::Pickup, "pickup"),
];

/// Repository for report queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Order count, revenue and weight for a window.
    pub async fn totals(&self, range: &DateRange) -> DbResult<PeriodTotals> {
        let totals = sqlx::query_as::<_, PeriodTotals>(
            r#"
            SELECT
                COUNT(*) AS order_count,
                CAST(COALESCE(SUM(total_cents), 0) AS INTEGER) AS revenue_cents,
                CAST(COALESCE(SUM(weight_lbs), 0) AS REAL) AS weight_lbs
            FROM orders
            WHERE business_date BETWEEN ?1 AND ?2
              AND status != 'cancelled'
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }

    /// Customers ranked by revenue in the window.
    ///
    /// Orders are grouped by customer id when linked, otherwise by phone,
    /// otherwise by name; orders without a name are anonymous and skipped.
    pub async fn top_customers(
        &self,
        range: &DateRange,
        limit: usize,
    ) -> DbResult<Vec<CustomerRevenue>> {
        let rows = sqlx::query_as::<_, CustomerRevenue>(
            r#"
            SELECT
                MAX(customer_name) AS customer_name,
                MAX(customer_phone) AS customer_phone,
                COUNT(*) AS order_count,
                CAST(SUM(total_cents) AS INTEGER) AS total_cents
            FROM orders
            WHERE business_date BETWEEN ?1 AND ?2
              AND status != 'cancelled'
              AND customer_name IS NOT NULL
              AND TRIM(customer_name) != ''
            GROUP BY COALESCE(customer_id, customer_phone_key, customer_name)
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(reporting::rank_top_customers(rows, limit))
    }

    async fn stage_activity(&self, range: &DateRange) -> DbResult<Vec<StageActivity>> {
        let mut activity = Vec::new();

        for (stage, column) in COUNTED_STAGES {
            let sql = format!(
                r#"
                SELECT {column}_by, COUNT(*) FROM orders
                WHERE {column}_by IS NOT NULL
                  AND date({column}_at, 'localtime') BETWEEN ?1 AND ?2
                GROUP BY {column}_by
                "#
            );
            let rows: Vec<(String, i64)> = sqlx::query_as(&sql)
                .bind(range.start)
                .bind(range.end)
                .fetch_all(&self.pool)
                .await?;

            activity.extend(rows.into_iter().map(|(staff_name, count)| StageActivity {
                staff_name,
                stage,
                count,
            }));
        }

        Ok(activity)
    }

    async fn cash_by_staff(&self, range: &DateRange) -> DbResult<Vec<(String, i64)>> {
        let rows = sqlx::query_as(
            r#"
            SELECT created_by_name, CAST(SUM(total_cents) AS INTEGER)
            FROM orders
            WHERE business_date BETWEEN ?1 AND ?2
              AND payment_method = 'cash'
              AND payment_status = 'paid'
              AND created_by IS NOT NULL
              AND created_by_name IS NOT NULL
            GROUP BY created_by_name
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn hours_by_staff(&self, range: &DateRange) -> DbResult<Vec<(String, f64)>> {
        let rows = sqlx::query_as(
            r#"
            SELECT user_name, CAST(COALESCE(SUM(hours_worked), 0) AS REAL)
            FROM time_entries
            WHERE business_date BETWEEN ?1 AND ?2
            GROUP BY user_name
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Totals, optional prior-window comparison and top customers.
    pub async fn sales_report(
        &self,
        range: DateRange,
        comparison: Option<Comparison>,
    ) -> DbResult<SalesReport> {
        debug!(start = %range.start, end = %range.end, ?comparison, "Building sales report");

        let totals = self.totals(&range).await?;
        let comparison = match comparison {
            Some(mode) => {
                let prior_range = mode.prior_range(&range);
                let prior = self.totals(&prior_range).await?;
                Some(reporting::compare(mode, &totals, prior_range, prior))
            }
            None => None,
        };
        let top_customers = self.top_customers(&range, TOP_CUSTOMER_LIMIT).await?;

        Ok(SalesReport {
            range,
            totals,
            comparison,
            top_customers,
        })
    }

    /// Per-staff stage counts, cash collected and hours, sorted by name.
    pub async fn staff_summary(&self, range: DateRange) -> DbResult<StaffSummary> {
        debug!(start = %range.start, end = %range.end, "Building staff summary");

        let activity = self.stage_activity(&range).await?;
        let cash = self.cash_by_staff(&range).await?;
        let hours = self.hours_by_staff(&range).await?;

        Ok(StaffSummary {
            range,
            staff: reporting::merge_staff_productivity(activity, cash, hours),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
