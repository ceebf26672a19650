//! Dashboard reports.
//!
//! - GET /api/reports?period=&start=&end=&compare= → sales report (staff)
//! - GET /api/staff-summary?period=&start=&end= → productivity (admin)
//!
//! An explicit `start`/`end` pair wins over `period`; with neither the
//! window is the trailing 30 days.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use kleen_core::reporting::{self, Comparison, DateRange, SalesReport, StaffSummary};
use kleen_core::validation::parse_date;
use kleen_db::business_date_today;
use serde::Deserialize;

use crate::auth::{AdminUser, StaffUser};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReportQuery {
    /// `today`, `this_week` or anything else for the trailing 30 days.
    pub period: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    /// `previous` or `prior_year`.
    pub compare: Option<String>,
}

impl ReportQuery {
    fn range(&self) -> ApiResult<DateRange> {
        let start = self.start.as_deref().map(|s| parse_date("start", s)).transpose()?;
        let end = self.end.as_deref().map(|s| parse_date("end", s)).transpose()?;
        Ok(reporting::resolve_range(
            self.period.as_deref(),
            start,
            end,
            business_date_today(),
        )?)
    }

    fn comparison(&self) -> ApiResult<Option<Comparison>> {
        match self.compare.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(mode) => Ok(Some(Comparison::parse(mode)?)),
            None => Ok(None),
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/reports", get(sales))
        .route("/api/staff-summary", get(staff_summary))
}

/// GET /api/reports
pub async fn sales(
    State(state): State<AppState>,
    StaffUser(_actor): StaffUser,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<SalesReport>> {
    let range = query.range()?;
    let comparison = query.comparison()?;
    Ok(Json(state.db.reports().sales_report(range, comparison).await?))
}

/// GET /api/staff-summary
pub async fn staff_summary(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<StaffSummary>> {
    let range = query.range()?;
    Ok(Json(state.db.reports().staff_summary(range).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use kleen_core::Role;
    use serde_json::json;

    use super::*;
    use crate::testing::{send, staff_token, test_state};

    async fn place_order(state: &AppState, token: &str, name: &str, quantity: f64) -> String {
        let body = json!({
            "customer_name": name,
            "customer_phone": format!("212555{:04}", quantity as i64),
            "items": [{ "description": "Wash & Fold", "unit_price_cents": 100, "quantity": quantity }]
        });
        let (status, order) = send(state, Method::POST, "/api/orders", Some(token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        order["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_sales_report_excludes_cancelled() {
        let (state, _) = test_state().await;
        let token = staff_token(&state, "beni", Role::Staff).await;
        state.db.settings().set("tax_rate", "0").await.unwrap();

        place_order(&state, &token, "Dana", 30.0).await;
        place_order(&state, &token, "Lee", 10.0).await;
        let cancelled = place_order(&state, &token, "Sam", 50.0).await;
        send(
            &state,
            Method::POST,
            &format!("/api/orders/{}/cancel", cancelled),
            Some(&token),
            None,
        )
        .await;

        let (status, report) =
            send(&state, Method::GET, "/api/reports?period=today&compare=previous", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["totals"]["order_count"], 2);
        assert_eq!(report["totals"]["revenue_cents"], 4000);
        assert_eq!(report["comparison"]["prior"]["revenue_cents"], 0);
        assert!(report["comparison"]["revenue_change_pct"].is_null());
        assert_eq!(report["top_customers"][0]["customer_name"], "Dana");
        assert_eq!(report["top_customers"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_report_query_validation() {
        let (state, _) = test_state().await;
        let token = staff_token(&state, "beni", Role::Staff).await;

        for uri in [
            "/api/reports?start=2026-03-01",
            "/api/reports?start=2026-03-10&end=2026-03-01",
            "/api/reports?compare=last_decade",
        ] {
            let (status, _) = send(&state, Method::GET, uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        }

        let (status, report) = send(
            &state,
            Method::GET,
            "/api/reports?start=2026-03-01&end=2026-03-07",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["range"]["start"], "2026-03-01");
        assert_eq!(report["range"]["end"], "2026-03-07");
    }

    #[tokio::test]
    async fn test_staff_summary_admin_only() {
        let (state, _) = test_state().await;
        let staff = staff_token(&state, "beni", Role::Staff).await;
        let admin = staff_token(&state, "admin", Role::Admin).await;
        place_order(&state, &staff, "Dana", 10.0).await;

        let (status, _) = send(&state, Method::GET, "/api/staff-summary", Some(&staff), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, summary) =
            send(&state, Method::GET, "/api/staff-summary?period=today", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = summary["staff"].as_array().unwrap();
        let beni = rows.iter().find(|r| r["staff_name"] == "Beni").unwrap();
        assert_eq!(beni["received"], 1);
    }
}
