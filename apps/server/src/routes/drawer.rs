//! Cash drawer.
//!
//! - GET /api/cash-drawer/status?date= → reconciliation for a business date
//! - POST /api/cash-drawer → opening count, closing count or expense (today)

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use kleen_core::drawer::{DrawerEntry, DrawerStatus};
use kleen_core::validation::parse_date;
use kleen_core::DrawerEvent;
use kleen_db::business_date_today;
use serde::Deserialize;

use crate::auth::StaffUser;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DrawerQuery {
    /// `YYYY-MM-DD`; today when absent.
    pub date: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cash-drawer", post(record))
        .route("/api/cash-drawer/status", get(status))
}

/// GET /api/cash-drawer/status
pub async fn status(
    State(state): State<AppState>,
    StaffUser(_actor): StaffUser,
    Query(query): Query<DrawerQuery>,
) -> ApiResult<Json<DrawerStatus>> {
    let date = match query.date.as_deref() {
        Some(date) => parse_date("date", date)?,
        None => business_date_today(),
    };
    Ok(Json(state.db.drawer().status(date).await?))
}

/// POST /api/cash-drawer
///
/// Events are immutable; a second opening or closing for today is a 409.
pub async fn record(
    State(state): State<AppState>,
    StaffUser(actor): StaffUser,
    Json(entry): Json<DrawerEntry>,
) -> ApiResult<(StatusCode, Json<DrawerEvent>)> {
    let event = state
        .db
        .drawer()
        .record(&entry, &actor, business_date_today())
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use kleen_core::Role;
    use serde_json::json;

    use super::*;
    use crate::testing::{send, staff_token, test_state};

    #[tokio::test]
    async fn test_day_reconciles() {
        let (state, _) = test_state().await;
        let token = staff_token(&state, "beni", Role::Staff).await;

        let entries = [
            json!({ "kind": "opening", "counts": { "hundreds": 1 } }),
            json!({ "kind": "expense", "amount_cents": 500, "description": "Detergent" }),
        ];
        for entry in entries {
            let (status, _) = send(&state, Method::POST, "/api/cash-drawer", Some(&token), Some(entry)).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        // Paid cash order: 2800 + 249 tax.
        let order = json!({
            "customer_name": "Dana",
            "payment_status": "paid",
            "payment_method": "cash",
            "items": [{ "description": "Wash & Fold", "unit_price_cents": 140, "quantity": 20.0 }]
        });
        let (status, _) = send(&state, Method::POST, "/api/orders", Some(&token), Some(order)).await;
        assert_eq!(status, StatusCode::CREATED);

        let closing = json!({
            "kind": "closing",
            "counts": { "hundreds": 1, "twenties": 1, "fives": 1, "change_cents": 49 }
        });
        let (status, _) = send(&state, Method::POST, "/api/cash-drawer", Some(&token), Some(closing)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&state, Method::GET, "/api/cash-drawer/status", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cash_sales_cents"], 3049);
        assert_eq!(body["expected_cash_cents"], 12549);
        assert_eq!(body["actual_cash_cents"], 12549);
        assert_eq!(body["has_mismatch"], false);
    }

    #[tokio::test]
    async fn test_second_opening_conflicts() {
        let (state, _) = test_state().await;
        let token = staff_token(&state, "beni", Role::Staff).await;
        let opening = json!({ "kind": "opening", "counts": { "twenties": 5 } });

        let (status, _) =
            send(&state, Method::POST, "/api/cash-drawer", Some(&token), Some(opening.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, err) = send(&state, Method::POST, "/api/cash-drawer", Some(&token), Some(opening)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(err["code"], "BUSINESS_RULE");
    }

    #[tokio::test]
    async fn test_bad_date_rejected() {
        let (state, _) = test_state().await;
        let token = staff_token(&state, "beni", Role::Staff).await;

        let (status, _) = send(
            &state,
            Method::GET,
            "/api/cash-drawer/status?date=yesterday",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
