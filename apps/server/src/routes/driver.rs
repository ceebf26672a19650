//! Driver work queue.
//!
//! - GET /api/driver/orders → live pickup/delivery orders

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use kleen_core::Order;

use crate::auth::DriverUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/driver/orders", get(queue))
}

/// GET /api/driver/orders
pub async fn queue(
    State(state): State<AppState>,
    DriverUser(_driver): DriverUser,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.db.orders().list_driver_queue().await?))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use kleen_core::Role;
    use serde_json::json;

    use crate::testing::{send, staff_token, test_state};

    #[tokio::test]
    async fn test_queue_lists_pickup_delivery_only() {
        let (state, _) = test_state().await;
        let staff = staff_token(&state, "beni", Role::Staff).await;
        let driver = staff_token(&state, "driver", Role::Driver).await;

        for order_type in ["counter", "pickup_delivery"] {
            let body = json!({
                "customer_name": "Dana",
                "customer_phone": "2125550101",
                "customer_address": "12 Mott St",
                "order_type": order_type,
                "items": [{ "description": "Wash & Fold", "unit_price_cents": 140, "quantity": 10.0 }]
            });
            let (status, _) = send(&state, Method::POST, "/api/orders", Some(&staff), Some(body)).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, queue) = send(&state, Method::GET, "/api/driver/orders", Some(&driver), None).await;
        assert_eq!(status, StatusCode::OK);
        let queue = queue.as_array().unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0]["order_type"], "pickup_delivery");

        let id = queue[0]["id"].as_str().unwrap();
        let (status, picked) = send(
            &state,
            Method::POST,
            &format!("/api/orders/{}/pickup", id),
            Some(&driver),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(picked["pickup_by"], "Driver");
        assert_eq!(picked["status"], "received");
    }
}
