//! Service catalog.
//!
//! - GET /api/services → active services (public price list)
//! - GET /api/services?include_inactive=true → everything (staff)
//! - PUT /api/services/{id} → price / active toggle (staff)

use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use kleen_core::{Service, ServiceUpdate};
use serde::Deserialize;

use crate::auth::StaffUser;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogQuery {
    pub include_inactive: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/services", get(list))
        .route("/api/services/{id}", put(update))
}

/// GET /api/services
///
/// Inactive services are only listed for an authenticated staff member.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
    staff: Option<StaffUser>,
) -> ApiResult<Json<Vec<Service>>> {
    let include_inactive = query.include_inactive && staff.is_some();
    Ok(Json(state.db.services().list(include_inactive).await?))
}

/// PUT /api/services/{id}
pub async fn update(
    State(state): State<AppState>,
    StaffUser(_actor): StaffUser,
    Path(id): Path<i64>,
    Json(update): Json<ServiceUpdate>,
) -> ApiResult<Json<Service>> {
    Ok(Json(state.db.services().update(id, update).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use kleen_core::{Role, ServiceUnit};
    use serde_json::json;

    use super::*;
    use crate::testing::{send, staff_token, test_state};

    fn service(id: i64, name: &str, active: bool) -> Service {
        Service {
            id,
            name: name.to_string(),
            category: "laundry".to_string(),
            unit_price_cents: 140,
            unit: ServiceUnit::Lb,
            description: None,
            active,
            sort_order: id,
        }
    }

    #[tokio::test]
    async fn test_public_list_hides_inactive() {
        let (state, _) = test_state().await;
        state.db.services().upsert(&service(1, "Wash & Fold", true)).await.unwrap();
        state.db.services().upsert(&service(2, "Comforter", false)).await.unwrap();
        let token = staff_token(&state, "beni", Role::Staff).await;

        let (_, public) = send(&state, Method::GET, "/api/services?include_inactive=true", None, None).await;
        assert_eq!(public.as_array().unwrap().len(), 1);

        let (_, staff) =
            send(&state, Method::GET, "/api/services?include_inactive=true", Some(&token), None).await;
        assert_eq!(staff.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_price_requires_staff() {
        let (state, _) = test_state().await;
        state.db.services().upsert(&service(1, "Wash & Fold", true)).await.unwrap();

        let body = json!({ "unit_price_cents": 150 });
        let (status, _) = send(&state, Method::PUT, "/api/services/1", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = staff_token(&state, "beni", Role::Staff).await;
        let (status, updated) = send(&state, Method::PUT, "/api/services/1", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["unit_price_cents"], 150);
    }
}
