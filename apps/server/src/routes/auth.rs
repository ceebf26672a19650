//! Staff authentication.
//!
//! - POST /api/auth/login → token + user
//! - GET /api/auth/me → the logged-in user

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use kleen_core::User;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{verify_password, StaffUser};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
}

/// POST /api/auth/login
///
/// Usernames are case-insensitive. Unknown user and wrong password give the
/// same answer.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("Username and password are required"));
    }

    let user = state.db.users().find_by_username(&req.username).await?;
    let user = match user {
        Some(user) if verify_password(&req.password, &user.password_hash) => user,
        _ => {
            warn!(username = %req.username.trim(), "Failed staff login");
            return Err(ApiError::unauthenticated("Invalid username or password"));
        }
    };

    let token = state.jwt.issue_staff(&user)?;
    info!(user = %user.name, role = %user.role, "Staff logged in");
    Ok(Json(LoginResponse { token, user }))
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, StaffUser(actor): StaffUser) -> ApiResult<Json<User>> {
    let user = state
        .db
        .users()
        .get_by_id(&actor.id)
        .await?
        .ok_or_else(|| ApiError::unauthenticated("Account no longer exists"))?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use kleen_core::Role;
    use serde_json::json;

    use crate::testing::{send, staff_actor, test_state, TEST_PASSWORD};

    #[tokio::test]
    async fn test_login_and_me() {
        let (state, _) = test_state().await;
        staff_actor(&state.db, "erika", Role::Staff).await;

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "ERIKA", "password": TEST_PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["role"], "staff");
        assert!(body["user"].get("password_hash").is_none());

        let token = body["token"].as_str().unwrap().to_string();
        let (status, me) = send(&state, Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["name"], "Erika");
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let (state, _) = test_state().await;
        staff_actor(&state.db, "erika", Role::Staff).await;

        let (status, body) = send(
            &state,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "erika", "password": "wrong-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");

        let (status, _) = send(&state, Method::GET, "/api/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
