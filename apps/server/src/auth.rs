//! JWT authentication module.
//!
//! Handles token issuance and validation, password hashing, and the axum
//! extractors handlers use to require an identity.
//!
//! ## Token Kinds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  staff     sub = user id, name, role      24h    POS + driver app      │
//! │  customer  sub = customer id              30d    customer portal       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! A customer token never passes a staff extractor and vice versa.

use std::convert::Infallible;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use kleen_core::{Actor, Customer, Role, User};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// Who a token was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Staff,
    Customer,
}

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id or customer id)
    pub sub: String,

    /// Display name
    pub name: String,

    /// Staff role; absent on customer tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    pub kind: TokenKind,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

/// JWT token manager.
#[derive(Debug, Clone)]
pub struct JwtManager {
    secret: String,
    staff_lifetime_secs: i64,
    customer_lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: String, staff_lifetime_secs: i64, customer_lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            staff_lifetime_secs,
            customer_lifetime_secs,
        }
    }

    /// Issues a staff session token.
    pub fn issue_staff(&self, user: &User) -> Result<String, ApiError> {
        self.issue(
            &user.id,
            &user.name,
            Some(user.role),
            TokenKind::Staff,
            self.staff_lifetime_secs,
        )
    }

    /// Issues a customer-scoped portal token.
    pub fn issue_customer(&self, customer: &Customer) -> Result<String, ApiError> {
        self.issue(
            &customer.id,
            &customer.name,
            None,
            TokenKind::Customer,
            self.customer_lifetime_secs,
        )
    }

    fn issue(
        &self,
        sub: &str,
        name: &str,
        role: Option<Role>,
        kind: TokenKind,
        lifetime_secs: i64,
    ) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            name: name.to_string(),
            role,
            kind,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(lifetime_secs)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::internal(format!("Failed to generate token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!(error = %e, "Token rejected");
            ApiError::unauthenticated("Invalid token")
        })
    }

    /// Validates a staff token and returns the acting staff member.
    pub fn validate_staff(&self, token: &str) -> Result<Actor, ApiError> {
        let claims = self.validate_token(token)?;
        match (claims.kind, claims.role) {
            (TokenKind::Staff, Some(role)) => Ok(Actor::new(claims.sub, claims.name, role)),
            _ => Err(ApiError::unauthenticated("Staff token required")),
        }
    }

    /// Validates a customer token and returns the customer id.
    pub fn validate_customer(&self, token: &str) -> Result<String, ApiError> {
        let claims = self.validate_token(token)?;
        if claims.kind != TokenKind::Customer {
            return Err(ApiError::unauthenticated("Customer token required"));
        }
        Ok(claims.sub)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn bearer(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::unauthenticated("No token provided"))?;
    extract_bearer_token(header).ok_or_else(|| ApiError::unauthenticated("Invalid authorization header"))
}

// =============================================================================
// Passwords
// =============================================================================

/// Hashes a password into an argon2 PHC string with a random salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored hash. Unparseable hashes never match.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is not a valid PHC string");
            false
        }
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// Any authenticated staff member (admin, staff, driver).
#[derive(Debug, Clone)]
pub struct StaffUser(pub Actor);

impl FromRequestParts<AppState> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(actor) = parts.extensions.get::<Actor>() {
            return Ok(StaffUser(actor.clone()));
        }

        let actor = state.jwt.validate_staff(bearer(parts)?)?;
        parts.extensions.insert(actor.clone());
        Ok(StaffUser(actor))
    }
}

/// `Option<StaffUser>`: a missing or invalid token is `None`.
impl OptionalFromRequestParts<AppState> for StaffUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Option<Self>, Self::Rejection> {
        Ok(<StaffUser as FromRequestParts<AppState>>::from_request_parts(parts, state)
            .await
            .ok())
    }
}

/// An authenticated admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Actor);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let StaffUser(actor) =
            <StaffUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await?;
        if !actor.is_admin() {
            warn!(user = %actor.name, uri = %parts.uri, "Admin access denied");
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(AdminUser(actor))
    }
}

/// A driver or an admin.
#[derive(Debug, Clone)]
pub struct DriverUser(pub Actor);

impl FromRequestParts<AppState> for DriverUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let StaffUser(actor) =
            <StaffUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await?;
        if !matches!(actor.role, Role::Driver | Role::Admin) {
            return Err(ApiError::forbidden("Driver access required"));
        }
        Ok(DriverUser(actor))
    }
}

/// A logged-in portal customer.
#[derive(Debug, Clone)]
pub struct CustomerAuth {
    pub customer_id: String,
}

impl FromRequestParts<AppState> for CustomerAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let customer_id = state.jwt.validate_customer(bearer(parts)?)?;
        Ok(CustomerAuth { customer_id })
    }
}
