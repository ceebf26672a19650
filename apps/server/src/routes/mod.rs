//! # HTTP Routes
//!
//! One module per resource; each exposes `router()` and the handlers behind it.
//!
//! ## Access
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │  public     /health, GET /api/services, GET /api/settings,              │
//! │             /api/public/customer-login, /api/public/password-reset/*    │
//! │  customer   /api/public/* (customer token)                              │
//! │  staff      orders, customers, drawer, time clock, reports              │
//! │  driver     /api/driver/*, pickup (driver or admin)                     │
//! │  admin      deletes, force clock-out, staff summary, settings, feedback │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//! Access is enforced by the extractor each handler takes
//! ([`StaffUser`](crate::auth::StaffUser), [`AdminUser`](crate::auth::AdminUser), ...).

pub mod auth;
pub mod catalog;
pub mod customers;
pub mod drawer;
pub mod driver;
pub mod health;
pub mod orders;
pub mod portal;
pub mod reports;
pub mod settings;
pub mod time;

use axum::Router;

use crate::AppState;

/// All routes, without state or middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(catalog::router())
        .merge(customers::router())
        .merge(orders::router())
        .merge(driver::router())
        .merge(drawer::router())
        .merge(time::router())
        .merge(reports::router())
        .merge(settings::router())
        .merge(portal::router())
}
