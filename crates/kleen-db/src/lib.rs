//! # kleen-db: Database Layer for Kleen POS
//!
//! This crate provides database access for Kleen POS.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kleen POS Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (PUT /api/orders/{id}/status)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kleen-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (order.rs...) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo     │    │ 001_initial  │  │   │
//! │  │   │ busy_timeout  │    │ DrawerRepo    │    │ _schema.sql  │  │   │
//! │  │   │ WAL           │    │ TimeEntryRepo │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │ kleen-core rules run inside  │   │
//! │  │                                │ each write transaction        │   │
//! │  └────────────────────────────────┼────────────────────────────────┘   │
//! │                                   ▼                                     │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (kleen.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kleen_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("kleen.db")).await?;
//! let order = db.orders().get("3f0c…").await?;
//! let drawer = db.drawer().status(business_date).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::drawer::DrawerRepository;
pub use repository::feedback::FeedbackRepository;
pub use repository::order::{OrderFilter, OrderRepository};
pub use repository::report::ReportRepository;
pub use repository::service::ServiceRepository;
pub use repository::settings::SettingsRepository;
pub use repository::time_entry::TimeEntryRepository;
pub use repository::user::{NewUser, UserRepository};

/// Today's business date (local calendar).
pub fn business_date_today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

// =============================================================================
// Test Support
// =============================================================================
