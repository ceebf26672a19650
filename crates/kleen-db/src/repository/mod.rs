//! # Repository Module
//!
//! Database repository implementations for Kleen POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handler                                                               │
//! │       │  db.orders().set_status(id, OrderStatus::Cleaned, &actor)      │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── BEGIN                                                             │
//! │  ├── UPDATE orders SET updated_at = updated_at WHERE id = ?  (lock)    │
//! │  ├── SELECT * FROM orders WHERE id = ?                                 │
//! │  ├── kleen_core::lifecycle::transition(&mut order, …)?                 │
//! │  ├── UPDATE orders SET … WHERE id = ?                                  │
//! │  └── COMMIT            (any error drops the transaction → ROLLBACK)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first statement of every multi-statement write is itself a write, so
//! SQLite grants the write lock up front and concurrent writers queue on
//! `busy_timeout` instead of failing on a lock upgrade.
//!
//! ## Available Repositories
//!
//! - [`order::OrderRepository`] - Orders, numbering, lifecycle writes
//! - [`customer::CustomerRepository`] - Customer CRUD and portal accounts
//! - [`service::ServiceRepository`] - Service catalog
//! - [`drawer::DrawerRepository`] - Cash drawer events and reconciliation
//! - [`time_entry::TimeEntryRepository`] - Clock in / clock out
//! - [`report::ReportRepository`] - Read-only rollups
//! - [`settings::SettingsRepository`] - Key/value business settings
//! - [`user::UserRepository`] - Staff accounts
//! - [`feedback::FeedbackRepository`] - Portal feedback

pub mod customer;
pub mod drawer;
pub mod feedback;
pub mod order;
pub mod report;
pub mod service;
pub mod settings;
pub mod time_entry;
pub mod user;
