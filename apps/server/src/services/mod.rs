//! Service layer: the order service and the external collaborators it
//! depends on.
//!
//! - [`orders`] - Order creation, edits, transitions and card charges
//! - [`payment`] - Card payment gateway trait and the sandbox gateway
//! - [`notify`] - Best-effort customer notifications
//! - [`reset_codes`] - Password-reset codes in a TTL store

pub mod notify;
pub mod orders;
pub mod payment;
pub mod reset_codes;

pub use notify::{LogNotifier, NotificationDispatcher, Notifier};
pub use orders::OrderService;
pub use payment::{PaymentGateway, SandboxGateway};
pub use reset_codes::{RedisResetCodeStore, ResetCodeStore};
