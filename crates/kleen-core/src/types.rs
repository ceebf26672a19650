//! # Domain Types
//!
//! Core domain types used throughout Kleen POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │    Customer     │   │    Service      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (catalog #) │       │
//! │  │  order_number   │   │  phone_key      │   │  unit_price     │       │
//! │  │  items[]        │   │  discount %     │   │  unit (lb/item) │       │
//! │  │  status, stamps │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   TimeEntry     │   │  DrawerEvent    │   │      User       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  clock_in/out   │   │  opening        │   │  username       │       │
//! │  │  hours_worked   │   │  closing        │   │  role           │       │
//! │  │  business_date  │   │  expense        │   │  admin/staff/   │       │
//! │  └─────────────────┘   └─────────────────┘   │  driver         │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (`order_number`, `username`, canonical phone) - human-readable
//!
//! Catalog services keep small integer ids because line items and printed
//! price lists reference them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::{Money, Percent};

// =============================================================================
// Order Status
// =============================================================================

/// Where an order is in the processing pipeline.
///
/// ```text
/// received ──► cleaned ──► ready ──► delivered
///     │
///     └──► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Dropped off (or booked online) and waiting for processing.
    Received,
    /// Washed / dry cleaned.
    Cleaned,
    /// Folded or pressed, ready for pickup or delivery.
    Ready,
    /// Handed back to the customer.
    Delivered,
    /// Cancelled before processing started.
    Cancelled,
}

impl OrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Received => "received",
            OrderStatus::Cleaned => "cleaned",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal status.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Received
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order Type / Payment
// =============================================================================

/// How the order reaches the shop and gets back to the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Walk-in drop-off at the counter.
    Counter,
    /// Driver collects from and returns to the customer's address.
    PickupDelivery,
}

impl Default for OrderType {
    fn default() -> Self {
        OrderType::Counter
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Unpaid
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; counts toward the drawer's expected cash.
    Cash,
    /// Card charged through the payment gateway.
    Card,
    /// Anything else (app transfer, house account).
    Other,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Other => "other",
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One priced line on an order.
///
/// `quantity` is fractional because wash & fold is sold by the pound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    /// Catalog service this line was priced from (None for ad-hoc charges).
    #[serde(default)]
    pub service_id: Option<i64>,
    pub description: String,
    pub unit_price_cents: i64,
    pub quantity: f64,
}

impl LineItem {
    pub fn new(
        service_id: i64,
        description: impl Into<String>,
        unit_price_cents: i64,
        quantity: f64,
    ) -> Self {
        LineItem {
            service_id: Some(service_id),
            description: description.into(),
            unit_price_cents,
            quantity,
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// `unit_price × quantity`, rounded to the cent.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().times_quantity(self.quantity)
    }
}

// =============================================================================
// Actors
// =============================================================================

/// Staff account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Staff,
    Driver,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Driver => "driver",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated staff member performing an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Actor {
            id: id.into(),
            name: name.into(),
            role,
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Who created an order: a staff member at the POS or a customer online.
#[derive(Debug, Clone)]
pub enum OrderOrigin {
    Staff(Actor),
    Portal {
        customer_id: String,
        customer_name: String,
    },
}

impl OrderOrigin {
    /// Name written into `created_by_name` and the `received` stamp.
    pub fn name(&self) -> &str {
        match self {
            OrderOrigin::Staff(actor) => &actor.name,
            OrderOrigin::Portal { customer_name, .. } => customer_name,
        }
    }

    /// Staff user id, if a staff member created the order.
    pub fn staff_id(&self) -> Option<&str> {
        match self {
            OrderOrigin::Staff(actor) => Some(&actor.id),
            OrderOrigin::Portal { .. } => None,
        }
    }
}

/// A staff account (admin, counter staff, driver).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id.clone(), self.name.clone(), self.role)
    }
}

// =============================================================================
// Order
// =============================================================================

/// A customer order tracked through the processing pipeline.
///
/// ## Snapshot Pattern
/// `customer_*` fields are copied from the customer record at creation and
/// are not rewritten when the customer later edits their profile.
///
/// ## Stage Stamps
/// Each pipeline stage records who moved the order there and when
/// (`received_by` / `received_at`, ...). `pickup_*` is stamped by the driver
/// when a pickup/delivery order is collected from the customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Human-readable business key (`KP00042`), unique and never reused.
    pub order_number: String,

    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    /// Trailing ten digits of `customer_phone`, used to match portal logins.
    pub customer_phone_key: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,

    pub order_type: OrderType,
    /// Stored as a JSON array column.
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub items: Vec<LineItem>,

    pub subtotal_cents: i64,
    #[ts(as = "f64")]
    pub discount_percent: Percent,
    pub discount_cents: i64,
    pub adjustment_cents: i64,
    /// Rate used the last time totals were computed.
    #[ts(as = "f64")]
    pub tax_rate: Percent,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub weight_lbs: Option<f64>,

    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
    pub card_last_four: Option<String>,
    /// Gateway transaction id for card payments.
    pub payment_reference: Option<String>,
    pub notes: Option<String>,

    pub created_by: Option<String>,
    pub created_by_name: Option<String>,

    pub received_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub received_at: Option<DateTime<Utc>>,
    pub cleaned_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub cleaned_at: Option<DateTime<Utc>>,
    pub ready_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub ready_at: Option<DateTime<Utc>>,
    pub delivered_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
    pub pickup_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub pickup_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub delivery_photo: Option<String>,

    /// Local calendar date the order was taken (drives drawer and reports).
    #[ts(as = "String")]
    pub business_date: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Whether this order belongs to the given portal customer: linked by id,
    /// or an unlinked order whose snapshot phone matches.
    pub fn belongs_to(&self, customer_id: &str, phone_key: &str) -> bool {
        match &self.customer_id {
            Some(id) => id == customer_id,
            None => self.customer_phone_key.as_deref() == Some(phone_key),
        }
    }
}

/// Input for creating an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct NewOrder {
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub order_type: OrderType,
    pub items: Vec<LineItem>,
    /// Falls back to the linked customer's standing discount when absent.
    #[ts(as = "Option<f64>")]
    pub discount_percent: Option<Percent>,
    pub adjustment_cents: i64,
    pub weight_lbs: Option<f64>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
}

/// Partial order edit: `Some` replaces the field, `None` keeps it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct OrderUpdate {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub customer_address: Option<String>,
    pub order_type: Option<OrderType>,
    pub items: Option<Vec<LineItem>>,
    #[ts(as = "Option<f64>")]
    pub discount_percent: Option<Percent>,
    pub adjustment_cents: Option<i64>,
    pub weight_lbs: Option<f64>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

impl OrderUpdate {
    /// True when the edit changes an input of the money calculation.
    pub fn touches_money(&self) -> bool {
        self.items.is_some() || self.discount_percent.is_some() || self.adjustment_cents.is_some()
    }
}

/// The subset of an order a customer may change from the portal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct CustomerOrderEdit {
    pub items: Option<Vec<LineItem>>,
    pub customer_address: Option<String>,
    pub notes: Option<String>,
}

impl From<CustomerOrderEdit> for OrderUpdate {
    fn from(edit: CustomerOrderEdit) -> Self {
        OrderUpdate {
            items: edit.items,
            customer_address: edit.customer_address,
            notes: edit.notes,
            ..OrderUpdate::default()
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPreference {
    None,
    Email,
    Sms,
}

impl Default for NotificationPreference {
    fn default() -> Self {
        NotificationPreference::Sms
    }
}

/// A laundromat customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Digits only.
    pub phone: String,
    /// Trailing ten digits of `phone`; the portal login key.
    pub phone_key: String,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Argon2 PHC string. `None` for customers created at the counter who
    /// have never logged in to the portal.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: Option<String>,
    #[ts(as = "f64")]
    pub discount_percent: Percent,
    pub subscription_plan: Option<String>,
    pub notification_preference: NotificationPreference,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    #[inline]
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Input for creating a customer at the counter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    #[ts(as = "Option<f64>")]
    pub discount_percent: Option<Percent>,
    pub subscription_plan: Option<String>,
    pub notification_preference: Option<NotificationPreference>,
}

/// Partial customer edit: `Some` replaces the field, `None` keeps it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[ts(as = "Option<f64>")]
    pub discount_percent: Option<Percent>,
    pub subscription_plan: Option<String>,
    pub notification_preference: Option<NotificationPreference>,
}

// =============================================================================
// Service Catalog
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ServiceUnit {
    Item,
    Lb,
}

/// A priced service offered by the shop.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub unit_price_cents: i64,
    pub unit: ServiceUnit,
    pub description: Option<String>,
    pub active: bool,
    pub sort_order: i64,
}

/// Price / availability edit for a catalog service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct ServiceUpdate {
    pub unit_price_cents: Option<i64>,
    pub active: Option<bool>,
}

// =============================================================================
// Time Entry
// =============================================================================

/// A clock-in/clock-out record. `clock_out == None` means on shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TimeEntry {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub role: Role,
    #[ts(as = "String")]
    pub clock_in: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub clock_out: Option<DateTime<Utc>>,
    pub hours_worked: Option<f64>,
    pub machine_counter_start: Option<i64>,
    pub machine_counter_end: Option<i64>,
    pub shift_notes: Option<String>,
    #[ts(as = "String")]
    pub business_date: NaiveDate,
}

impl TimeEntry {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.clock_out.is_none()
    }
}

// =============================================================================
// Cash Drawer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DrawerEventKind {
    /// Start-of-day denomination count.
    Opening,
    /// End-of-day denomination count.
    Closing,
    /// Cash paid out of the drawer.
    Expense,
}

impl DrawerEventKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DrawerEventKind::Opening => "opening",
            DrawerEventKind::Closing => "closing",
            DrawerEventKind::Expense => "expense",
        }
    }

    /// Opening and closing are counts; at most one of each per date.
    pub const fn is_count(&self) -> bool {
        matches!(self, DrawerEventKind::Opening | DrawerEventKind::Closing)
    }
}

impl fmt::Display for DrawerEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable cash drawer record.
///
/// Denomination columns are zero for expenses; `total_cents` is the counted
/// total for opening/closing and the amount paid out for an expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DrawerEvent {
    pub id: String,
    pub kind: DrawerEventKind,
    #[ts(as = "String")]
    pub business_date: NaiveDate,
    pub hundreds: i64,
    pub fifties: i64,
    pub twenties: i64,
    pub tens: i64,
    pub fives: i64,
    pub ones: i64,
    /// Coins and anything smaller than a dollar bill.
    pub change_cents: i64,
    pub total_cents: i64,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: String,
    pub recorded_by_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl DrawerEvent {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Feedback
// =============================================================================

/// Customer feedback left through the portal.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Feedback {
    pub id: String,
    pub customer_id: String,
    pub order_id: Option<String>,
    pub rating: Option<i64>,
    pub message: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct NewFeedback {
    pub order_id: Option<String>,
    pub rating: Option<i64>,
    pub message: String,
}

// =============================================================================
// Unit Tests
// =============================================================================
