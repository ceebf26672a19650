//! # Order Lifecycle
//!
//! The order status state machine, stage stamping and the edit rules that
//! depend on status.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   received ───► cleaned ───► ready ───► delivered (terminal)           │
//! │      │                                     ▲                            │
//! │      │            deliver() fast path ─────┘ (from any live status)    │
//! │      ▼                                                                  │
//! │   cancelled (terminal)                                                 │
//! │                                                                         │
//! │   Same-status request: status unchanged, stage stamp overwritten.      │
//! │   Anything else: InvalidTransition.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Who May Edit
//! | Status     | Staff edit | Customer edit / cancel |
//! |------------|------------|------------------------|
//! | received   | yes        | yes (own orders)       |
//! | cleaned    | yes        | Forbidden              |
//! | ready      | yes        | Forbidden              |
//! | delivered  | NotEditable| Forbidden              |
//! | cancelled  | NotEditable| Forbidden              |
//!
//! Everything here mutates an in-memory [`Order`]; the order repository runs
//! these functions inside the transaction that persists the result, so a
//! rejected change never reaches storage.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, Percent};
use crate::pricing::{self, PricingInput};
use crate::types::{
    Actor, NewOrder, Order, OrderOrigin, OrderStatus, OrderType, OrderUpdate, PaymentMethod,
    PaymentStatus,
};
use crate::validation;

/// A stampable point in an order's life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Cleaned,
    Ready,
    Delivered,
    Pickup,
    Cancelled,
}

impl Stage {
    /// The stage a status stamps when entered.
    pub const fn of(status: OrderStatus) -> Stage {
        match status {
            OrderStatus::Received => Stage::Received,
            OrderStatus::Cleaned => Stage::Cleaned,
            OrderStatus::Ready => Stage::Ready,
            OrderStatus::Delivered => Stage::Delivered,
            OrderStatus::Cancelled => Stage::Cancelled,
        }
    }
}

/// Whether `from → to` is a legal single forward step.
pub const fn is_forward_step(from: OrderStatus, to: OrderStatus) -> bool {
    matches!(
        (from, to),
        (OrderStatus::Received, OrderStatus::Cleaned)
            | (OrderStatus::Cleaned, OrderStatus::Ready)
            | (OrderStatus::Ready, OrderStatus::Delivered)
            | (OrderStatus::Received, OrderStatus::Cancelled)
    )
}

// =============================================================================
// Creation
// =============================================================================

/// Builds a new `received` order with computed totals and the received stamp.
///
/// `order_number` is left empty; storage assigns it in the inserting
/// transaction. `default_discount` applies when the input carries none
/// (the linked customer's standing discount).
pub fn open_order(
    input: NewOrder,
    origin: &OrderOrigin,
    default_discount: Percent,
    tax_rate: Percent,
    business_date: NaiveDate,
    now: DateTime<Utc>,
) -> CoreResult<Order> {
    validation::validate_new_order(&input)?;

    let discount = input.discount_percent.unwrap_or(default_discount);
    let totals = pricing::compute(&PricingInput {
        items: &input.items,
        discount,
        adjustment_cents: input.adjustment_cents,
        tax_rate,
    })?;

    let customer_phone = input
        .customer_phone
        .as_deref()
        .map(validation::canonical_phone)
        .filter(|p| !p.is_empty());
    let customer_phone_key = customer_phone.as_deref().and_then(validation::phone_key);

    let mut order = Order {
        id: Uuid::new_v4().to_string(),
        order_number: String::new(),
        customer_id: input.customer_id,
        customer_name: input.customer_name.filter(|n| !n.trim().is_empty()),
        customer_phone,
        customer_phone_key,
        customer_email: input.customer_email.filter(|e| !e.trim().is_empty()),
        customer_address: input.customer_address,
        order_type: input.order_type,
        items: input.items,
        subtotal_cents: totals.subtotal_cents,
        discount_percent: discount,
        discount_cents: totals.discount_cents,
        adjustment_cents: input.adjustment_cents,
        tax_rate,
        tax_cents: totals.tax_cents,
        total_cents: totals.total_cents,
        weight_lbs: input.weight_lbs,
        status: OrderStatus::Received,
        payment_status: input.payment_status,
        payment_method: input.payment_method,
        card_last_four: None,
        payment_reference: None,
        notes: input.notes,
        created_by: origin.staff_id().map(str::to_string),
        created_by_name: Some(origin.name().to_string()),
        received_by: None,
        received_at: None,
        cleaned_by: None,
        cleaned_at: None,
        ready_by: None,
        ready_at: None,
        delivered_by: None,
        delivered_at: None,
        pickup_by: None,
        pickup_at: None,
        cancelled_by: None,
        cancelled_at: None,
        delivery_photo: None,
        business_date,
        created_at: now,
        updated_at: now,
    };
    stamp(&mut order, Stage::Received, origin.name(), now);
    Ok(order)
}

// =============================================================================
// Transitions
// =============================================================================

/// Records `{stage}_by = name, {stage}_at = now`, overwriting any earlier stamp.
pub fn stamp(order: &mut Order, stage: Stage, name: &str, now: DateTime<Utc>) {
    let (by, at) = match stage {
        Stage::Received => (&mut order.received_by, &mut order.received_at),
        Stage::Cleaned => (&mut order.cleaned_by, &mut order.cleaned_at),
        Stage::Ready => (&mut order.ready_by, &mut order.ready_at),
        Stage::Delivered => (&mut order.delivered_by, &mut order.delivered_at),
        Stage::Pickup => (&mut order.pickup_by, &mut order.pickup_at),
        Stage::Cancelled => (&mut order.cancelled_by, &mut order.cancelled_at),
    };
    *by = Some(name.to_string());
    *at = Some(now);
}

/// Moves an order to `next`, stamping the stage with the actor.
///
/// ## Errors
/// `InvalidTransition` unless `next` is the current status (re-stamp) or a
/// legal forward step.
pub fn transition(
    order: &mut Order,
    next: OrderStatus,
    actor: &Actor,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    if next != order.status && !is_forward_step(order.status, next) {
        return Err(CoreError::InvalidTransition {
            order_number: order.order_number.clone(),
            from: order.status,
            to: next,
        });
    }

    order.status = next;
    stamp(order, Stage::of(next), &actor.name, now);
    order.updated_at = now;
    Ok(())
}

/// Cancels an order. Only `received` orders can be cancelled.
pub fn cancel(order: &mut Order, actor_name: &str, now: DateTime<Utc>) -> CoreResult<()> {
    if order.status != OrderStatus::Received {
        return Err(CoreError::InvalidTransition {
            order_number: order.order_number.clone(),
            from: order.status,
            to: OrderStatus::Cancelled,
        });
    }

    order.status = OrderStatus::Cancelled;
    stamp(order, Stage::Cancelled, actor_name, now);
    order.updated_at = now;
    Ok(())
}

/// Delivery fast path: marks the order delivered from any live status,
/// skipping stages that were never visited.
///
/// Returns the stages that were skipped so the caller can flag them.
pub fn deliver(
    order: &mut Order,
    actor: &Actor,
    photo: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<Vec<Stage>> {
    if order.status.is_terminal() {
        return Err(CoreError::InvalidTransition {
            order_number: order.order_number.clone(),
            from: order.status,
            to: OrderStatus::Delivered,
        });
    }

    let mut skipped = Vec::new();
    if order.status == OrderStatus::Received {
        skipped.push(Stage::Cleaned);
    }
    if matches!(order.status, OrderStatus::Received | OrderStatus::Cleaned) {
        skipped.push(Stage::Ready);
    }

    order.status = OrderStatus::Delivered;
    stamp(order, Stage::Delivered, &actor.name, now);
    if photo.is_some() {
        order.delivery_photo = photo;
    }
    order.updated_at = now;
    Ok(skipped)
}

/// Driver collected a pickup/delivery order from the customer.
///
/// Stamps `pickup_*` without changing status.
pub fn mark_picked_up(order: &mut Order, actor: &Actor, now: DateTime<Utc>) -> CoreResult<()> {
    if order.order_type != OrderType::PickupDelivery {
        return Err(ValidationError::NotAllowed {
            field: "order_type".to_string(),
            allowed: vec!["pickup_delivery".to_string()],
        }
        .into());
    }
    if order.status != OrderStatus::Received {
        return Err(ValidationError::NotAllowed {
            field: "status".to_string(),
            allowed: vec![OrderStatus::Received.to_string()],
        }
        .into());
    }

    stamp(order, Stage::Pickup, &actor.name, now);
    order.updated_at = now;
    Ok(())
}

// =============================================================================
// Edits
// =============================================================================

/// Staff may edit any order that has not reached a terminal status.
pub fn ensure_staff_editable(order: &Order) -> CoreResult<()> {
    if order.status.is_terminal() {
        return Err(CoreError::OrderNotEditable {
            order_number: order.order_number.clone(),
            status: order.status,
        });
    }
    Ok(())
}

/// Customers may modify only their own orders, and only while `received`.
pub fn ensure_customer_modifiable(
    order: &Order,
    customer_id: &str,
    phone_key: &str,
) -> CoreResult<()> {
    if !order.belongs_to(customer_id, phone_key) {
        return Err(CoreError::forbidden(format!(
            "order {} does not belong to this customer",
            order.order_number
        )));
    }
    if order.status != OrderStatus::Received {
        return Err(CoreError::forbidden(format!(
            "order {} is already {} and can no longer be changed online",
            order.order_number, order.status
        )));
    }
    Ok(())
}

/// Applies a partial edit, recomputing totals when a money input changed.
///
/// Status rules are checked by the caller ([`ensure_staff_editable`] or
/// [`ensure_customer_modifiable`]); this only applies and validates fields.
pub fn apply_update(
    order: &mut Order,
    update: OrderUpdate,
    tax_rate: Percent,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    let reprice = update.touches_money();

    if let Some(weight) = update.weight_lbs {
        validate_weight(weight)?;
        order.weight_lbs = Some(weight);
    }
    if let Some(name) = update.customer_name {
        order.customer_name = Some(name);
    }
    if let Some(phone) = update.customer_phone {
        let phone = validation::canonical_phone(&phone);
        order.customer_phone_key = validation::phone_key(&phone);
        order.customer_phone = Some(phone).filter(|p| !p.is_empty());
    }
    if let Some(email) = update.customer_email {
        order.customer_email = Some(email);
    }
    if let Some(address) = update.customer_address {
        order.customer_address = Some(address);
    }
    if let Some(order_type) = update.order_type {
        order.order_type = order_type;
    }
    if let Some(items) = update.items {
        order.items = items;
    }
    if let Some(discount) = update.discount_percent {
        order.discount_percent = discount;
    }
    if let Some(adjustment) = update.adjustment_cents {
        order.adjustment_cents = adjustment;
    }
    if let Some(method) = update.payment_method {
        order.payment_method = Some(method);
    }
    if let Some(notes) = update.notes {
        order.notes = Some(notes);
    }

    if reprice {
        pricing::reprice(order, tax_rate)?;
    }
    order.updated_at = now;
    Ok(())
}

/// Sets payment status (and optionally method). Independent of order status.
pub fn set_payment(
    order: &mut Order,
    status: PaymentStatus,
    method: Option<PaymentMethod>,
    now: DateTime<Utc>,
) {
    order.payment_status = status;
    if method.is_some() {
        order.payment_method = method;
    }
    order.updated_at = now;
}

/// Amount to charge for an order, if it can be charged at all.
pub fn ensure_chargeable(order: &Order) -> CoreResult<Money> {
    if order.status == OrderStatus::Cancelled {
        return Err(ValidationError::NotAllowed {
            field: "status".to_string(),
            allowed: vec![
                OrderStatus::Received.to_string(),
                OrderStatus::Cleaned.to_string(),
                OrderStatus::Ready.to_string(),
                OrderStatus::Delivered.to_string(),
            ],
        }
        .into());
    }
    if order.is_paid() {
        return Err(ValidationError::NotAllowed {
            field: "payment_status".to_string(),
            allowed: vec!["unpaid".to_string()],
        }
        .into());
    }
    if !order.total().is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "total_cents".to_string(),
        }
        .into());
    }
    Ok(order.total())
}

/// Records an approved card charge: paid, by card, with the masked number.
///
/// The order must still be chargeable for exactly `charged`; an order that
/// was paid, cancelled or re-priced while the gateway call ran is rejected.
pub fn record_card_payment(
    order: &mut Order,
    charged: Money,
    last_four: String,
    reference: String,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    let due = ensure_chargeable(order)?;
    if due != charged {
        return Err(CoreError::ChargeAmountChanged {
            order_number: order.order_number.clone(),
            charged_cents: charged.cents(),
            due_cents: due.cents(),
        });
    }

    order.payment_status = PaymentStatus::Paid;
    order.payment_method = Some(PaymentMethod::Card);
    order.card_last_four = Some(last_four);
    order.payment_reference = Some(reference);
    order.updated_at = now;
    Ok(())
}

pub(crate) fn validate_weight(weight: f64) -> CoreResult<()> {
    if !weight.is_finite() {
        return Err(ValidationError::invalid_format("weight_lbs", "must be a finite number").into());
    }
    if weight < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "weight_lbs".to_string(),
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LineItem, Role};
    use crate::DEFAULT_TAX_RATE;
    use chrono::NaiveDate;

    fn sample_order(status: OrderStatus) -> Order {
        let now = Utc::now();
        let mut order = Order {
            id: "o-1".to_string(),
            order_number: "KP00001".to_string(),
            customer_id: Some("c-1".to_string()),
            customer_name: Some("Dana".to_string()),
            customer_phone: Some("2125550101".to_string()),
            customer_phone_key: Some("2125550101".to_string()),
            customer_email: None,
            customer_address: None,
            order_type: OrderType::Counter,
            items: vec![LineItem::new(1, "Wash & Fold", 140, 20.0)],
            subtotal_cents: 0,
            discount_percent: Percent::zero(),
            discount_cents: 0,
            adjustment_cents: 0,
            tax_rate: DEFAULT_TAX_RATE,
            tax_cents: 0,
            total_cents: 0,
            weight_lbs: Some(20.0),
            status,
            payment_status: PaymentStatus::Unpaid,
            payment_method: None,
            card_last_four: None,
            payment_reference: None,
            notes: None,
            created_by: None,
            created_by_name: None,
            received_by: None,
            received_at: None,
            cleaned_by: None,
            cleaned_at: None,
            ready_by: None,
            ready_at: None,
            delivered_by: None,
            delivered_at: None,
            pickup_by: None,
            pickup_at: None,
            cancelled_by: None,
            cancelled_at: None,
            delivery_photo: None,
            business_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            created_at: now,
            updated_at: now,
        };
        pricing::reprice(&mut order, DEFAULT_TAX_RATE).unwrap();
        order
    }

    fn staff() -> Actor {
        Actor::new("u-2", "Erika", Role::Staff)
    }

    #[test]
    fn test_forward_steps() {
        let mut order = sample_order(OrderStatus::Received);
        transition(&mut order, OrderStatus::Cleaned, &staff(), Utc::now()).unwrap();
        transition(&mut order, OrderStatus::Ready, &staff(), Utc::now()).unwrap();
        transition(&mut order, OrderStatus::Delivered, &staff(), Utc::now()).unwrap();

        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.cleaned_by.as_deref(), Some("Erika"));
        assert!(order.ready_at.is_some());
        assert!(order.delivered_at.is_some());
    }

    #[test]
    fn test_skipping_a_stage_is_rejected() {
        let mut order = sample_order(OrderStatus::Received);
        let err = transition(&mut order, OrderStatus::Ready, &staff(), Utc::now()).unwrap_err();

        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(order.status, OrderStatus::Received);
        assert!(order.ready_at.is_none());
    }

    #[test]
    fn test_cancel_only_from_received() {
        let mut order = sample_order(OrderStatus::Received);
        transition(&mut order, OrderStatus::Cancelled, &staff(), Utc::now()).unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.cancelled_by.as_deref(), Some("Erika"));

        let mut cleaned = sample_order(OrderStatus::Cleaned);
        assert!(cancel(&mut cleaned, "Erika", Utc::now()).is_err());
        assert_eq!(cleaned.status, OrderStatus::Cleaned);
    }

    #[test]
    fn test_second_cancel_keeps_first_audit() {
        let mut order = sample_order(OrderStatus::Received);
        let first = Utc::now();
        cancel(&mut order, "Erika", first).unwrap();

        let err = cancel(&mut order, "Beni", first + chrono::Duration::minutes(5)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Cancelled,
                ..
            }
        ));
        assert_eq!(order.cancelled_by.as_deref(), Some("Erika"));
        assert_eq!(order.cancelled_at, Some(first));
    }

    #[test]
    fn test_terminal_states_reject_moves() {
        let mut cancelled = sample_order(OrderStatus::Cancelled);
        assert!(transition(&mut cancelled, OrderStatus::Cleaned, &staff(), Utc::now()).is_err());

        for next in [
            OrderStatus::Received,
            OrderStatus::Cleaned,
            OrderStatus::Ready,
            OrderStatus::Cancelled,
        ] {
            let mut delivered = sample_order(OrderStatus::Delivered);
            assert!(transition(&mut delivered, next, &staff(), Utc::now()).is_err());
        }
    }

    #[test]
    fn test_same_status_restamps() {
        let mut order = sample_order(OrderStatus::Cleaned);
        let first = Utc::now();
        stamp(&mut order, Stage::Cleaned, "Beni", first);

        let later = first + chrono::Duration::minutes(5);
        transition(&mut order, OrderStatus::Cleaned, &staff(), later).unwrap();

        assert_eq!(order.status, OrderStatus::Cleaned);
        assert_eq!(order.cleaned_by.as_deref(), Some("Erika"));
        assert_eq!(order.cleaned_at, Some(later));
    }

    #[test]
    fn test_deliver_fast_path_reports_skipped_stages() {
        let mut order = sample_order(OrderStatus::Received);
        let skipped = deliver(
            &mut order,
            &staff(),
            Some("photos/kp1.jpg".to_string()),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(skipped, vec![Stage::Cleaned, Stage::Ready]);
        assert_eq!(order.status, OrderStatus::Delivered);
        assert_eq!(order.delivery_photo.as_deref(), Some("photos/kp1.jpg"));

        let mut ready = sample_order(OrderStatus::Ready);
        assert!(deliver(&mut ready, &staff(), None, Utc::now()).unwrap().is_empty());

        let mut cancelled = sample_order(OrderStatus::Cancelled);
        assert!(deliver(&mut cancelled, &staff(), None, Utc::now()).is_err());
    }

    #[test]
    fn test_pickup_stamp_requires_pickup_delivery() {
        let driver = Actor::new("u-5", "Driver", Role::Driver);

        let mut counter = sample_order(OrderStatus::Received);
        assert!(mark_picked_up(&mut counter, &driver, Utc::now()).is_err());

        let mut route = sample_order(OrderStatus::Received);
        route.order_type = OrderType::PickupDelivery;
        mark_picked_up(&mut route, &driver, Utc::now()).unwrap();
        assert_eq!(route.pickup_by.as_deref(), Some("Driver"));
        assert_eq!(route.status, OrderStatus::Received);
    }

    #[test]
    fn test_staff_edit_rules() {
        assert!(ensure_staff_editable(&sample_order(OrderStatus::Ready)).is_ok());
        assert!(matches!(
            ensure_staff_editable(&sample_order(OrderStatus::Delivered)),
            Err(CoreError::OrderNotEditable { .. })
        ));
    }

    #[test]
    fn test_customer_edit_boundary() {
        let received = sample_order(OrderStatus::Received);
        assert!(ensure_customer_modifiable(&received, "c-1", "2125550101").is_ok());
        assert!(matches!(
            ensure_customer_modifiable(&received, "c-9", "9999999999"),
            Err(CoreError::Forbidden(_))
        ));

        let cleaned = sample_order(OrderStatus::Cleaned);
        assert!(matches!(
            ensure_customer_modifiable(&cleaned, "c-1", "2125550101"),
            Err(CoreError::Forbidden(_))
        ));
    }

    #[test]
    fn test_unlinked_order_matches_by_phone() {
        let mut order = sample_order(OrderStatus::Received);
        order.customer_id = None;
        assert!(ensure_customer_modifiable(&order, "c-7", "2125550101").is_ok());
    }

    #[test]
    fn test_apply_update_reprices_on_money_change() {
        let mut order = sample_order(OrderStatus::Received);
        assert_eq!(order.total_cents, 3049);

        apply_update(
            &mut order,
            OrderUpdate {
                notes: Some("no bleach".to_string()),
                ..OrderUpdate::default()
            },
            DEFAULT_TAX_RATE,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(order.total_cents, 3049);
        assert_eq!(order.notes.as_deref(), Some("no bleach"));

        apply_update(
            &mut order,
            OrderUpdate {
                items: Some(vec![LineItem::new(1, "Wash & Fold", 140, 10.0)]),
                ..OrderUpdate::default()
            },
            DEFAULT_TAX_RATE,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(order.subtotal_cents, 1400);
        assert_eq!(order.tax_cents, 124);
        assert_eq!(order.total_cents, 1524);
    }

    #[test]
    fn test_apply_update_rejects_bad_weight() {
        let mut order = sample_order(OrderStatus::Received);
        let result = apply_update(
            &mut order,
            OrderUpdate {
                weight_lbs: Some(-3.0),
                ..OrderUpdate::default()
            },
            DEFAULT_TAX_RATE,
            Utc::now(),
        );
        assert!(result.is_err());
        assert_eq!(order.weight_lbs, Some(20.0));
    }

    #[test]
    fn test_open_order_stamps_received_and_prices() {
        let input = NewOrder {
            customer_name: Some("Dana".to_string()),
            customer_phone: Some("(212) 555-0101".to_string()),
            items: vec![LineItem::new(1, "Wash & Fold", 140, 20.0)],
            weight_lbs: Some(20.0),
            ..NewOrder::default()
        };
        let origin = OrderOrigin::Staff(staff());
        let now = Utc::now();
        let order = open_order(
            input,
            &origin,
            Percent::zero(),
            DEFAULT_TAX_RATE,
            NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
            now,
        )
        .unwrap();

        assert_eq!(order.status, OrderStatus::Received);
        assert_eq!(order.received_by.as_deref(), Some("Erika"));
        assert_eq!(order.received_at, Some(now));
        assert_eq!(order.created_by.as_deref(), Some("u-2"));
        assert_eq!(order.customer_phone.as_deref(), Some("2125550101"));
        assert_eq!(order.customer_phone_key.as_deref(), Some("2125550101"));
        assert_eq!(order.total_cents, 3049);
        assert!(order.order_number.is_empty());
    }

    #[test]
    fn test_open_order_uses_default_discount() {
        let input = NewOrder {
            items: vec![LineItem::new(1, "Wash & Fold", 1000, 1.0)],
            ..NewOrder::default()
        };
        let origin = OrderOrigin::Portal {
            customer_id: "c-1".to_string(),
            customer_name: "Dana".to_string(),
        };
        let order = open_order(
            input,
            &origin,
            Percent::from_percentage(10.0),
            Percent::zero(),
            NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(order.discount_cents, 100);
        assert_eq!(order.total_cents, 900);
        assert_eq!(order.created_by, None);
        assert_eq!(order.created_by_name.as_deref(), Some("Dana"));
    }

    #[test]
    fn test_ensure_chargeable() {
        let order = sample_order(OrderStatus::Ready);
        assert_eq!(ensure_chargeable(&order).unwrap().cents(), 3049);

        let mut paid = sample_order(OrderStatus::Ready);
        paid.payment_status = PaymentStatus::Paid;
        assert!(ensure_chargeable(&paid).is_err());

        assert!(ensure_chargeable(&sample_order(OrderStatus::Cancelled)).is_err());
    }

    #[test]
    fn test_card_payment_sets_all_fields() {
        let mut order = sample_order(OrderStatus::Ready);
        let due = order.total();
        record_card_payment(&mut order, due, "4242".to_string(), "txn_1".to_string(), Utc::now())
            .unwrap();

        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.payment_method, Some(PaymentMethod::Card));
        assert_eq!(order.card_last_four.as_deref(), Some("4242"));

        // A second approval for the same order is not recorded.
        let err = record_card_payment(&mut order, due, "4242".to_string(), "txn_2".to_string(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(order.payment_reference.as_deref(), Some("txn_1"));
    }

    #[test]
    fn test_card_payment_rejects_changed_state() {
        let mut cancelled = sample_order(OrderStatus::Received);
        let due = cancelled.total();
        cancel(&mut cancelled, "Erika", Utc::now()).unwrap();
        assert!(record_card_payment(&mut cancelled, due, "4242".to_string(), "txn_1".to_string(), Utc::now()).is_err());
        assert!(!cancelled.is_paid());

        let mut repriced = sample_order(OrderStatus::Ready);
        let err = record_card_payment(
            &mut repriced,
            Money::from_cents(1000),
            "4242".to_string(),
            "txn_1".to_string(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::ChargeAmountChanged {
                charged_cents: 1000,
                due_cents: 3049,
                ..
            }
        ));
        assert!(!repriced.is_paid());
    }
}
