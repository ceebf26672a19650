//! # Order Service
//!
//! Orchestrates the order store with its collaborators.
//!
//! ## Responsibilities
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderService                                                           │
//! │                                                                         │
//! │  create ─────────► settings.tax_rate() ─► customer snapshot/discount    │
//! │                    ─► lifecycle::open_order ─► orders.create (tx)       │
//! │                                                                         │
//! │  set_status ─────► orders.set_status (tx) ─► notify (spawned)           │
//! │  deliver                                                                │
//! │                                                                         │
//! │  charge_card ────► per-order lock ─► ensure_chargeable                  │
//! │                    ─► gateway.charge (timeout)                          │
//! │                    ├── approved ─► orders.record_card_payment (tx,      │
//! │                    │               re-checks the order)                 │
//! │                    └── declined ─► 402, nothing written                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories own the transactions; this layer resolves inputs (tax rate,
//! catalog prices, customer defaults) and talks to the outside world.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kleen_core::lifecycle;
use kleen_core::{
    Actor, Customer, CustomerOrderEdit, LineItem, NewOrder, Order, OrderOrigin, OrderStatus,
    OrderType, OrderUpdate, PaymentMethod, PaymentStatus, Percent,
};
use kleen_db::{business_date_today, Database};
use serde::Deserialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::services::notify::{Notification, NotificationDispatcher};
use crate::services::payment::{CardDetails, ChargeOutcome, PaymentGateway};

/// An order placed from the customer portal.
///
/// Prices are never taken from the client; items are re-priced from the
/// active catalog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PortalOrder {
    pub items: Vec<LineItem>,
    /// Defaults to pickup/delivery.
    pub order_type: Option<OrderType>,
    pub customer_address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

/// One lock per order id, held for the whole of a card charge.
#[derive(Clone, Default)]
struct ChargeLocks {
    inflight: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ChargeLocks {
    async fn acquire(&self, order_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            // Entries only the map still holds have no charge running or waiting.
            inflight.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(inflight.entry(order_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

#[derive(Clone)]
pub struct OrderService {
    db: Database,
    gateway: Arc<dyn PaymentGateway>,
    notifier: NotificationDispatcher,
    io_timeout: Duration,
    charge_locks: ChargeLocks,
}

impl OrderService {
    pub fn new(
        db: Database,
        gateway: Arc<dyn PaymentGateway>,
        notifier: NotificationDispatcher,
        io_timeout: Duration,
    ) -> Self {
        OrderService {
            db,
            gateway,
            notifier,
            io_timeout,
            charge_locks: ChargeLocks::default(),
        }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Counter order taken by staff.
    ///
    /// When the order is linked to a customer, blank snapshot fields are
    /// filled from the customer record and the customer's standing discount
    /// applies unless the request sets one.
    pub async fn create(&self, mut input: NewOrder, actor: &Actor) -> ApiResult<Order> {
        let tax_rate = self.db.settings().tax_rate().await?;

        let mut default_discount = Percent::zero();
        if let Some(customer_id) = input.customer_id.clone() {
            let customer = self.db.customers().get(&customer_id).await?;
            fill_snapshot(&mut input, &customer);
            default_discount = customer.discount_percent;
        }

        let order = lifecycle::open_order(
            input,
            &OrderOrigin::Staff(actor.clone()),
            default_discount,
            tax_rate,
            business_date_today(),
            Utc::now(),
        )?;
        Ok(self.db.orders().create(order).await?)
    }

    /// Order booked by a customer through the portal.
    pub async fn create_for_customer(&self, customer: &Customer, request: PortalOrder) -> ApiResult<Order> {
        let items = self.db.services().price_items(request.items).await?;
        let tax_rate = self.db.settings().tax_rate().await?;

        let mut input = NewOrder {
            customer_id: Some(customer.id.clone()),
            order_type: request.order_type.unwrap_or(OrderType::PickupDelivery),
            items,
            customer_address: request.customer_address,
            payment_method: request.payment_method,
            payment_status: PaymentStatus::Unpaid,
            notes: request.notes,
            ..NewOrder::default()
        };
        fill_snapshot(&mut input, customer);

        let origin = OrderOrigin::Portal {
            customer_id: customer.id.clone(),
            customer_name: customer.name.clone(),
        };
        let order = lifecycle::open_order(
            input,
            &origin,
            customer.discount_percent,
            tax_rate,
            business_date_today(),
            Utc::now(),
        )?;
        Ok(self.db.orders().create(order).await?)
    }

    // =========================================================================
    // Edits & Transitions
    // =========================================================================

    pub async fn update(&self, id: &str, update: OrderUpdate) -> ApiResult<Order> {
        let tax_rate = self.db.settings().tax_rate().await?;
        Ok(self.db.orders().update(id, update, tax_rate).await?)
    }

    pub async fn update_as_customer(
        &self,
        id: &str,
        customer: &Customer,
        edit: CustomerOrderEdit,
    ) -> ApiResult<Order> {
        let edit = match edit.items {
            Some(items) => CustomerOrderEdit {
                items: Some(self.db.services().price_items(items).await?),
                ..edit
            },
            None => edit,
        };
        let tax_rate = self.db.settings().tax_rate().await?;
        Ok(self
            .db
            .orders()
            .update_as_customer(id, &customer.id, &customer.phone_key, edit, tax_rate)
            .await?)
    }

    pub async fn set_status(&self, id: &str, status: OrderStatus, actor: &Actor) -> ApiResult<Order> {
        let order = self.db.orders().set_status(id, status, actor).await?;
        self.notify(&order);
        Ok(order)
    }

    /// Delivery fast path; see [`lifecycle::deliver`].
    pub async fn deliver(&self, id: &str, actor: &Actor, photo: Option<String>) -> ApiResult<Order> {
        let (order, _skipped) = self.db.orders().deliver(id, actor, photo).await?;
        self.notify(&order);
        Ok(order)
    }

    // =========================================================================
    // Card Payments
    // =========================================================================

    /// Charges the order total to a card.
    ///
    /// Only an approval writes anything: the order becomes paid by card with
    /// the last four digits and the gateway's transaction id. A decline,
    /// gateway failure or timeout leaves the order untouched.
    ///
    /// Charges for the same order run one at a time, so a second request
    /// sees the first one's result and is rejected as already paid.
    pub async fn charge_card(&self, id: &str, card: CardDetails) -> ApiResult<Order> {
        let _charging = self.charge_locks.acquire(id).await;
        let order = self.db.orders().get(id).await?;
        let amount = lifecycle::ensure_chargeable(&order)?;

        let charge = self.gateway.charge(&card, amount, &order.order_number);
        let outcome = match tokio::time::timeout(self.io_timeout, charge).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(order_number = %order.order_number, error = %e, "Payment gateway failed");
                return Err(ApiError::gateway(e.to_string()));
            }
            Err(_) => {
                warn!(order_number = %order.order_number, "Payment gateway timed out");
                return Err(ApiError::timeout("Payment gateway"));
            }
        };

        match outcome {
            ChargeOutcome::Approved {
                transaction_id,
                last_four,
            } => {
                let recorded = self
                    .db
                    .orders()
                    .record_card_payment(id, amount, last_four, transaction_id.clone())
                    .await;
                if let Err(e) = &recorded {
                    error!(
                        order_number = %order.order_number,
                        transaction_id = %transaction_id,
                        amount_cents = amount.cents(),
                        error = %e,
                        "Approved card charge could not be recorded"
                    );
                }
                Ok(recorded?)
            }
            ChargeOutcome::Declined { reason } => {
                info!(order_number = %order.order_number, reason = %reason, "Card declined");
                Err(ApiError::payment_declined(reason))
            }
        }
    }

    fn notify(&self, order: &Order) {
        if let Some(notification) = Notification::order_status(order) {
            self.notifier.dispatch(notification);
        }
    }
}

/// Copies customer details into blank snapshot fields.
fn fill_snapshot(input: &mut NewOrder, customer: &Customer) {
    fn blank(value: &Option<String>) -> bool {
        value.as_deref().map_or(true, |v| v.trim().is_empty())
    }

    if blank(&input.customer_name) {
        input.customer_name = Some(customer.name.clone());
    }
    if blank(&input.customer_phone) {
        input.customer_phone = Some(customer.phone.clone());
    }
    if blank(&input.customer_email) {
        input.customer_email = customer.email.clone();
    }
    if blank(&input.customer_address) {
        input.customer_address = customer.address.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::services::notify::LogNotifier;
    use crate::services::payment::{GatewayError, SandboxGateway};
    use crate::testing::{memory_db, staff_actor};
    use async_trait::async_trait;
    use kleen_core::{Money, NewCustomer, Role};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowGateway;

    #[async_trait]
    impl PaymentGateway for SlowGateway {
        async fn charge(&self, _: &CardDetails, _: Money, _: &str) -> Result<ChargeOutcome, GatewayError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(GatewayError::Unavailable("never answers".to_string()))
        }
    }

    /// Approves every charge after a short delay and counts the calls.
    #[derive(Default)]
    struct CountingGateway {
        charges: AtomicUsize,
    }

    #[async_trait]
    impl PaymentGateway for CountingGateway {
        async fn charge(&self, card: &CardDetails, _: Money, _: &str) -> Result<ChargeOutcome, GatewayError> {
            let n = self.charges.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(ChargeOutcome::Approved {
                transaction_id: format!("txn_{}", n),
                last_four: card.number[card.number.len() - 4..].to_string(),
            })
        }
    }

    fn service(db: &Database, gateway: Arc<dyn PaymentGateway>) -> OrderService {
        let notifier = NotificationDispatcher::new(Arc::new(LogNotifier), Duration::from_secs(1));
        OrderService::new(db.clone(), gateway, notifier, Duration::from_millis(100))
    }

    fn card(number: &str) -> CardDetails {
        CardDetails {
            number: number.to_string(),
            expiry: "12/49".to_string(),
            cvv: "123".to_string(),
        }
    }

    fn wash_and_fold(lbs: f64) -> NewOrder {
        NewOrder {
            items: vec![LineItem::new(1, "Wash & Fold", 140, lbs)],
            ..NewOrder::default()
        }
    }

    #[tokio::test]
    async fn test_create_uses_customer_snapshot_and_discount() {
        let db = memory_db().await;
        let actor = staff_actor(&db, "beni", Role::Staff).await;
        let customer = db
            .customers()
            .create(NewCustomer {
                name: "Dana Park".to_string(),
                phone: "(212) 555-0101".to_string(),
                discount_percent: Some(Percent::from_percentage(10.0)),
                ..NewCustomer::default()
            })
            .await
            .unwrap();

        let input = NewOrder {
            customer_id: Some(customer.id.clone()),
            ..wash_and_fold(20.0)
        };
        let order = service(&db, Arc::new(SandboxGateway)).create(input, &actor).await.unwrap();

        assert_eq!(order.order_number, "KP00001");
        assert_eq!(order.customer_name.as_deref(), Some("Dana Park"));
        assert_eq!(order.customer_phone_key.as_deref(), Some("2125550101"));
        assert_eq!(order.subtotal_cents, 2800);
        assert_eq!(order.discount_cents, 280);
        assert_eq!(order.received_by.as_deref(), Some("Beni"));
    }

    #[tokio::test]
    async fn test_portal_order_priced_from_catalog() {
        let db = memory_db().await;
        let customer = db
            .customers()
            .create(NewCustomer {
                name: "Dana".to_string(),
                phone: "2125550101".to_string(),
                ..NewCustomer::default()
            })
            .await
            .unwrap();
        db.services()
            .upsert(&kleen_core::Service {
                id: 1,
                name: "Wash & Fold".to_string(),
                category: "laundry".to_string(),
                unit_price_cents: 140,
                unit: kleen_core::ServiceUnit::Lb,
                description: None,
                active: true,
                sort_order: 1,
            })
            .await
            .unwrap();

        let request = PortalOrder {
            items: vec![LineItem::new(1, "Wash & Fold", 1, 20.0)],
            ..PortalOrder::default()
        };
        let order = service(&db, Arc::new(SandboxGateway))
            .create_for_customer(&customer, request)
            .await
            .unwrap();

        assert_eq!(order.order_type, OrderType::PickupDelivery);
        assert_eq!(order.items[0].unit_price_cents, 140);
        assert_eq!(order.total_cents, 3049);
        assert_eq!(order.created_by, None);
        assert_eq!(order.created_by_name.as_deref(), Some("Dana"));
    }

    #[tokio::test]
    async fn test_charge_card_approved() {
        let db = memory_db().await;
        let actor = staff_actor(&db, "beni", Role::Staff).await;
        let svc = service(&db, Arc::new(SandboxGateway));
        let order = svc.create(wash_and_fold(20.0), &actor).await.unwrap();

        let paid = svc.charge_card(&order.id, card("4242424242424242")).await.unwrap();
        assert!(paid.is_paid());
        assert_eq!(paid.payment_method, Some(PaymentMethod::Card));
        assert_eq!(paid.card_last_four.as_deref(), Some("4242"));
        assert!(paid.payment_reference.unwrap().starts_with("sbx_"));

        // Already paid.
        let again = svc.charge_card(&order.id, card("4242424242424242")).await.unwrap_err();
        assert_eq!(again.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_concurrent_charges_bill_once() {
        let db = memory_db().await;
        let actor = staff_actor(&db, "beni", Role::Staff).await;
        let gateway = Arc::new(CountingGateway::default());
        let svc = service(&db, gateway.clone());
        let order = svc.create(wash_and_fold(20.0), &actor).await.unwrap();

        let (a, b) = tokio::join!(
            svc.charge_card(&order.id, card("4242424242424242")),
            svc.charge_card(&order.id, card("4242424242424242")),
        );

        assert_eq!(gateway.charges.load(Ordering::SeqCst), 1);
        assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let rejected = a.err().or(b.err()).unwrap();
        assert_eq!(rejected.code, ErrorCode::ValidationError);
        assert_eq!(
            db.orders().get(&order.id).await.unwrap().payment_reference.as_deref(),
            Some("txn_1")
        );
    }

    #[tokio::test]
    async fn test_charge_not_recorded_after_reprice() {
        let db = memory_db().await;
        let actor = staff_actor(&db, "beni", Role::Staff).await;
        let svc = service(&db, Arc::new(SandboxGateway));
        let order = svc.create(wash_and_fold(20.0), &actor).await.unwrap();

        svc.update(
            &order.id,
            OrderUpdate {
                adjustment_cents: Some(500),
                ..OrderUpdate::default()
            },
        )
        .await
        .unwrap();
        let err = db
            .orders()
            .record_card_payment(&order.id, order.total(), "4242".to_string(), "txn_1".to_string())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            kleen_db::DbError::Domain(kleen_core::CoreError::ChargeAmountChanged { .. })
        ));
        assert!(!db.orders().get(&order.id).await.unwrap().is_paid());
    }

    #[tokio::test]
    async fn test_charge_card_declined_changes_nothing() {
        let db = memory_db().await;
        let actor = staff_actor(&db, "beni", Role::Staff).await;
        let svc = service(&db, Arc::new(SandboxGateway));
        let order = svc.create(wash_and_fold(20.0), &actor).await.unwrap();

        let err = svc.charge_card(&order.id, card("4000000000000002")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentDeclined);
        assert_eq!(err.message, "Insufficient funds");

        let stored = db.orders().get(&order.id).await.unwrap();
        assert!(!stored.is_paid());
        assert_eq!(stored.payment_method, None);
        assert_eq!(stored.card_last_four, None);
    }

    #[tokio::test]
    async fn test_charge_card_times_out() {
        let db = memory_db().await;
        let actor = staff_actor(&db, "beni", Role::Staff).await;
        let svc = service(&db, Arc::new(SlowGateway));
        let order = svc.create(wash_and_fold(20.0), &actor).await.unwrap();

        let err = svc.charge_card(&order.id, card("4242424242424242")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Timeout);
        assert!(!db.orders().get(&order.id).await.unwrap().is_paid());
    }

    #[tokio::test]
    async fn test_money_edit_uses_current_tax_rate() {
        let db = memory_db().await;
        let actor = staff_actor(&db, "beni", Role::Staff).await;
        let svc = service(&db, Arc::new(SandboxGateway));
        let order = svc.create(wash_and_fold(20.0), &actor).await.unwrap();

        db.settings().set("tax_rate", "10").await.unwrap();
        let edited = svc
            .update(
                &order.id,
                OrderUpdate {
                    adjustment_cents: Some(200),
                    ..OrderUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(edited.tax_rate, Percent::from_percentage(10.0));
        assert_eq!(edited.tax_cents, 300);
        assert_eq!(edited.total_cents, 3300);
    }
}
