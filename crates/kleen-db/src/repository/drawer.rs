//! # Cash Drawer Repository
//!
//! Append-only drawer events and the daily reconciliation view.
//!
//! A second opening (or closing) for the same business date is rejected by
//! the `idx_cash_drawer_daily_count` partial unique index and reported as
//! [`CoreError::DrawerEventExists`].

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::order::OrderRepository;
use kleen_core::drawer::{self, DrawerEntry, DrawerStatus};
use kleen_core::{Actor, CoreError, DrawerEvent};

/// Repository for cash drawer events.
#[derive(Debug, Clone)]
pub struct DrawerRepository {
    pool: SqlitePool,
}

impl DrawerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DrawerRepository { pool }
    }

    /// Records an opening count, closing count or expense for `date`.
    pub async fn record(
        &self,
        entry: &DrawerEntry,
        actor: &Actor,
        date: NaiveDate,
    ) -> DbResult<DrawerEvent> {
        let total = entry.total()?;
        let counts = entry.counts();

        let event = DrawerEvent {
            id: Uuid::new_v4().to_string(),
            kind: entry.kind(),
            business_date: date,
            hundreds: counts.hundreds,
            fifties: counts.fifties,
            twenties: counts.twenties,
            tens: counts.tens,
            fives: counts.fives,
            ones: counts.ones,
            change_cents: counts.change_cents,
            total_cents: total.cents(),
            description: entry.description().map(str::to_string),
            notes: entry.notes().map(str::to_string),
            recorded_by: actor.id.clone(),
            recorded_by_name: actor.name.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO cash_drawer (
                id, kind, business_date,
                hundreds, fifties, twenties, tens, fives, ones, change_cents,
                total_cents, description, notes,
                recorded_by, recorded_by_name, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&event.id)
        .bind(event.kind)
        .bind(event.business_date)
        .bind(event.hundreds)
        .bind(event.fifties)
        .bind(event.twenties)
        .bind(event.tens)
        .bind(event.fives)
        .bind(event.ones)
        .bind(event.change_cents)
        .bind(event.total_cents)
        .bind(&event.description)
        .bind(&event.notes)
        .bind(&event.recorded_by)
        .bind(&event.recorded_by_name)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::Domain(CoreError::DrawerEventExists {
                kind: event.kind,
                date,
            }),
            other => other,
        })?;

        info!(
            kind = %event.kind,
            date = %date,
            total_cents = event.total_cents,
            by = %actor.name,
            "Drawer event recorded"
        );
        Ok(event)
    }

    /// A date's events in recording order.
    pub async fn list_for_date(&self, date: NaiveDate) -> DbResult<Vec<DrawerEvent>> {
        let events = sqlx::query_as::<_, DrawerEvent>(
            "SELECT * FROM cash_drawer WHERE business_date = ?1 ORDER BY created_at, rowid",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    /// Reconciles `date`: opening + paid cash sales − expenses vs closing.
    pub async fn status(&self, date: NaiveDate) -> DbResult<DrawerStatus> {
        let events = self.list_for_date(date).await?;
        let cash_sales = OrderRepository::new(self.pool.clone()).cash_sales(date).await?;
        Ok(drawer::reconcile(date, events, cash_sales))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{memory_db, staff_user};
    use kleen_core::drawer::DenominationCount;
    use kleen_core::lifecycle::open_order;
    use kleen_core::{
        LineItem, NewOrder, OrderOrigin, PaymentMethod, PaymentStatus, Percent, Role,
    };

    fn opening_200() -> DrawerEntry {
        DrawerEntry::Opening {
            counts: DenominationCount {
                hundreds: 1,
                fifties: 1,
                twenties: 2,
                fives: 1,
                ones: 5,
                ..DenominationCount::default()
            },
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_reconciliation_scenario() {
        let db = memory_db().await;
        let admin = staff_user(&db, "admin", Role::Admin).await;
        let date = crate::business_date_today();

        // 145.50 paid in cash
        let order = open_order(
            NewOrder {
                items: vec![LineItem::new(1, "Dry cleaning", 14_550, 1.0)],
                payment_method: Some(PaymentMethod::Cash),
                payment_status: PaymentStatus::Paid,
                ..NewOrder::default()
            },
            &OrderOrigin::Staff(admin.clone()),
            Percent::zero(),
            Percent::zero(),
            date,
            Utc::now(),
        )
        .unwrap();
        db.orders().create(order).await.unwrap();

        db.drawer().record(&opening_200(), &admin, date).await.unwrap();
        db.drawer()
            .record(
                &DrawerEntry::Expense {
                    amount_cents: 2_000,
                    description: "Detergent".to_string(),
                    notes: None,
                },
                &admin,
                date,
            )
            .await
            .unwrap();
        db.drawer()
            .record(
                &DrawerEntry::Closing {
                    counts: DenominationCount {
                        hundreds: 3,
                        twenties: 1,
                        ..DenominationCount::default()
                    },
                    notes: Some("end of day".to_string()),
                },
                &admin,
                date,
            )
            .await
            .unwrap();

        let status = db.drawer().status(date).await.unwrap();
        assert_eq!(status.opening.as_ref().map(|e| e.total_cents), Some(20_000));
        assert_eq!(status.cash_sales_cents, 14_550);
        assert_eq!(status.expense_total_cents, 2_000);
        assert_eq!(status.expected_cash_cents, 32_550);
        assert_eq!(status.actual_cash_cents, Some(32_000));
        assert_eq!(status.mismatch_cents, Some(-550));
        assert!(status.has_mismatch);
    }

    #[tokio::test]
    async fn test_second_opening_rejected() {
        let db = memory_db().await;
        let admin = staff_user(&db, "admin", Role::Admin).await;
        let date = crate::business_date_today();

        db.drawer().record(&opening_200(), &admin, date).await.unwrap();
        let err = db.drawer().record(&opening_200(), &admin, date).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::DrawerEventExists { .. })));

        // Another date is fine, and expenses are unlimited.
        let tomorrow = date.succ_opt().unwrap();
        db.drawer().record(&opening_200(), &admin, tomorrow).await.unwrap();
        for _ in 0..2 {
            db.drawer()
                .record(
                    &DrawerEntry::Expense {
                        amount_cents: 500,
                        description: "Quarters".to_string(),
                        notes: None,
                    },
                    &admin,
                    date,
                )
                .await
                .unwrap();
        }
        assert_eq!(db.drawer().list_for_date(date).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_expense_rejected() {
        let db = memory_db().await;
        let admin = staff_user(&db, "admin", Role::Admin).await;
        let err = db
            .drawer()
            .record(
                &DrawerEntry::Expense {
                    amount_cents: -5,
                    description: "Refund".to_string(),
                    notes: None,
                },
                &admin,
                crate::business_date_today(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }
}
