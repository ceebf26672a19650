//! # Feedback Repository
//!
//! Ratings and messages customers leave from the portal.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::order::OrderRepository;
use kleen_core::validation;
use kleen_core::{CoreError, Customer, Feedback, NewFeedback};

/// Most recent entries returned by [`FeedbackRepository::list`].
const LIST_LIMIT: i64 = 200;

#[derive(Debug, Clone)]
pub struct FeedbackRepository {
    pool: SqlitePool,
}

impl FeedbackRepository {
    pub fn new(pool: SqlitePool) -> Self {
        FeedbackRepository { pool }
    }

    /// Stores feedback from `customer`. A referenced order must be theirs.
    pub async fn create(&self, customer: &Customer, input: NewFeedback) -> DbResult<Feedback> {
        validation::validate_feedback(&input)?;

        if let Some(order_id) = input.order_id.as_deref() {
            let order = OrderRepository::new(self.pool.clone()).get(order_id).await?;
            if !order.belongs_to(&customer.id, &customer.phone_key) {
                return Err(CoreError::forbidden("order belongs to another customer").into());
            }
        }

        let feedback = Feedback {
            id: Uuid::new_v4().to_string(),
            customer_id: customer.id.clone(),
            order_id: input.order_id,
            rating: input.rating,
            message: input.message.trim().to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO feedback (id, customer_id, order_id, rating, message, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&feedback.id)
        .bind(&feedback.customer_id)
        .bind(&feedback.order_id)
        .bind(feedback.rating)
        .bind(&feedback.message)
        .bind(feedback.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => DbError::not_found("Customer", &customer.id),
            other => other,
        })?;

        info!(id = %feedback.id, rating = ?feedback.rating, "Feedback received");
        Ok(feedback)
    }

    /// Newest first.
    pub async fn list(&self) -> DbResult<Vec<Feedback>> {
        let feedback = sqlx::query_as::<_, Feedback>(
            "SELECT * FROM feedback ORDER BY created_at DESC LIMIT ?1",
        )
        .bind(LIST_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(feedback)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{memory_db, staff_user};
    use kleen_core::lifecycle::open_order;
    use kleen_core::{LineItem, NewCustomer, NewOrder, OrderOrigin, Percent, Role};

    async fn customer(db: &crate::Database, name: &str, phone: &str) -> Customer {
        db.customers()
            .create(NewCustomer {
                name: name.to_string(),
                phone: phone.to_string(),
                ..NewCustomer::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_feedback_on_own_order() {
        let db = memory_db().await;
        let beni = staff_user(&db, "beni", Role::Staff).await;
        let dana = customer(&db, "Dana", "2125550101").await;
        let lee = customer(&db, "Lee", "2125550202").await;

        let order = open_order(
            NewOrder {
                customer_id: Some(dana.id.clone()),
                customer_name: Some(dana.name.clone()),
                customer_phone: Some(dana.phone.clone()),
                items: vec![LineItem::new(2, "Dry cleaning", 1_200, 1.0)],
                ..NewOrder::default()
            },
            &OrderOrigin::Staff(beni),
            Percent::zero(),
            Percent::zero(),
            crate::business_date_today(),
            Utc::now(),
        )
        .unwrap();
        let order = db.orders().create(order).await.unwrap();

        let stored = db
            .feedback()
            .create(
                &dana,
                NewFeedback {
                    order_id: Some(order.id.clone()),
                    rating: Some(5),
                    message: "  Crisp shirts ".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(stored.message, "Crisp shirts");

        let err = db
            .feedback()
            .create(
                &lee,
                NewFeedback {
                    order_id: Some(order.id.clone()),
                    rating: Some(1),
                    message: "Not mine".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Forbidden(_))));

        assert_eq!(db.feedback().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_rating_rejected() {
        let db = memory_db().await;
        let dana = customer(&db, "Dana", "2125550101").await;
        let err = db
            .feedback()
            .create(
                &dana,
                NewFeedback {
                    order_id: None,
                    rating: Some(6),
                    message: "Great".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }
}
