//! # Service Repository
//!
//! The service catalog (wash & fold, dry cleaning, pressing, alterations).
//! Staff may change a price or toggle availability; the catalog itself is
//! seeded.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};
use kleen_core::{LineItem, Service, ServiceUpdate, ValidationError};

/// Repository for the service catalog.
#[derive(Debug, Clone)]
pub struct ServiceRepository {
    pool: SqlitePool,
}

impl ServiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ServiceRepository { pool }
    }

    /// Lists services in display order.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<Service>> {
        let services = sqlx::query_as::<_, Service>(
            r#"
            SELECT * FROM services
            WHERE active = 1 OR ?1
            ORDER BY sort_order, id
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(services)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Service>> {
        let service = sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(service)
    }

    /// Inserts or replaces a catalog entry (seeding).
    pub async fn upsert(&self, service: &Service) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO services (id, name, category, unit_price_cents, unit, description, active, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                unit_price_cents = excluded.unit_price_cents,
                unit = excluded.unit,
                description = excluded.description,
                active = excluded.active,
                sort_order = excluded.sort_order
            "#,
        )
        .bind(service.id)
        .bind(&service.name)
        .bind(&service.category)
        .bind(service.unit_price_cents)
        .bind(service.unit)
        .bind(&service.description)
        .bind(service.active)
        .bind(service.sort_order)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Changes price and/or availability.
    pub async fn update(&self, id: i64, update: ServiceUpdate) -> DbResult<Service> {
        if matches!(update.unit_price_cents, Some(price) if price < 0) {
            return Err(ValidationError::MustNotBeNegative {
                field: "unit_price_cents".to_string(),
            }
            .into());
        }

        let result = sqlx::query(
            r#"
            UPDATE services SET
                unit_price_cents = COALESCE(?2, unit_price_cents),
                active = COALESCE(?3, active)
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(update.unit_price_cents)
        .bind(update.active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service", id.to_string()));
        }

        let service = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Service", id.to_string()))?;
        info!(
            id = service.id,
            price_cents = service.unit_price_cents,
            active = service.active,
            "Service updated"
        );
        Ok(service)
    }

    /// Re-prices line items from the active catalog.
    ///
    /// Every item must reference an active service; the client's description
    /// and price are replaced with the catalog's.
    pub async fn price_items(&self, items: Vec<LineItem>) -> DbResult<Vec<LineItem>> {
        let catalog = self.list(false).await?;
        items
            .into_iter()
            .map(|item| -> DbResult<LineItem> {
                let service = item
                    .service_id
                    .and_then(|id| catalog.iter().find(|s| s.id == id))
                    .ok_or_else(|| {
                        ValidationError::invalid_format("items.service_id", "unknown or inactive service")
                    })?;
                Ok(LineItem {
                    service_id: Some(service.id),
                    description: service.name.clone(),
                    unit_price_cents: service.unit_price_cents,
                    quantity: item.quantity,
                })
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_db;
    use kleen_core::{CoreError, ServiceUnit};

    fn wash_and_fold() -> Service {
        Service {
            id: 1,
            name: "Wash & Fold".to_string(),
            category: "Laundry".to_string(),
            unit_price_cents: 140,
            unit: ServiceUnit::Lb,
            description: None,
            active: true,
            sort_order: 1,
        }
    }

    #[tokio::test]
    async fn test_update_price_and_toggle() {
        let db = memory_db().await;
        db.services().upsert(&wash_and_fold()).await.unwrap();

        let updated = db
            .services()
            .update(
                1,
                ServiceUpdate {
                    unit_price_cents: Some(150),
                    active: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.unit_price_cents, 150);
        assert!(updated.active);

        db.services()
            .update(
                1,
                ServiceUpdate {
                    unit_price_cents: None,
                    active: Some(false),
                },
            )
            .await
            .unwrap();
        assert!(db.services().list(false).await.unwrap().is_empty());
        assert_eq!(db.services().list(true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_negative_price_rejected() {
        let db = memory_db().await;
        db.services().upsert(&wash_and_fold()).await.unwrap();
        let err = db
            .services()
            .update(
                1,
                ServiceUpdate {
                    unit_price_cents: Some(-1),
                    active: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_price_items_ignores_client_prices() {
        let db = memory_db().await;
        db.services().upsert(&wash_and_fold()).await.unwrap();

        let priced = db
            .services()
            .price_items(vec![LineItem::new(1, "cheap wash", 1, 12.0)])
            .await
            .unwrap();
        assert_eq!(priced[0].unit_price_cents, 140);
        assert_eq!(priced[0].description, "Wash & Fold");

        assert!(db
            .services()
            .price_items(vec![LineItem::new(99, "mystery", 1, 1.0)])
            .await
            .is_err());
    }
}
