//! # Customer Repository
//!
//! Customer CRUD for staff and portal accounts for customers.
//!
//! ## Phone Matching
//! Customers are found by `phone_key` (trailing ten digits), which is unique.
//! Email is a secondary lookup key, matched case-insensitively; it is not
//! unique, so an address shared by several customers finds nobody.
//! The portal logs in with phone (or email) + password; a customer created
//! at the counter has no password until the first portal login sets one.
//!
//! ## Deletion
//! Deleting a customer detaches their orders (`customer_id = NULL`); the
//! order snapshot keeps the name and phone, so the history survives.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kleen_core::validation::{self, phone_key};
use kleen_core::{Customer, CustomerUpdate, NewCustomer, Percent};

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    pub async fn get(&self, id: &str) -> DbResult<Customer> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Finds a customer by any spelling of their phone number.
    pub async fn find_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let Some(key) = phone_key(phone) else {
            return Ok(None);
        };
        let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE phone_key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    /// Finds the one customer with this email, ignoring case.
    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<Customer>> {
        let email = email.trim();
        if email.is_empty() {
            return Ok(None);
        }
        let mut matches = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE email = ?1 COLLATE NOCASE LIMIT 2",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        if matches.len() > 1 {
            debug!(email = %email, "Email shared by several customers, not matched");
            return Ok(None);
        }
        Ok(matches.pop())
    }

    /// Lists customers by name; `search` matches name, phone or email.
    pub async fn list(&self, search: Option<&str>) -> DbResult<Vec<Customer>> {
        let customers = match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(search) => {
                let pattern = format!("%{}%", search);
                let digits = validation::canonical_phone(search);
                let phone_pattern = if digits.is_empty() {
                    pattern.clone()
                } else {
                    format!("%{}%", digits)
                };
                sqlx::query_as::<_, Customer>(
                    r#"
                    SELECT * FROM customers
                    WHERE name LIKE ?1 OR email LIKE ?1 OR phone LIKE ?2
                    ORDER BY name
                    "#,
                )
                .bind(pattern)
                .bind(phone_pattern)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY name")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(customers)
    }

    /// Creates a customer at the counter.
    pub async fn create(&self, input: NewCustomer) -> DbResult<Customer> {
        let phone = validation::validate_new_customer(&input)?;
        self.insert(input, phone, None).await
    }

    /// Creates a portal account on first login.
    pub async fn create_with_password(
        &self,
        name: &str,
        phone: &str,
        password_hash: String,
    ) -> DbResult<Customer> {
        let input = NewCustomer {
            name: name.trim().to_string(),
            phone: phone.to_string(),
            ..NewCustomer::default()
        };
        let phone = validation::validate_new_customer(&input)?;
        self.insert(input, phone, Some(password_hash)).await
    }

    async fn insert(
        &self,
        input: NewCustomer,
        phone: String,
        password_hash: Option<String>,
    ) -> DbResult<Customer> {
        let now = Utc::now();
        let key = phone_key(&phone).unwrap_or_else(|| phone.clone());
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            phone,
            phone_key: key,
            email: input.email.filter(|e| !e.trim().is_empty()),
            address: input.address,
            password_hash,
            discount_percent: input.discount_percent.unwrap_or(Percent::zero()),
            subscription_plan: input.subscription_plan,
            notification_preference: input.notification_preference.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %customer.id, "Creating customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, phone, phone_key, email, address, password_hash,
                discount_percent, subscription_plan, notification_preference,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.phone_key)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(&customer.password_hash)
        .bind(customer.discount_percent)
        .bind(&customer.subscription_plan)
        .bind(customer.notification_preference)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("phone", &customer.phone),
            other => other,
        })?;

        info!(id = %customer.id, "Customer created");
        Ok(customer)
    }

    /// Partial update: `Some` replaces, `None` keeps.
    pub async fn update(&self, id: &str, update: CustomerUpdate) -> DbResult<Customer> {
        validation::validate_customer_update(&update)?;

        let phone = update.phone.as_deref().map(validation::canonical_phone);
        let key = phone.as_deref().and_then(phone_key);

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = COALESCE(?2, name),
                phone = COALESCE(?3, phone),
                phone_key = COALESCE(?4, phone_key),
                email = COALESCE(?5, email),
                address = COALESCE(?6, address),
                discount_percent = COALESCE(?7, discount_percent),
                subscription_plan = COALESCE(?8, subscription_plan),
                notification_preference = COALESCE(?9, notification_preference),
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(&phone)
        .bind(&key)
        .bind(&update.email)
        .bind(&update.address)
        .bind(update.discount_percent)
        .bind(&update.subscription_plan)
        .bind(update.notification_preference)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("phone", phone.clone().unwrap_or_default())
            }
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }
        self.get(id).await
    }

    pub async fn set_password(&self, id: &str, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE customers SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(password_hash)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }
        debug!(id = %id, "Customer password set");
        Ok(())
    }

    /// Hard delete. Orders are detached, never deleted.
    pub async fn delete(&self, id: &str) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        let detached = sqlx::query("UPDATE orders SET customer_id = NULL WHERE customer_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        tx.commit().await?;
        info!(id = %id, detached_orders = detached, "Customer deleted");
        Ok(detached)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
