//! # Settings Repository
//!
//! Key/value business settings (`tax_rate`, business profile keys).

use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::DbResult;
use kleen_core::{Percent, ValidationError, DEFAULT_TAX_RATE};

/// Settings key holding the sales tax rate in percent (`"8.875"`).
pub const TAX_RATE_KEY: &str = "tax_rate";

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        if key.trim().is_empty() {
            return Err(ValidationError::required("key").into());
        }
        if key == TAX_RATE_KEY {
            parse_tax_rate(value)?;
        }

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        info!(key = %key, "Setting updated");
        Ok(())
    }

    pub async fn all(&self) -> DbResult<BTreeMap<String, String>> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }

    /// The configured sales tax rate, or 8.875% when unset or unreadable.
    pub async fn tax_rate(&self) -> DbResult<Percent> {
        let Some(raw) = self.get(TAX_RATE_KEY).await? else {
            return Ok(DEFAULT_TAX_RATE);
        };
        match parse_tax_rate(&raw) {
            Ok(rate) => Ok(rate),
            Err(err) => {
                warn!(value = %raw, error = %err, "Invalid tax_rate setting, using default");
                Ok(DEFAULT_TAX_RATE)
            }
        }
    }
}

fn parse_tax_rate(raw: &str) -> Result<Percent, ValidationError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::invalid_format(TAX_RATE_KEY, "must be a number"))?;
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: TAX_RATE_KEY.to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(Percent::from_percentage(value))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_db;

    #[tokio::test]
    async fn test_tax_rate_defaults_to_seeded_value() {
        let db = memory_db().await;
        assert_eq!(db.settings().tax_rate().await.unwrap(), DEFAULT_TAX_RATE);

        db.settings().set(TAX_RATE_KEY, "7.25").await.unwrap();
        assert_eq!(
            db.settings().tax_rate().await.unwrap(),
            Percent::from_milli(7_250)
        );
    }

    #[tokio::test]
    async fn test_unreadable_tax_rate_falls_back() {
        let db = memory_db().await;
        assert!(db.settings().set(TAX_RATE_KEY, "lots").await.is_err());

        sqlx::query("UPDATE settings SET value = 'lots' WHERE key = ?1")
            .bind(TAX_RATE_KEY)
            .execute(db.pool())
            .await
            .unwrap();
        assert_eq!(db.settings().tax_rate().await.unwrap(), DEFAULT_TAX_RATE);
    }

    #[tokio::test]
    async fn test_business_profile_keys() {
        let db = memory_db().await;
        db.settings().set("business_name", "Kleen Panda").await.unwrap();
        db.settings().set("business_name", "Kleen Panda Laundromat").await.unwrap();

        let all = db.settings().all().await.unwrap();
        assert_eq!(all.get("business_name").map(String::as_str), Some("Kleen Panda Laundromat"));
        assert!(all.contains_key(TAX_RATE_KEY));
        assert_eq!(db.settings().get("missing").await.unwrap(), None);
    }
}
