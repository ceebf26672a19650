//! # Time Entry Repository
//!
//! Clock-in / clock-out with the shift rules enforced by SQLite.
//!
//! ## Atomic Check-Then-Insert
//! ```text
//! INSERT time_entries (user_id, staff_slot = 1 for staff, NULL otherwise)
//!      │
//!      ├── ok ───────────────────────────────► entry
//!      ├── UNIQUE time_entries.user_id ──────► AlreadyClockedIn
//!      └── UNIQUE time_entries.staff_slot ───► AnotherStaffActive(name)
//! ```
//! There is no read between the check and the insert, so two staff members
//! clocking in at the same instant cannot both succeed.

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kleen_core::timeclock::{self, ClockIn, ClockOut};
use kleen_core::{Actor, CoreError, TimeEntry};

/// Repository for staff time entries.
#[derive(Debug, Clone)]
pub struct TimeEntryRepository {
    pool: SqlitePool,
}

impl TimeEntryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TimeEntryRepository { pool }
    }

    /// Opens a shift for `actor`.
    pub async fn clock_in(
        &self,
        actor: &Actor,
        input: &ClockIn,
        date: NaiveDate,
    ) -> DbResult<TimeEntry> {
        input.validate()?;

        let entry = TimeEntry {
            id: Uuid::new_v4().to_string(),
            user_id: actor.id.clone(),
            user_name: actor.name.clone(),
            role: actor.role,
            clock_in: Utc::now(),
            clock_out: None,
            hours_worked: None,
            machine_counter_start: input.machine_counter_start,
            machine_counter_end: None,
            shift_notes: None,
            business_date: date,
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO time_entries (
                id, user_id, user_name, role, clock_in,
                machine_counter_start, staff_slot, business_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(&entry.user_name)
        .bind(entry.role)
        .bind(entry.clock_in)
        .bind(entry.machine_counter_start)
        .bind(timeclock::shift_slot(actor.role))
        .bind(entry.business_date)
        .execute(&self.pool)
        .await;

        if let Err(e) = inserted {
            let err = DbError::from(e);
            return Err(if err.is_unique_violation_on("time_entries.user_id") {
                CoreError::AlreadyClockedIn {
                    user_name: actor.name.clone(),
                }
                .into()
            } else if err.is_unique_violation_on("time_entries.staff_slot") {
                self.shift_conflict(actor).await?
            } else {
                err
            });
        }

        info!(user = %actor.name, role = %actor.role, "Shift opened");
        Ok(entry)
    }

    /// Names whoever holds the staff shift. When that is the caller, they
    /// are simply already clocked in.
    async fn shift_conflict(&self, actor: &Actor) -> DbResult<DbError> {
        let holder: Option<(String, String)> = sqlx::query_as(
            "SELECT user_id, user_name FROM time_entries WHERE staff_slot IS NOT NULL LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let err = match holder {
            Some((user_id, _)) if user_id == actor.id => CoreError::AlreadyClockedIn {
                user_name: actor.name.clone(),
            },
            Some((_, user_name)) => CoreError::AnotherStaffActive {
                blocking_user: user_name,
            },
            None => CoreError::AnotherStaffActive {
                blocking_user: "another staff member".to_string(),
            },
        };
        Ok(err.into())
    }

    /// Closes `user_id`'s open shift and records the hours worked.
    pub async fn clock_out(
        &self,
        user_id: &str,
        user_name: &str,
        input: &ClockOut,
    ) -> DbResult<TimeEntry> {
        input.validate()?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            UPDATE time_entries SET
                clock_out = ?2,
                staff_slot = NULL,
                machine_counter_end = COALESCE(?3, machine_counter_end),
                shift_notes = COALESCE(?4, shift_notes)
            WHERE user_id = ?1 AND clock_out IS NULL
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(now)
        .bind(input.machine_counter_end)
        .bind(&input.shift_notes)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut entry) = entry else {
            return Err(CoreError::NotClockedIn {
                user_name: user_name.to_string(),
            }
            .into());
        };

        timeclock::close_entry(&mut entry, now, input);
        sqlx::query("UPDATE time_entries SET hours_worked = ?2 WHERE id = ?1")
            .bind(&entry.id)
            .bind(entry.hours_worked)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            user = %entry.user_name,
            hours = entry.hours_worked.unwrap_or_default(),
            "Shift closed"
        );
        Ok(entry)
    }

    /// Admin override: closes another user's shift.
    pub async fn force_clock_out(
        &self,
        user_id: &str,
        input: &ClockOut,
        admin: &Actor,
    ) -> DbResult<TimeEntry> {
        let user_name = sqlx::query_scalar::<_, String>("SELECT name FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("User", user_id))?;

        let entry = self.clock_out(user_id, &user_name, input).await?;
        info!(user = %user_name, by = %admin.name, "Shift force-closed");
        Ok(entry)
    }

    /// The user's open entry, if on shift.
    pub async fn current(&self, user_id: &str) -> DbResult<Option<TimeEntry>> {
        debug!(user_id = %user_id, "Fetching open time entry");
        let entry = sqlx::query_as::<_, TimeEntry>(
            "SELECT * FROM time_entries WHERE user_id = ?1 AND clock_out IS NULL",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    /// Entries for a business date, earliest first.
    pub async fn list_for_date(&self, date: NaiveDate) -> DbResult<Vec<TimeEntry>> {
        let entries = sqlx::query_as::<_, TimeEntry>(
            "SELECT * FROM time_entries WHERE business_date = ?1 ORDER BY clock_in",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{memory_db, staff_user};
    use kleen_core::Role;

    fn today() -> NaiveDate {
        crate::business_date_today()
    }

    #[tokio::test]
    async fn test_single_staff_shift() {
        let db = memory_db().await;
        let beni = staff_user(&db, "beni", Role::Staff).await;
        let erika = staff_user(&db, "erika", Role::Staff).await;
        let admin = staff_user(&db, "admin", Role::Admin).await;
        let driver = staff_user(&db, "driver", Role::Driver).await;

        db.time_entries()
            .clock_in(&beni, &ClockIn::default(), today())
            .await
            .unwrap();

        let err = db
            .time_entries()
            .clock_in(&erika, &ClockIn::default(), today())
            .await
            .unwrap_err();
        match err {
            DbError::Domain(CoreError::AnotherStaffActive { blocking_user }) => {
                assert_eq!(blocking_user, "Beni")
            }
            other => panic!("expected AnotherStaffActive, got {other:?}"),
        }

        // Admin and driver are exempt.
        db.time_entries()
            .clock_in(&admin, &ClockIn::default(), today())
            .await
            .unwrap();
        db.time_entries()
            .clock_in(&driver, &ClockIn::default(), today())
            .await
            .unwrap();

        // Once Beni leaves, Erika may start.
        db.time_entries()
            .clock_out(&beni.id, &beni.name, &ClockOut::default())
            .await
            .unwrap();
        db.time_entries()
            .clock_in(&erika, &ClockIn::default(), today())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_already_clocked_in() {
        let db = memory_db().await;
        let beni = staff_user(&db, "beni", Role::Staff).await;
        let admin = staff_user(&db, "admin", Role::Admin).await;

        for actor in [&beni, &admin] {
            db.time_entries()
                .clock_in(actor, &ClockIn::default(), today())
                .await
                .unwrap();
            let err = db
                .time_entries()
                .clock_in(actor, &ClockIn::default(), today())
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                DbError::Domain(CoreError::AlreadyClockedIn { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_clock_out_records_counters() {
        let db = memory_db().await;
        let beni = staff_user(&db, "beni", Role::Staff).await;

        let err = db
            .time_entries()
            .clock_out(&beni.id, &beni.name, &ClockOut::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NotClockedIn { .. })));

        db.time_entries()
            .clock_in(
                &beni,
                &ClockIn {
                    machine_counter_start: Some(1200),
                },
                today(),
            )
            .await
            .unwrap();
        assert!(db.time_entries().current(&beni.id).await.unwrap().is_some());

        let closed = db
            .time_entries()
            .clock_out(
                &beni.id,
                &beni.name,
                &ClockOut {
                    machine_counter_end: Some(1264),
                    shift_notes: Some("Dryer 3 squeaks".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(!closed.is_open());
        assert_eq!(closed.machine_counter_start, Some(1200));
        assert_eq!(closed.machine_counter_end, Some(1264));
        assert!(closed.hours_worked.is_some());
        assert!(db.time_entries().current(&beni.id).await.unwrap().is_none());

        let stored = db.time_entries().list_for_date(today()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].hours_worked, closed.hours_worked);
        assert_eq!(stored[0].shift_notes.as_deref(), Some("Dryer 3 squeaks"));
    }

    #[tokio::test]
    async fn test_force_clock_out() {
        let db = memory_db().await;
        let beni = staff_user(&db, "beni", Role::Staff).await;
        let admin = staff_user(&db, "admin", Role::Admin).await;

        db.time_entries()
            .clock_in(&beni, &ClockIn::default(), today())
            .await
            .unwrap();
        let closed = db
            .time_entries()
            .force_clock_out(&beni.id, &ClockOut::default(), &admin)
            .await
            .unwrap();
        assert_eq!(closed.user_name, "Beni");

        let err = db
            .time_entries()
            .force_clock_out("missing", &ClockOut::default(), &admin)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
