//! Password-reset codes.
//!
//! Codes are six random digits kept in an external TTL store so the server
//! itself stays stateless. The store owns expiry: a code that has aged out is
//! simply gone.
//!
//! ```text
//! request ──► issue(customer_id) ──► SET kleen:reset:{id} 123456 EX 900
//! confirm ──► consume(customer_id, "123456")
//!                 ├── key missing ─────► Expired
//!                 ├── value differs ───► Mismatch
//!                 └── value matches ───► DEL, Ok
//! ```

use argon2::password_hash::rand_core::{OsRng, RngCore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

const KEY_PREFIX: &str = "kleen:reset:";

/// Outcome of checking a submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetCheck {
    Ok,
    /// No live code for this identity (never issued, used, or aged out).
    Expired,
    Mismatch,
}

#[derive(Debug, thiserror::Error)]
pub enum ResetStoreError {
    #[error("Reset code store error: {0}")]
    Store(#[from] redis::RedisError),
}

#[async_trait]
pub trait ResetCodeStore: Send + Sync {
    /// Issues a fresh code for `identity`, replacing any earlier one.
    async fn issue(&self, identity: &str) -> Result<String, ResetStoreError>;

    /// Checks `code`; a matching code is consumed.
    async fn consume(&self, identity: &str, code: &str) -> Result<ResetCheck, ResetStoreError>;

    /// Whether the backing store answers.
    async fn ping(&self) -> bool;
}

/// Six zero-padded random digits.
pub fn generate_code() -> String {
    format!("{:06}", OsRng.next_u32() % 1_000_000)
}

fn key(identity: &str) -> String {
    format!("{}{}", KEY_PREFIX, identity)
}

/// Redis-backed store using `SET ... EX`.
#[derive(Clone)]
pub struct RedisResetCodeStore {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl RedisResetCodeStore {
    pub async fn connect(client: redis::Client, ttl_secs: u64) -> Result<Self, ResetStoreError> {
        let conn = ConnectionManager::new(client).await?;
        Ok(RedisResetCodeStore { conn, ttl_secs })
    }
}

#[async_trait]
impl ResetCodeStore for RedisResetCodeStore {
    async fn issue(&self, identity: &str) -> Result<String, ResetStoreError> {
        let code = generate_code();
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key(identity), &code, self.ttl_secs)
            .await?;
        debug!(ttl_secs = self.ttl_secs, "Reset code issued");
        Ok(code)
    }

    async fn consume(&self, identity: &str, code: &str) -> Result<ResetCheck, ResetStoreError> {
        let mut conn = self.conn.clone();
        let stored: Option<String> = conn.get(key(identity)).await?;

        let check = match stored {
            None => ResetCheck::Expired,
            Some(stored) if stored == code.trim() => {
                conn.del::<_, ()>(key(identity)).await?;
                ResetCheck::Ok
            }
            Some(_) => ResetCheck::Mismatch,
        };
        debug!(?check, "Reset code checked");
        Ok(check)
    }

    async fn ping(&self) -> bool {
        let mut conn = self.conn.clone();
        let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }
}

// =============================================================================
// In-memory store for tests
// =============================================================================

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Keeps codes in a map; `expire` simulates the TTL running out.
    #[derive(Default)]
    pub struct MemoryResetCodeStore {
        codes: Mutex<HashMap<String, String>>,
    }

    impl MemoryResetCodeStore {
        pub fn expire(&self, identity: &str) {
            self.codes.lock().unwrap().remove(identity);
        }

        pub fn peek(&self, identity: &str) -> Option<String> {
            self.codes.lock().unwrap().get(identity).cloned()
        }
    }

    #[async_trait]
    impl ResetCodeStore for MemoryResetCodeStore {
        async fn issue(&self, identity: &str) -> Result<String, ResetStoreError> {
            let code = generate_code();
            self.codes
                .lock()
                .unwrap()
                .insert(identity.to_string(), code.clone());
            Ok(code)
        }

        async fn consume(&self, identity: &str, code: &str) -> Result<ResetCheck, ResetStoreError> {
            let mut codes = self.codes.lock().unwrap();
            Ok(match codes.get(identity) {
                None => ResetCheck::Expired,
                Some(stored) if stored == code.trim() => {
                    codes.remove(identity);
                    ResetCheck::Ok
                }
                Some(_) => ResetCheck::Mismatch,
            })
        }

        async fn ping(&self) -> bool {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryResetCodeStore;
    use super::*;

    #[test]
    fn test_generate_code_shape() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_key_prefix() {
        assert_eq!(key("c-1"), "kleen:reset:c-1");
    }

    #[tokio::test]
    async fn test_code_is_single_use() {
        let store = MemoryResetCodeStore::default();
        let code = store.issue("c-1").await.unwrap();

        let wrong = if code == "000000" { "111111" } else { "000000" };
        assert_eq!(store.consume("c-1", wrong).await.unwrap(), ResetCheck::Mismatch);
        assert_eq!(store.consume("c-1", &code).await.unwrap(), ResetCheck::Ok);
        assert_eq!(store.consume("c-1", &code).await.unwrap(), ResetCheck::Expired);
    }
}
