//! Claim history stores

use std::num::NonZeroUsize;

use anyhow::Context;
use async_trait::async_trait;
use lru::LruCache;
use serde_json::{Value, json};
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clients::traits::PersistentStore;
use crate::config::Config;
use crate::error::Result;

/// Stable key for a claim: blake3 of its lowercased, whitespace-collapsed text.
pub fn claim_key(claim: &str) -> String {
    let normalized = claim
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    blake3::hash(normalized.as_bytes()).to_hex().to_string()
}

/// Bounded in-process history
pub struct MemoryStore {
    entries: Mutex<LruCache<String, Value>>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn store(&self, claim: &str, record: &Value) -> Result<bool> {
        self.entries.lock().await.put(claim_key(claim), record.clone());
        Ok(true)
    }

    async fn query(&self, claim: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().await.get(&claim_key(claim)).cloned())
    }
}

fn normalize_ws_url(s: &str) -> String {
    s.strip_prefix("ws://")
        .or_else(|| s.strip_prefix("wss://"))
        .or_else(|| s.strip_prefix("http://"))
        .or_else(|| s.strip_prefix("https://"))
        .unwrap_or(s)
        .to_string()
}

/// History in SurrealDB, one record per claim hash
pub struct SurrealStore {
    db: Surreal<Client>,
    table: String,
}

impl SurrealStore {
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let url = normalize_ws_url(&config.store.database_url);
        let user = &config.runtime.database_user;
        let db = Surreal::new::<Ws>(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to SurrealDB at {}", url))?;

        db.signin(surrealdb::opt::auth::Root {
            username: user.as_str(),
            password: config.runtime.database_pass.as_str(),
        })
        .await
        .with_context(|| format!("Failed to authenticate with SurrealDB as user '{}'", user))?;

        db.use_ns(&config.store.database_ns)
            .await
            .with_context(|| format!("Failed to select namespace '{}'", config.store.database_ns))?;
        db.use_db(&config.store.database_db)
            .await
            .with_context(|| format!("Failed to select database '{}'", config.store.database_db))?;

        info!(
            "Claim history in SurrealDB {}/{} table {}",
            config.store.database_ns, config.store.database_db, config.store.table
        );
        Ok(Self {
            db,
            table: config.store.table.clone(),
        })
    }
}

#[async_trait]
impl PersistentStore for SurrealStore {
    async fn store(&self, claim: &str, record: &Value) -> Result<bool> {
        let content = json!({
            "claim": claim,
            "record": record,
            "stored_at": chrono::Utc::now().to_rfc3339(),
        });
        let mut response = self
            .db
            .query("UPSERT type::thing($tb, $id) CONTENT $content")
            .bind(("tb", self.table.clone()))
            .bind(("id", claim_key(claim)))
            .bind(("content", content))
            .await?;
        let rows: Vec<Value> = response.take(0)?;
        debug!("stored research record for claim ({} rows)", rows.len());
        Ok(!rows.is_empty())
    }

    async fn query(&self, claim: &str) -> Result<Option<Value>> {
        let mut response = self
            .db
            .query("SELECT record FROM type::thing($tb, $id)")
            .bind(("tb", self.table.clone()))
            .bind(("id", claim_key(claim)))
            .await?;
        let rows: Vec<Value> = response.take(0)?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.get("record").cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_key_ignores_case_and_spacing() {
        assert_eq!(claim_key("The  Earth is flat "), claim_key("the earth IS flat"));
        assert_ne!(claim_key("the earth is flat"), claim_key("the earth is round"));
        assert_eq!(claim_key("x").len(), 64);
    }

    #[tokio::test]
    async fn memory_store_round_trips_and_evicts() {
        let store = MemoryStore::new(2);
        assert_eq!(store.query("a").await.unwrap(), None);
        store.store("a", &json!({"n": 1})).await.unwrap();
        store.store("b", &json!({"n": 2})).await.unwrap();
        store.store("c", &json!({"n": 3})).await.unwrap();
        assert_eq!(store.len().await, 2);
        assert_eq!(store.query("a").await.unwrap(), None);
        assert_eq!(store.query("C").await.unwrap(), Some(json!({"n": 3})));
    }

    #[tokio::test]
    async fn later_store_replaces_earlier_record() {
        let store = MemoryStore::new(8);
        store.store("claim", &json!(1)).await.unwrap();
        store.store("claim", &json!(2)).await.unwrap();
        assert_eq!(store.query("claim").await.unwrap(), Some(json!(2)));
    }

    #[test]
    fn ws_scheme_is_stripped() {
        assert_eq!(normalize_ws_url("ws://127.0.0.1:8000"), "127.0.0.1:8000");
        assert_eq!(normalize_ws_url("127.0.0.1:8000"), "127.0.0.1:8000");
    }
}
