//! Per-company policy cache.
//!
//! Policy definitions change rarely but are read on every evaluation.
//! The cache holds each company's active policies for a TTL; stale reads
//! within the TTL are acceptable, but policy mutations must call
//! [`PolicyCache::invalidate`] synchronously with the write.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::EngineResult;
use crate::models::Policy;
use crate::store::PolicyStore;

struct CacheEntry {
    loaded_at: Instant,
    policies: Vec<Policy>,
}

/// A TTL cache of active policies keyed by company.
pub struct PolicyCache {
    store: Arc<dyn PolicyStore>,
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl PolicyCache {
    /// Creates a cache over the given store.
    pub fn new(store: Arc<dyn PolicyStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The company's active policies, ordered for execution. Served from
    /// cache within the TTL, otherwise reloaded.
    pub async fn active_policies(&self, company_id: &str) -> EngineResult<Vec<Policy>> {
        {
            let entries = self.entries.read().expect("policy cache lock poisoned");
            if let Some(entry) = entries.get(company_id) {
                if entry.loaded_at.elapsed() < self.ttl {
                    return Ok(entry.policies.clone());
                }
            }
        }

        let policies = self.store.active_policies(company_id).await?;
        debug!(company_id, count = policies.len(), "policy cache refreshed");
        let mut entries = self.entries.write().expect("policy cache lock poisoned");
        entries.insert(
            company_id.to_string(),
            CacheEntry {
                loaded_at: Instant::now(),
                policies: policies.clone(),
            },
        );
        Ok(policies)
    }

    /// Drops the company's cached entry. Synchronous, so policy
    /// mutations can call it in the same control flow as the write.
    pub fn invalidate(&self, company_id: &str) {
        let mut entries = self.entries.write().expect("policy cache lock poisoned");
        entries.remove(company_id);
        debug!(company_id, "policy cache invalidated");
    }
}
