use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::AggregatorError;
use crate::registry::Category;

/// Source of the current time for cache expiry and date fallbacks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Deterministic key for a cached result set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn news(
        sport: &str,
        category: Option<Category>,
        limit: usize,
    ) -> Result<Self, AggregatorError> {
        let sport = Self::segment(sport)?;
        let category = category.map(|c| c.as_str()).unwrap_or("all");
        Self::with_limit(format!("news:{}:{}", sport, category), limit)
    }

    pub fn trending(sport: &str, limit: usize) -> Result<Self, AggregatorError> {
        let sport = Self::segment(sport)?;
        Self::with_limit(format!("trending:{}", sport), limit)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segment(value: &str) -> Result<String, AggregatorError> {
        let value = value.trim().to_lowercase();
        if value.is_empty() || value.contains(':') {
            return Err(AggregatorError::Internal(format!(
                "cannot build cache key from segment '{}'",
                value
            )));
        }
        Ok(value)
    }

    fn with_limit(prefix: String, limit: usize) -> Result<Self, AggregatorError> {
        if limit == 0 {
            return Err(AggregatorError::Internal(format!(
                "cannot build cache key '{}' with zero limit",
                prefix
            )));
        }
        Ok(Self(format!("{}:{}", prefix, limit)))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
pub struct CacheEntry<V> {
    pub key: CacheKey,
    pub value: V,
    pub stored_at: DateTime<Utc>,
    generation: u64,
}

/// Result of a cache-backed lookup.
#[derive(Debug, Clone)]
pub struct Cached<V> {
    pub value: V,
    pub stored_at: DateTime<Utc>,
    /// True when the value was not computed by this call
    pub cached: bool,
}

impl<V: Clone> Cached<V> {
    fn from_entry(entry: &CacheEntry<V>, cached: bool) -> Self {
        Self {
            value: entry.value.clone(),
            stored_at: entry.stored_at,
            cached,
        }
    }
}

/// Time-to-live cache with at most one in-flight computation per key.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<CacheKey, Arc<CacheEntry<V>>>>,
    gates: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
    generation: AtomicU64,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            ttl,
            clock,
        }
    }

    /// Returns the entry for `key` unless it is missing or expired.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry<V>>> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if self.is_expired(entry) {
            return None;
        }
        Some(entry.clone())
    }

    pub async fn put(&self, key: CacheKey, value: V) -> Arc<CacheEntry<V>> {
        let entry = Arc::new(CacheEntry {
            key: key.clone(),
            value,
            stored_at: self.clock.now(),
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
        });
        self.entries.write().await.insert(key, entry.clone());
        entry
    }

    /// Drops every entry, returning how many were held.
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        count
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Serves `key` from the cache or runs `compute` and stores its output.
    ///
    /// Concurrent callers missing on the same key queue behind a per-key gate;
    /// only the first runs `compute`, the rest receive the value it stored.
    /// With `fresh` set the initial read is skipped, but a value stored by
    /// another caller after this call started is still reused.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &CacheKey,
        fresh: bool,
        compute: F,
    ) -> Result<Cached<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let seen = self.generation.load(Ordering::SeqCst);
        if !fresh {
            if let Some(entry) = self.get(key).await {
                debug!("Cache hit for {}", key);
                return Ok(Cached::from_entry(&entry, true));
            }
        }

        // Released on drop so a cancelled caller does not strand its gate
        let gate = GateGuard {
            cache: self,
            key,
            gate: self.gate(key),
        };
        let _permit = gate.gate.lock().await;
        match self.get(key).await {
            Some(entry) if !fresh || entry.generation > seen => {
                debug!("Reusing value computed concurrently for {}", key);
                Ok(Cached::from_entry(&entry, true))
            }
            _ => {
                debug!("Cache miss for {}, recomputing", key);
                let value = compute().await?;
                let entry = self.put(key.clone(), value).await;
                Ok(Cached::from_entry(&entry, false))
            }
        }
    }

    fn is_expired(&self, entry: &CacheEntry<V>) -> bool {
        let age = (self.clock.now() - entry.stored_at)
            .to_std()
            .unwrap_or_default();
        age >= self.ttl
    }
}

impl<V> TtlCache<V> {
    fn gate(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        gates.entry(key.clone()).or_default().clone()
    }

    fn release_gate(&self, key: &CacheKey, gate: &Arc<tokio::sync::Mutex<()>>) {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one held by this caller
        if Arc::strong_count(gate) <= 2 {
            gates.remove(key);
        }
    }
}

struct GateGuard<'a, V> {
    cache: &'a TtlCache<V>,
    key: &'a CacheKey,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl<V> Drop for GateGuard<'_, V> {
    fn drop(&mut self) {
        self.cache.release_gate(self.key, &self.gate);
    }
}
