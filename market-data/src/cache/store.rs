//! Range-aware result cache

use crate::config::CacheConfig;
use crate::data::{BarSet, DateRange};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// One finished fetch
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub records: BarSet,
    /// Explicit request range, or first..last record for unbounded fetches
    pub covered: DateRange,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Returns `None` for an empty record set, which is never cached
    fn new(records: BarSet, requested: Option<DateRange>, now: DateTime<Utc>) -> Option<Self> {
        let first = records.first()?.timestamp;
        let last = records.last()?.timestamp;
        let covered = requested.unwrap_or_else(|| DateRange::new(first, last));
        Some(Self {
            records,
            covered,
            created_at: now,
        })
    }

    fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.created_at > ttl
    }
}

/// Summary of one entry for the operational stats view
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub key: String,
    pub records: usize,
    pub covered_start: DateTime<Utc>,
    pub covered_end: DateTime<Utc>,
    pub age_secs: i64,
}

/// Point-in-time view of the cache
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub ttl_secs: u64,
    pub entries: Vec<EntrySummary>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order, oldest first
    order: VecDeque<String>,
}

/// Keyed store of fetched bar sets with TTL and FIFO capacity eviction.
///
/// Locks are synchronous and never held across an await point.
#[derive(Debug)]
pub struct BarCache {
    inner: RwLock<Inner>,
    ttl: chrono::Duration,
    ttl_secs: u64,
    max_entries: usize,
    trim_to_request: bool,
}

impl BarCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            ttl: chrono::Duration::seconds(config.ttl_secs as i64),
            ttl_secs: config.ttl_secs,
            max_entries: config.max_entries.max(1),
            trim_to_request: config.trim_to_request,
        }
    }

    /// Look up `key`.
    ///
    /// A hit requires a live entry and, when `requested` is given, a covered
    /// range containing it. The entry's full record set is returned unless
    /// `trim_to_request` is set, in which case records from a wider covered
    /// range are clipped to `requested`.
    pub fn get(
        &self,
        key: &str,
        requested: Option<&DateRange>,
        now: DateTime<Utc>,
    ) -> Option<(BarSet, DateRange)> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let entry = inner.entries.get(key)?;

        if entry.is_expired(now, self.ttl) {
            debug!("Cache entry {} expired", key);
            return None;
        }
        let Some(range) = requested else {
            return Some((entry.records.clone(), entry.covered));
        };
        if !entry.covered.covers(range) {
            debug!("Cache entry {} does not cover the requested range", key);
            return None;
        }
        if self.trim_to_request && entry.covered != *range {
            let clipped = entry
                .records
                .iter()
                .filter(|r| range.contains(r.timestamp))
                .cloned()
                .collect();
            return Some((Arc::new(clipped), entry.covered));
        }
        Some((entry.records.clone(), entry.covered))
    }

    /// Store a fetch result. Empty sets are ignored; returns whether anything was stored.
    ///
    /// When full, the oldest inserted entry is evicted first. Re-storing an
    /// existing key replaces it and makes it the newest.
    pub fn put(
        &self,
        key: &str,
        records: BarSet,
        requested: Option<DateRange>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(entry) = CacheEntry::new(records, requested, now) else {
            return false;
        };

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if inner.entries.remove(key).is_some() {
            inner.order.retain(|k| k != key);
        } else if inner.entries.len() >= self.max_entries {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
                info!("Cache full ({} entries), evicted {}", self.max_entries, oldest);
            }
        }

        inner.entries.insert(key.to_string(), entry);
        inner.order.push_back(key.to_string());
        true
    }

    /// Drop every expired entry, returning how many were removed
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = inner.entries.len();
        let ttl = self.ttl;
        inner.entries.retain(|_, entry| !entry.is_expired(now, ttl));

        let Inner { entries, order } = &mut *inner;
        order.retain(|k| entries.contains_key(k));

        before - entries.len()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.entries.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .contains_key(key)
    }

    /// Entries are listed oldest first
    pub fn stats(&self, now: DateTime<Utc>) -> CacheStats {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let entries = inner
            .order
            .iter()
            .filter_map(|key| {
                inner.entries.get(key).map(|entry| EntrySummary {
                    key: key.clone(),
                    records: entry.records.len(),
                    covered_start: entry.covered.start,
                    covered_end: entry.covered.end,
                    age_secs: (now - entry.created_at).num_seconds(),
                })
            })
            .collect();

        CacheStats {
            size: inner.entries.len(),
            max_size: self.max_entries,
            ttl_secs: self.ttl_secs,
            entries,
        }
    }
}
