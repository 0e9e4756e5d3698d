//! Short-lived results cache keyed by canonical filter hash.

use crate::core::hasher::FilterHash;
use crate::domain::model::Poi;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Vec<Poi>,
    fetched_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn new(data: Vec<Poi>, ttl: Duration) -> Self {
        Self {
            data,
            fetched_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.fetched_at.elapsed() >= self.ttl
    }
}

/// Expired entries behave as absent. When full, the oldest entry is evicted.
#[derive(Debug)]
pub struct QueryCache {
    entries: HashMap<FilterHash, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl QueryCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn get(&mut self, key: &FilterHash) -> Option<Vec<Poi>> {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.data.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&mut self, key: FilterHash, data: Vec<Poi>) {
        self.entries.retain(|_, entry| !entry.is_expired());

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.fetched_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
                tracing::debug!("Evicted cached results for {}", oldest);
            }
        }

        self.entries.insert(key, CacheEntry::new(data, self.ttl));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
