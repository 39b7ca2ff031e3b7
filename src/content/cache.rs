//! In-memory cache of content query results.
//!
//! Entries are keyed by the query text, the canonical JSON of its parameters, the
//! perspective and the endpoint choice. Each entry keeps its own revalidation
//! horizon and tag set. A stale entry is ignored on read and overwritten by the
//! next successful fetch; tagged entries can be evicted at any time.

use super::{FetchOptions, Perspective, QueryParams};
use serde_json::Value;
use std::{
    collections::{BTreeSet, HashMap},
    time::Duration,
};
use tokio::{sync::RwLock, time::Instant};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    query: String,
    params: String,
    perspective: Perspective,
    use_cdn: bool,
}

impl CacheKey {
    pub(crate) fn new(query: &str, params: &QueryParams, options: &FetchOptions) -> Self {
        // BTreeMap serializes with sorted keys, so equal parameter sets map to one key.
        let params = serde_json::to_string(params).unwrap_or_default();
        Self {
            query: query.to_string(),
            params,
            perspective: options.perspective(),
            use_cdn: options.use_cdn(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    fetched_at: Instant,
    revalidate: Duration,
    tags: BTreeSet<String>,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.revalidate
    }
}

#[derive(Debug, Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl QueryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn get(&self, key: &CacheKey) -> Option<Value> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_fresh())
            .map(|entry| entry.value.clone())
    }

    pub(crate) async fn insert(
        &self,
        key: CacheKey,
        value: Value,
        revalidate: Duration,
        tags: &BTreeSet<String>,
    ) {
        if revalidate.is_zero() {
            return;
        }

        let entry = CacheEntry {
            value,
            fetched_at: Instant::now(),
            revalidate,
            tags: tags.clone(),
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Drop every entry labelled with `tag`, returning how many were removed.
    pub async fn invalidate_tag(&self, tag: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.tags.contains(tag));
        before - entries.len()
    }

    /// Drop entries whose horizon has passed.
    pub async fn purge_stale(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh());
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
