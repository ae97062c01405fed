//! Recently viewed products and "already viewed" flags
//!
//! Both are bounded: the recently-viewed list by length and entry age,
//! the viewed flags by TTL.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{KeyValueStore, StorageKey, StorageResult, TypedStore};
use crate::models::Product;

pub const DEFAULT_RECENT_MAX: usize = 12;
pub const DEFAULT_RECENT_MAX_AGE_DAYS: i64 = 30;
pub const DEFAULT_VIEWED_FLAG_HOURS: i64 = 24;

/// One product in the recently-viewed strip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub image: Option<String>,
    pub viewed_at: DateTime<Utc>,
}

impl RecentEntry {
    pub fn from_product(product: &Product, viewed_at: DateTime<Utc>) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.cover_image().map(str::to_string),
            viewed_at,
        }
    }
}

/// Most-recent-first list of viewed products
pub struct RecentlyViewed<'a, S> {
    store: &'a TypedStore<S>,
    max_items: usize,
    max_age: Duration,
}

impl<'a, S: KeyValueStore> RecentlyViewed<'a, S> {
    pub fn new(store: &'a TypedStore<S>) -> Self {
        Self::with_limits(
            store,
            DEFAULT_RECENT_MAX,
            Duration::days(DEFAULT_RECENT_MAX_AGE_DAYS),
        )
    }

    pub fn with_limits(store: &'a TypedStore<S>, max_items: usize, max_age: Duration) -> Self {
        Self {
            store,
            max_items,
            max_age,
        }
    }

    /// Entries still within the age bound, newest first
    pub fn list_at(&self, now: DateTime<Utc>) -> StorageResult<Vec<RecentEntry>> {
        let stored: Vec<RecentEntry> = self
            .store
            .get_at(&StorageKey::RecentlyViewed, now)?
            .unwrap_or_default();
        let total = stored.len();

        let fresh = self.prune(stored, now);
        if fresh.len() != total {
            self.store
                .put_at(&StorageKey::RecentlyViewed, &fresh, None, now)?;
        }

        Ok(fresh)
    }

    pub fn list(&self) -> StorageResult<Vec<RecentEntry>> {
        self.list_at(Utc::now())
    }

    /// Put a product at the front, dropping any older entry for it
    pub fn record_at(&self, entry: RecentEntry, now: DateTime<Utc>) -> StorageResult<()> {
        let mut entries = self.list_at(now)?;
        entries.retain(|e| e.product_id != entry.product_id);
        entries.insert(0, entry);
        entries.truncate(self.max_items);

        self.store
            .put_at(&StorageKey::RecentlyViewed, &entries, None, now)
    }

    pub fn record(&self, product: &Product) -> StorageResult<()> {
        let now = Utc::now();
        self.record_at(RecentEntry::from_product(product, now), now)
    }

    pub fn clear(&self) -> StorageResult<()> {
        self.store.remove(&StorageKey::RecentlyViewed)
    }

    fn prune(&self, entries: Vec<RecentEntry>, now: DateTime<Utc>) -> Vec<RecentEntry> {
        entries
            .into_iter()
            .filter(|e| now - e.viewed_at < self.max_age)
            .take(self.max_items)
            .collect()
    }
}

/// Per-product "already viewed" flags, used to count a view once per TTL
pub struct ViewedFlags<'a, S> {
    store: &'a TypedStore<S>,
    ttl: Duration,
}

impl<'a, S: KeyValueStore> ViewedFlags<'a, S> {
    pub fn new(store: &'a TypedStore<S>) -> Self {
        Self::with_ttl(store, Duration::hours(DEFAULT_VIEWED_FLAG_HOURS))
    }

    pub fn with_ttl(store: &'a TypedStore<S>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Returns true the first time a product is seen within the TTL and
    /// sets the flag; false while the flag is live
    pub fn first_view_at(&self, product_id: &str, now: DateTime<Utc>) -> StorageResult<bool> {
        let key = StorageKey::ViewedFlag(product_id.to_string());
        if self.store.contains_at(&key, now)? {
            return Ok(false);
        }

        self.store.put_at(&key, &true, Some(self.ttl), now)?;
        Ok(true)
    }

    pub fn first_view(&self, product_id: &str) -> StorageResult<bool> {
        self.first_view_at(product_id, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn entry(id: &str, at: DateTime<Utc>) -> RecentEntry {
        RecentEntry {
            product_id: id.to_string(),
            name: format!("Product {}", id),
            price: 10.0,
            image: None,
            viewed_at: at,
        }
    }

    #[test]
    fn test_most_recent_first_without_duplicates() {
        let store = TypedStore::new(MemoryStore::new());
        let recent = RecentlyViewed::new(&store);
        let now = Utc::now();

        recent.record_at(entry("a", now), now).unwrap();
        recent.record_at(entry("b", now), now).unwrap();
        recent.record_at(entry("a", now), now).unwrap();

        let ids: Vec<_> = recent
            .list_at(now)
            .unwrap()
            .into_iter()
            .map(|e| e.product_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_bounded_by_size() {
        let store = TypedStore::new(MemoryStore::new());
        let recent = RecentlyViewed::with_limits(&store, 3, Duration::days(30));
        let now = Utc::now();

        for id in ["a", "b", "c", "d", "e"] {
            recent.record_at(entry(id, now), now).unwrap();
        }

        let ids: Vec<_> = recent
            .list_at(now)
            .unwrap()
            .into_iter()
            .map(|e| e.product_id)
            .collect();
        assert_eq!(ids, vec!["e", "d", "c"]);
    }

    #[test]
    fn test_bounded_by_age() {
        let store = TypedStore::new(MemoryStore::new());
        let recent = RecentlyViewed::with_limits(&store, 10, Duration::days(7));
        let t0 = Utc::now();

        recent.record_at(entry("old", t0), t0).unwrap();
        let later = t0 + Duration::days(5);
        recent.record_at(entry("new", later), later).unwrap();

        let ids: Vec<_> = recent
            .list_at(t0 + Duration::days(8))
            .unwrap()
            .into_iter()
            .map(|e| e.product_id)
            .collect();
        assert_eq!(ids, vec!["new"]);
    }

    #[test]
    fn test_viewed_flag_counts_once_per_ttl() {
        let store = TypedStore::new(MemoryStore::new());
        let flags = ViewedFlags::with_ttl(&store, Duration::hours(24));
        let t0 = Utc::now();

        assert!(flags.first_view_at("p1", t0).unwrap());
        assert!(!flags.first_view_at("p1", t0 + Duration::hours(23)).unwrap());
        assert!(flags.first_view_at("p2", t0).unwrap());
        assert!(flags.first_view_at("p1", t0 + Duration::hours(24)).unwrap());
    }
}
