//! Typed, namespaced, expiring storage on top of a [`KeyValueStore`].

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::{KeyValueStore, StorageResult};

/// Namespace used unless the caller picks another
pub const DEFAULT_NAMESPACE: &str = "bazaar:v1";

/// Every key the client persists
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Session,
    /// Vendor chosen on the vendor list and carried into the booking page
    SelectedVendor,
    RecentlyViewed,
    /// "Already viewed" flag for one product
    ViewedFlag(String),
    ApiBaseUrl,
}

impl StorageKey {
    pub fn as_key(&self) -> String {
        match self {
            Self::Session => "session".to_string(),
            Self::SelectedVendor => "booking.selected_vendor".to_string(),
            Self::RecentlyViewed => "recently_viewed".to_string(),
            Self::ViewedFlag(product_id) => format!("viewed.{}", product_id),
            Self::ApiBaseUrl => "settings.api_base_url".to_string(),
        }
    }
}

/// Stored value with its lifetime
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    stored_at: DateTime<Utc>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    value: T,
}

impl<T> Envelope<T> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| now >= at)
    }
}

/// Typed storage adapter
pub struct TypedStore<S> {
    backend: S,
    namespace: String,
}

impl<S: KeyValueStore> TypedStore<S> {
    pub fn new(backend: S) -> Self {
        Self::with_namespace(backend, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(backend: S, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn full_key(&self, key: &StorageKey) -> String {
        format!("{}:{}", self.namespace, key.as_key())
    }

    fn prefix(&self) -> String {
        format!("{}:", self.namespace)
    }

    pub fn put<T: Serialize>(
        &self,
        key: &StorageKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> StorageResult<()> {
        self.put_at(key, value, ttl, Utc::now())
    }

    pub fn put_at<T: Serialize>(
        &self,
        key: &StorageKey,
        value: &T,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        let envelope = Envelope {
            stored_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
            value,
        };
        let raw = serde_json::to_string(&envelope)?;
        self.backend.set(&self.full_key(key), &raw)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &StorageKey) -> StorageResult<Option<T>> {
        self.get_at(key, Utc::now())
    }

    /// Read a value as of `now`; expired or unreadable entries are deleted
    pub fn get_at<T: DeserializeOwned>(
        &self,
        key: &StorageKey,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<T>> {
        let full_key = self.full_key(key);
        let Some(raw) = self.backend.get(&full_key)? else {
            return Ok(None);
        };

        let envelope: Envelope<T> = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(key = %full_key, error = %e, "Dropping unreadable stored value");
                self.backend.remove(&full_key)?;
                return Ok(None);
            }
        };

        if envelope.is_expired(now) {
            tracing::debug!(key = %full_key, "Stored value expired");
            self.backend.remove(&full_key)?;
            return Ok(None);
        }

        Ok(Some(envelope.value))
    }

    pub fn contains_at(&self, key: &StorageKey, now: DateTime<Utc>) -> StorageResult<bool> {
        Ok(self.get_at::<serde_json::Value>(key, now)?.is_some())
    }

    pub fn remove(&self, key: &StorageKey) -> StorageResult<()> {
        self.backend.remove(&self.full_key(key))
    }

    /// Delete every expired or unreadable entry in this namespace
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let mut removed = 0;

        for key in self.backend.keys(&self.prefix())? {
            let Some(raw) = self.backend.get(&key)? else {
                continue;
            };

            let stale = match serde_json::from_str::<Envelope<serde_json::Value>>(&raw) {
                Ok(envelope) => envelope.is_expired(now),
                Err(_) => true,
            };

            if stale {
                self.backend.remove(&key)?;
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::debug!(namespace = %self.namespace, removed, "Purged expired entries");
        }

        Ok(removed)
    }

    pub fn purge_expired(&self) -> StorageResult<usize> {
        self.purge_expired_at(Utc::now())
    }

    /// Delete everything in this namespace
    pub fn clear(&self) -> StorageResult<()> {
        for key in self.backend.keys(&self.prefix())? {
            self.backend.remove(&key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_keys_are_namespaced() {
        let backend = Arc::new(MemoryStore::new());
        let store = TypedStore::new(Arc::clone(&backend));
        store
            .put(&StorageKey::SelectedVendor, &"v1".to_string(), None)
            .unwrap();

        assert_eq!(
            backend.keys("").unwrap(),
            vec!["bazaar:v1:booking.selected_vendor"]
        );
    }

    #[test]
    fn test_value_expires_after_ttl() {
        let store = TypedStore::new(MemoryStore::new());
        let t0 = Utc::now();

        store
            .put_at(&StorageKey::ApiBaseUrl, &"http://x".to_string(), Some(Duration::hours(1)), t0)
            .unwrap();

        let before: Option<String> = store
            .get_at(&StorageKey::ApiBaseUrl, t0 + Duration::minutes(59))
            .unwrap();
        assert_eq!(before.as_deref(), Some("http://x"));

        let after: Option<String> = store
            .get_at(&StorageKey::ApiBaseUrl, t0 + Duration::hours(1))
            .unwrap();
        assert!(after.is_none());
        assert!(store.backend().is_empty());
    }

    #[test]
    fn test_unreadable_value_is_dropped() {
        let backend = Arc::new(MemoryStore::new());
        backend.set("bazaar:v1:session", "not json").unwrap();

        let store = TypedStore::new(Arc::clone(&backend));
        let value: Option<String> = store.get(&StorageKey::Session).unwrap();
        assert!(value.is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn test_purge_and_clear_stay_in_namespace() {
        let backend = Arc::new(MemoryStore::new());
        backend.set("other:key", "keep").unwrap();

        let store = TypedStore::new(Arc::clone(&backend));
        let t0 = Utc::now();
        store
            .put_at(&StorageKey::ViewedFlag("p1".into()), &true, Some(Duration::hours(1)), t0)
            .unwrap();
        store
            .put_at(&StorageKey::ViewedFlag("p2".into()), &true, None, t0)
            .unwrap();

        assert_eq!(store.purge_expired_at(t0 + Duration::hours(2)).unwrap(), 1);
        assert!(store
            .contains_at(&StorageKey::ViewedFlag("p2".into()), t0 + Duration::hours(2))
            .unwrap());

        store.clear().unwrap();
        assert_eq!(backend.keys("").unwrap(), vec!["other:key"]);
    }
}
