//! Client Storage
//!
//! One typed adapter for everything the client persists between visits:
//! the session, the vendor picked for a booking, "already viewed" flags and
//! the recently-viewed list.
//!
//! ## Layers
//!
//! - [`KeyValueStore`]: raw string storage (memory, SQLite, browser localStorage)
//! - [`TypedStore`]: namespaced keys, JSON envelopes, TTL and expiry-on-read
//! - [`RecentlyViewed`], [`ViewedFlags`]: bounded, expiring lists built on top
//!
//! Every key is written as `<namespace>:<key>`, so one backend can be shared
//! without collisions and wiped per namespace.

mod error;
mod memory;
mod recent;
#[cfg(feature = "native")]
mod sqlite;
mod typed;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use recent::{
    RecentEntry, RecentlyViewed, ViewedFlags, DEFAULT_RECENT_MAX, DEFAULT_RECENT_MAX_AGE_DAYS,
    DEFAULT_VIEWED_FLAG_HOURS,
};
#[cfg(feature = "native")]
pub use sqlite::SqliteStore;
pub use typed::{StorageKey, TypedStore, DEFAULT_NAMESPACE};

/// Raw string key-value storage
///
/// Methods take `&self`; backends use interior mutability so a store can be
/// shared by every component that needs it.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove(&self, key: &str) -> StorageResult<()>;

    /// All keys starting with `prefix`
    fn keys(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        (**self).keys(prefix)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::rc::Rc<S> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        (**self).keys(prefix)
    }
}
