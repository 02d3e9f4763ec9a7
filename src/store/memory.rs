//! In-memory storage implementation

use bytes::Bytes;
use siphasher::sip::SipHasher13;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Type alias for our hash map with SipHasher
type StoreMap<V> = HashMap<Bytes, V, BuildHasherDefault<SipHasher13>>;

fn store_map<V>(capacity: usize) -> StoreMap<V> {
    HashMap::with_capacity_and_hasher(capacity, BuildHasherDefault::<SipHasher13>::default())
}

/// In-memory key-value store
///
/// Shared between connections behind an `Arc`; every method takes `&self`.
pub struct MemoryStore {
    /// Plain keys (SET/GET)
    strings: RwLock<StoreMap<Bytes>>,

    /// Hash keys (HSET/HGET/HGETALL)
    hashes: RwLock<StoreMap<StoreMap<Bytes>>>,
}

impl MemoryStore {
    /// Create a new memory store with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a new memory store with specified initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        MemoryStore {
            strings: RwLock::new(store_map(capacity)),
            hashes: RwLock::new(store_map(capacity)),
        }
    }

    /// Set a key-value pair, returns true if the key is new
    pub fn set(&self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> bool {
        self.strings_mut().insert(key.into(), value.into()).is_none()
    }

    /// Get a value by key
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.strings().get(key).cloned()
    }

    /// Set a field in a hash, creating the hash if needed.
    /// Returns true if the field is new.
    pub fn hset(
        &self,
        key: impl Into<Bytes>,
        field: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> bool {
        self.hashes_mut()
            .entry(key.into())
            .or_insert_with(|| store_map(8))
            .insert(field.into(), value.into())
            .is_none()
    }

    /// Get a field of a hash
    pub fn hget(&self, key: &[u8], field: &[u8]) -> Option<Bytes> {
        self.hashes().get(key)?.get(field).cloned()
    }

    /// Get every field/value pair of a hash, `None` if the hash does not exist
    pub fn hgetall(&self, key: &[u8]) -> Option<Vec<(Bytes, Bytes)>> {
        self.hashes().get(key).map(|hash| {
            hash.iter()
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect()
        })
    }

    fn strings(&self) -> RwLockReadGuard<'_, StoreMap<Bytes>> {
        self.strings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn strings_mut(&self) -> RwLockWriteGuard<'_, StoreMap<Bytes>> {
        self.strings.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn hashes(&self) -> RwLockReadGuard<'_, StoreMap<StoreMap<Bytes>>> {
        self.hashes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn hashes_mut(&self) -> RwLockWriteGuard<'_, StoreMap<StoreMap<Bytes>>> {
        self.hashes.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_set_get() {
        let store = MemoryStore::new();
        assert!(store.set("key1", "value1"));
        assert!(!store.set("key1", "value2"));

        assert_eq!(store.get(b"key1"), Some(Bytes::from("value2")));
        assert_eq!(store.get(b"missing"), None);
    }

    #[test]
    fn test_hash_fields() {
        let store = MemoryStore::new();
        assert!(store.hset("user", "name", "ada"));
        assert!(store.hset("user", "lang", "rust"));
        assert!(!store.hset("user", "name", "grace"));

        assert_eq!(store.hget(b"user", b"name"), Some(Bytes::from("grace")));
        assert_eq!(store.hget(b"user", b"missing"), None);
        assert_eq!(store.hget(b"nohash", b"name"), None);

        let mut all = store.hgetall(b"user").unwrap();
        all.sort();
        assert_eq!(all, vec![
            (Bytes::from("lang"), Bytes::from("rust")),
            (Bytes::from("name"), Bytes::from("grace")),
        ]);
        assert!(store.hgetall(b"nohash").is_none());
    }

    #[test]
    fn test_key_spaces_are_separate() {
        let store = MemoryStore::new();
        store.set("shared", "plain");
        store.hset("shared", "f", "hashed");

        assert_eq!(store.get(b"shared"), Some(Bytes::from("plain")));
        assert_eq!(store.hget(b"shared", b"f"), Some(Bytes::from("hashed")));
        assert_eq!(store.hgetall(b"shared").map(|all| all.len()), Some(1));
    }
}
