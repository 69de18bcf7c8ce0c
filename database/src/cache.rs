use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Bounded cache evicting the least recently read entry
pub struct LruCache<K, V> {
    capacity: usize,
    inner: Mutex<Slots<K, V>>,
}

struct Slots<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    tick: u64,
}

struct CacheEntry<V> {
    value: V,
    last_access: u64,
}

impl<K: Hash + Eq + Clone, V: Clone> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Slots { entries: HashMap::with_capacity(capacity), tick: 0 }),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut slots = self.inner.lock();
        slots.tick += 1;
        let tick = slots.tick;
        slots.entries.get_mut(key).map(|entry| {
            entry.last_access = tick;
            entry.value.clone()
        })
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    pub fn insert(&self, key: K, value: V) {
        let mut slots = self.inner.lock();
        slots.tick += 1;
        let tick = slots.tick;
        if slots.entries.len() >= self.capacity && !slots.entries.contains_key(&key) {
            let oldest = slots.entries.iter().min_by_key(|(_, e)| e.last_access).map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                slots.entries.remove(&oldest);
            }
        }
        slots.entries.insert(key, CacheEntry { value, last_access: tick });
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().entries.remove(key).map(|e| e.value)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write-through cache wrapper
pub struct WriteThroughCache<K, V> {
    inner: Arc<LruCache<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> WriteThroughCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self { inner: Arc::new(LruCache::new(capacity)) }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }
}
