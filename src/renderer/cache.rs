// renderer/cache.rs
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Lazily built, per-object values owned by a single pass.
///
/// Nothing is evicted automatically. When an object's resources are
/// replaced (texture reload, buffers recreated) the owner must call
/// [`BindingsCache::invalidate`], otherwise the stale bind group keeps being
/// returned.
pub struct BindingsCache<K, V = wgpu::BindGroup> {
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash, V> BindingsCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the stored value for `key`, running `build` only on a miss.
    ///
    /// The owned key is only created on a miss. A failing `build` stores
    /// nothing, so the next call retries.
    pub fn get_or_create<Q, E, F>(&mut self, key: &Q, build: F) -> Result<&V, E>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ToOwned<Owned = K> + ?Sized,
        F: FnOnce() -> Result<V, E>,
    {
        if !self.entries.contains_key(key) {
            let value = build()?;
            self.entries.insert(key.to_owned(), value);
        }
        Ok(&self.entries[key])
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.get(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Drops the entry for `key`; returns whether one existed.
    pub fn invalidate<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.remove(key).is_some()
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

impl<K: Eq + Hash, V> Default for BindingsCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
