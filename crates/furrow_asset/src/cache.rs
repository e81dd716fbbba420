//! Path-keyed reference counting shared by every resource kind.

use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct CacheEntry<T> {
    value: Arc<T>,
    refs: usize,
}

#[derive(Debug)]
pub struct ResourceCache<T> {
    entries: HashMap<String, CacheEntry<T>>,
}

impl<T> ResourceCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Take a reference to `key`, loading it on first use.
    pub fn acquire<E>(
        &mut self,
        key: &str,
        load: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.refs += 1;
            return Ok(entry.value.clone());
        }
        let value = Arc::new(load()?);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                refs: 1,
            },
        );
        Ok(value)
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn refs(&self, key: &str) -> usize {
        self.entries.get(key).map_or(0, |entry| entry.refs)
    }

    /// Drop one reference. Returns the value when it was the last one.
    pub fn release(&mut self, key: &str) -> Option<Arc<T>> {
        let entry = self.entries.get_mut(key)?;
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs > 0 {
            return None;
        }
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Remove everything, returning the evicted values.
    pub fn drain(&mut self) -> Vec<Arc<T>> {
        self.entries.drain().map(|(_, entry)| entry.value).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for ResourceCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_once_and_counts_references() {
        let mut cache = ResourceCache::new();
        let mut loads = 0;
        for _ in 0..3 {
            let value = cache
                .acquire("grass.png", || {
                    loads += 1;
                    Ok::<_, ()>(7)
                })
                .unwrap();
            assert_eq!(*value, 7);
        }
        assert_eq!(loads, 1);
        assert_eq!(cache.refs("grass.png"), 3);

        assert!(cache.release("grass.png").is_none());
        assert!(cache.release("grass.png").is_none());
        assert_eq!(cache.release("grass.png").as_deref(), Some(&7));
        assert!(cache.is_empty());
        assert!(cache.release("grass.png").is_none());
    }

    #[test]
    fn failed_load_is_not_cached() {
        let mut cache: ResourceCache<u8> = ResourceCache::new();
        assert!(cache.acquire("x", || Err("boom")).is_err());
        assert_eq!(cache.len(), 0);
        assert_eq!(*cache.acquire("x", || Ok::<_, &str>(1)).unwrap(), 1);
    }
}
