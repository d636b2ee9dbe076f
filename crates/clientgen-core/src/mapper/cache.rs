use std::hash::Hash;

use dashmap::DashMap;

use crate::error::MapError;

/// Memoizing cache shared by concurrent mapping calls.
///
/// Values are computed without holding a shard lock, because mappers recurse into
/// other mappers and into themselves. When two callers race on the same key, the
/// first stored value wins and both callers return it.
#[derive(Debug)]
pub struct Memo<K: Eq + Hash, V> {
    inner: DashMap<K, V>,
}

impl<K: Eq + Hash, V: Clone> Memo<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).map(|v| v.clone())
    }

    pub fn get_or_try_insert_with(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<V, MapError>,
    ) -> Result<V, MapError> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        Ok(self.inner.entry(key).or_insert(value).clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> Default for Memo<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn first_writer_wins() {
        let memo: Memo<&str, Arc<String>> = Memo::new();
        let first = memo
            .get_or_try_insert_with("k", || Ok(Arc::new("a".to_string())))
            .unwrap();
        let second = memo
            .get_or_try_insert_with("k", || Ok(Arc::new("b".to_string())))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second, "a");
    }

    #[test]
    fn concurrent_callers_agree() {
        let memo: Memo<u32, Arc<u32>> = Memo::new();
        let computed = AtomicUsize::new(0);
        let results: Vec<Arc<u32>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        memo.get_or_try_insert_with(7, || {
                            computed.fetch_add(1, Ordering::SeqCst);
                            Ok(Arc::new(42))
                        })
                        .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(computed.load(Ordering::SeqCst) >= 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn errors_are_not_cached() {
        let memo: Memo<u32, u32> = Memo::new();
        let failed = memo.get_or_try_insert_with(1, || Err(MapError::MissingSchema("x".into())));
        assert!(failed.is_err());
        assert!(memo.is_empty());
    }
}
