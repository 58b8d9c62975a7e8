use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Slice handle compared by pointer identity rather than by content.
///
/// Reducers hand back the same `Arc` when nothing changed, so pointer
/// equality is exactly "this map has not been touched".
#[derive(Debug)]
pub struct SliceRef<T>(pub Arc<T>);

impl<T> Clone for SliceRef<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> PartialEq for SliceRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Eq for SliceRef<T> {}

/// Single-entry cache keyed on the last seen input.
///
/// `get_or_compute` returns the cached value while the key compares equal to
/// the previous call's key, and recomputes otherwise. The key is the full
/// memoization contract: slice identities plus filter values.
#[derive(Debug)]
pub struct Memo<K, V> {
    last: Mutex<Option<(K, V)>>,
    recomputations: AtomicU64,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self { last: Mutex::new(None), recomputations: AtomicU64::new(0) }
    }
}

impl<K: PartialEq, V: Clone> Memo<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&self, key: K, compute: impl FnOnce(&K) -> V) -> V {
        let mut last = self.last.lock();
        if let Some((cached_key, cached_value)) = last.as_ref() {
            if *cached_key == key {
                return cached_value.clone();
            }
        }
        let value = compute(&key);
        self.recomputations.fetch_add(1, Ordering::Relaxed);
        *last = Some((key, value.clone()));
        value
    }
}

impl<K, V> Memo<K, V> {
    /// How many times the cached value had to be rebuilt.
    #[must_use]
    pub fn recomputations(&self) -> u64 {
        self.recomputations.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        *self.last.lock() = None;
    }
}
