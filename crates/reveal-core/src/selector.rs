//! Filter predicates shared by the duck selectors, and the generic memoized
//! array selector most of them are built on.

use std::sync::Arc;

use crate::entity::{ById, Entity};
use crate::error::StoreError;
use crate::memo::{Memo, SliceRef};
use crate::store::Store;

/// Conjunction of optional predicates over one entity type.
pub trait EntityFilter<T>: Clone + PartialEq + Send + 'static {
    fn matches(&self, entity: &T) -> bool;
}

type SliceReader<T> = fn(&Store) -> Result<Arc<ById<T>>, StoreError>;
type ArrayKey<T, F> = (SliceRef<ById<T>>, F);

/// `(store, filters) -> Arc<Vec<T>>`, recomputed only when the by-id map
/// pointer or the filter value changes between calls.
pub struct ArraySelector<T, F> {
    read: SliceReader<T>,
    memo: Memo<ArrayKey<T, F>, Arc<Vec<T>>>,
}

impl<T, F> std::fmt::Debug for ArraySelector<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArraySelector")
            .field("recomputations", &self.memo.recomputations())
            .finish_non_exhaustive()
    }
}

impl<T: Entity, F: EntityFilter<T>> ArraySelector<T, F> {
    #[must_use]
    pub fn new(read: SliceReader<T>) -> Self {
        Self { read, memo: Memo::new() }
    }

    /// Entities passing every active filter, in id order.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backing slice is not registered.
    pub fn select(&self, store: &Store, filters: &F) -> Result<Arc<Vec<T>>, StoreError> {
        let by_id = (self.read)(store)?;
        Ok(self.memo.get_or_compute((SliceRef(by_id), filters.clone()), |(SliceRef(by_id), filters)| {
            Arc::new(by_id.values().filter(|entity| filters.matches(entity)).cloned().collect())
        }))
    }

    #[must_use]
    pub fn recomputations(&self) -> u64 {
        self.memo.recomputations()
    }
}

/// Case-insensitive substring match; an empty or missing needle passes everything.
#[must_use]
pub fn matches_text(haystack: Option<&str>, needle: Option<&str>) -> bool {
    let Some(needle) = needle.map(str::trim).filter(|needle| !needle.is_empty()) else {
        return true;
    };
    haystack.is_some_and(|haystack| haystack.to_lowercase().contains(&needle.to_lowercase()))
}

/// `None` means the filter is off; `Some(list)` keeps only listed values.
#[must_use]
pub fn matches_any<T: PartialEq>(value: Option<&T>, allowed: Option<&[T]>) -> bool {
    match allowed {
        None => true,
        Some(allowed) => value.is_some_and(|value| allowed.contains(value)),
    }
}

/// Whether `ancestor_id` appears in a possibly missing ancestry path.
#[must_use]
pub fn path_contains(path: Option<&[String]>, ancestor_id: Option<&str>) -> bool {
    match ancestor_id {
        None => true,
        Some(ancestor_id) => path.is_some_and(|path| path.iter().any(|id| id == ancestor_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_match_is_case_insensitive_and_blank_passes() {
        assert!(matches_text(Some("A Test By Mosh"), Some("MOSH")));
        assert!(matches_text(Some("A Test By Mosh"), Some("mosh")));
        assert!(matches_text(Some("A Test By Mosh"), Some("  ")));
        assert!(matches_text(None, None));
        assert!(!matches_text(None, Some("mosh")));
        assert!(!matches_text(Some("Routine IRS"), Some("mosh")));
    }

    #[test]
    fn list_filters_distinguish_off_from_empty() {
        assert!(matches_any(Some(&"a"), None));
        assert!(!matches_any(Some(&"a"), Some(&[])));
        assert!(matches_any(Some(&"a"), Some(&["b", "a"])));
        assert!(!matches_any::<&str>(None, Some(&["a"])));
    }

    #[test]
    fn ancestry_filter_tolerates_missing_paths() {
        let path = vec!["country".to_string(), "province".to_string()];
        assert!(path_contains(Some(&path), Some("province")));
        assert!(!path_contains(Some(&path), Some("district")));
        assert!(!path_contains(None, Some("province")));
        assert!(path_contains(None, None));
    }
}
