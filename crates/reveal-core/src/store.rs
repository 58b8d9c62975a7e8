use std::any::type_name;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::action::Action;
use crate::error::StoreError;
use crate::registry::{AnyState, ReducerRegistry, SliceReducer};

/// Notification handed to subscribers after a dispatch that changed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub action_type: &'static str,
    pub changed_slices: Vec<String>,
    pub version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StoreChange) + Send>;

/// Process-wide entity cache.
///
/// Owns one state per registered slice. Every mutation goes through
/// [`Store::dispatch`], which runs each slice reducer in turn; a slice whose
/// reducer returns the same `Arc` is left untouched.
pub struct Store {
    reducers: BTreeMap<String, Arc<dyn SliceReducer>>,
    states: BTreeMap<String, AnyState>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    version: u64,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("slices", &self.states.keys().collect::<Vec<_>>())
            .field("listeners", &self.listeners.len())
            .field("version", &self.version)
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(ReducerRegistry::with_default_slices())
    }
}

impl Store {
    #[must_use]
    pub fn new(registry: ReducerRegistry) -> Self {
        let reducers = registry.into_reducers();
        let states = reducers.iter().map(|(name, reducer)| (name.clone(), reducer.initial())).collect();
        Self { reducers, states, listeners: Vec::new(), next_subscription: 0, version: 0 }
    }

    /// Apply `action` to every slice. Returns `true` when any slice changed.
    pub fn dispatch(&mut self, action: Action) -> bool {
        let mut changed_slices = Vec::new();
        for (name, reducer) in &self.reducers {
            let Some(current) = self.states.get(name) else {
                continue;
            };
            if let Some(next) = reducer.reduce_any(current, &action) {
                self.states.insert(name.clone(), next);
                changed_slices.push(name.clone());
            }
        }

        if changed_slices.is_empty() {
            tracing::trace!(action = action.action_type(), "dispatch left state unchanged");
            return false;
        }

        self.version += 1;
        tracing::debug!(
            action = action.action_type(),
            slices = ?changed_slices,
            version = self.version,
            "dispatch changed state"
        );
        let change =
            StoreChange { action_type: action.action_type(), changed_slices, version: self.version };
        for (_, listener) in &mut self.listeners {
            listener(&change);
        }
        true
    }

    /// Typed read of one slice's current state.
    ///
    /// # Errors
    /// Returns [`StoreError::SliceNotRegistered`] when no reducer was registered
    /// under `name`, and [`StoreError::SliceTypeMismatch`] when the slice holds
    /// another state type.
    pub fn slice<S: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<S>, StoreError> {
        let state =
            self.states.get(name).ok_or_else(|| StoreError::SliceNotRegistered(name.to_string()))?;
        Arc::clone(state).downcast::<S>().map_err(|_| StoreError::SliceTypeMismatch {
            slice: name.to_string(),
            expected: type_name::<S>(),
        })
    }

    #[must_use]
    pub fn has_slice(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// Number of dispatches that changed state since creation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreChange) + Send + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::ducks::organizations::{self, Organization};
    use crate::ducks::plans::{self, PlansState};

    fn organization(id: &str, name: &str) -> Organization {
        Organization {
            id: id.to_string(),
            server_id: None,
            name: name.to_string(),
            active: true,
            organization_type: None,
            part_of: None,
        }
    }

    #[test]
    fn unregistered_slice_is_a_wiring_error() {
        let store = Store::new(ReducerRegistry::new());
        let err = match store.slice::<PlansState>(plans::REDUCER_NAME) {
            Ok(_) => panic!("empty registry should not expose the plans slice"),
            Err(err) => err,
        };
        assert_eq!(err, StoreError::SliceNotRegistered(plans::REDUCER_NAME.to_string()));
    }

    #[test]
    fn wrong_state_type_is_reported() {
        let store = Store::default();
        let result = store.slice::<PlansState>(organizations::REDUCER_NAME);
        assert!(matches!(result, Err(StoreError::SliceTypeMismatch { .. })));
    }

    #[test]
    fn unrelated_action_keeps_every_slice_pointer() {
        let mut store = Store::default();
        let before = store
            .slice::<PlansState>(plans::REDUCER_NAME)
            .unwrap_or_else(|err| panic!("plans slice: {err}"));

        assert!(store.dispatch(organizations::fetch_organizations(
            vec![organization("org-1", "Team A")],
            false
        )));

        let after = store
            .slice::<PlansState>(plans::REDUCER_NAME)
            .unwrap_or_else(|err| panic!("plans slice: {err}"));
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn subscribers_only_hear_real_changes() {
        let mut store = Store::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let id = store.subscribe(move |change| {
            assert_eq!(change.changed_slices, vec![organizations::REDUCER_NAME.to_string()]);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.dispatch(organizations::fetch_organizations(vec![organization("org-1", "A")], false));
        // Removing an already empty plans slice changes nothing.
        store.dispatch(plans::REMOVE_PLANS_ACTION);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.version(), 1);

        assert!(store.unsubscribe(id));
        store.dispatch(organizations::REMOVE_ORGANIZATIONS_ACTION);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.version(), 2);
    }
}
