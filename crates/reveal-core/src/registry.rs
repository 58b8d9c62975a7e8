use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::action::Action;
use crate::ducks::{
    files, jurisdiction_metadata, organizations, plan_definitions, plans, plans_by_user,
    practitioners,
};

pub(crate) type AnyState = Arc<dyn Any + Send + Sync>;

/// Pure state transition for one store slice.
///
/// `reduce` must hand back the very same `Arc` for actions it does not
/// handle; the store and the selectors downstream compare states by pointer.
pub trait Reducer: Send + Sync + 'static {
    type State: Send + Sync + 'static;

    fn initial_state(&self) -> Self::State;

    fn reduce(&self, state: &Arc<Self::State>, action: &Action) -> Arc<Self::State>;
}

pub(crate) trait SliceReducer: Send + Sync {
    fn initial(&self) -> AnyState;

    /// `None` when the action left the slice untouched.
    fn reduce_any(&self, state: &AnyState, action: &Action) -> Option<AnyState>;
}

impl<R: Reducer> SliceReducer for R {
    fn initial(&self) -> AnyState {
        Arc::new(self.initial_state())
    }

    fn reduce_any(&self, state: &AnyState, action: &Action) -> Option<AnyState> {
        let typed = Arc::clone(state).downcast::<R::State>().ok()?;
        let next = self.reduce(&typed, action);
        if Arc::ptr_eq(&typed, &next) {
            None
        } else {
            Some(next)
        }
    }
}

/// Slice name to reducer table, assembled before the store exists.
///
/// Registering a name twice replaces the earlier reducer, so independent
/// modules can register defensively without coordinating.
#[derive(Clone, Default)]
pub struct ReducerRegistry {
    reducers: BTreeMap<String, Arc<dyn SliceReducer>>,
}

impl std::fmt::Debug for ReducerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReducerRegistry").field("slices", &self.slice_names()).finish()
    }
}

impl ReducerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in slice.
    #[must_use]
    pub fn with_default_slices() -> Self {
        let mut registry = Self::new();
        registry
            .register(plans::REDUCER_NAME, plans::PlansReducer)
            .register(plan_definitions::REDUCER_NAME, plan_definitions::PlanDefinitionsReducer)
            .register(organizations::REDUCER_NAME, organizations::OrganizationsReducer)
            .register(practitioners::REDUCER_NAME, practitioners::PractitionersReducer)
            .register(files::REDUCER_NAME, files::FilesReducer)
            .register(
                jurisdiction_metadata::REDUCER_NAME,
                jurisdiction_metadata::JurisdictionMetadataReducer,
            )
            .register(plans_by_user::REDUCER_NAME, plans_by_user::PlansByUserReducer);
        registry
    }

    pub fn register<R: Reducer>(&mut self, name: &str, reducer: R) -> &mut Self {
        if self.reducers.insert(name.to_string(), Arc::new(reducer)).is_some() {
            tracing::debug!(slice = name, "reducer re-registered; keeping latest");
        } else {
            tracing::debug!(slice = name, "reducer registered");
        }
        self
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.reducers.contains_key(name)
    }

    #[must_use]
    pub fn slice_names(&self) -> Vec<&str> {
        self.reducers.keys().map(String::as_str).collect()
    }

    pub(crate) fn into_reducers(self) -> BTreeMap<String, Arc<dyn SliceReducer>> {
        self.reducers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_twice_keeps_one_entry() {
        let mut registry = ReducerRegistry::new();
        registry.register(plans::REDUCER_NAME, plans::PlansReducer);
        registry.register(plans::REDUCER_NAME, plans::PlansReducer);
        assert_eq!(registry.slice_names(), vec![plans::REDUCER_NAME]);
    }

    #[test]
    fn default_registry_covers_every_slice() {
        let registry = ReducerRegistry::with_default_slices();
        for name in [
            plans::REDUCER_NAME,
            plan_definitions::REDUCER_NAME,
            organizations::REDUCER_NAME,
            practitioners::REDUCER_NAME,
            files::REDUCER_NAME,
            jurisdiction_metadata::REDUCER_NAME,
            plans_by_user::REDUCER_NAME,
        ] {
            assert!(registry.is_registered(name), "{name} missing");
        }
    }
}
