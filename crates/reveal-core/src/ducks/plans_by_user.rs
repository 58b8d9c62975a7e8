use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use crate::action::{cleared, Action};
use crate::error::StoreError;
use crate::memo::{Memo, SliceRef};
use crate::registry::Reducer;
use crate::store::Store;

pub const REDUCER_NAME: &str = "planIdsByUser";

pub const REMOVE_PLANS_BY_USER_ACTION: Action = Action::RemovePlansByUser;

pub type PlanIdsByUserName = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlansByUserState {
    pub plans_by_user_name: Arc<PlanIdsByUserName>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlansByUserReducer;

/// Union into (or replace) one user's set; other users are left alone.
fn merge_user_plans(
    current: &Arc<PlanIdsByUserName>,
    user_name: &str,
    plan_ids: &BTreeSet<String>,
    overwrite: bool,
) -> Arc<PlanIdsByUserName> {
    let existing = current.get(user_name);
    let next_set = match (existing, overwrite) {
        (Some(existing), false) => existing.union(plan_ids).cloned().collect(),
        _ => plan_ids.clone(),
    };
    if existing == Some(&next_set) {
        return Arc::clone(current);
    }
    let mut next = current.as_ref().clone();
    next.insert(user_name.to_string(), next_set);
    Arc::new(next)
}

impl Reducer for PlansByUserReducer {
    type State = PlansByUserState;

    fn initial_state(&self) -> Self::State {
        PlansByUserState::default()
    }

    fn reduce(&self, state: &Arc<Self::State>, action: &Action) -> Arc<Self::State> {
        let next = match action {
            Action::FetchPlansByUser { user_name, plan_ids, overwrite } => {
                merge_user_plans(&state.plans_by_user_name, user_name, plan_ids, *overwrite)
            }
            Action::RemovePlansByUser => cleared(&state.plans_by_user_name),
            _ => return Arc::clone(state),
        };
        if Arc::ptr_eq(&next, &state.plans_by_user_name) {
            Arc::clone(state)
        } else {
            Arc::new(PlansByUserState { plans_by_user_name: next })
        }
    }
}

/// Record the plans assigned to `user_name`.
///
/// A fetch that returns no plans still records the user, so a later lookup
/// can tell "no assignments" apart from "never fetched".
#[must_use]
pub fn fetch_plans_by_user(
    plan_ids: impl IntoIterator<Item = String>,
    user_name: impl Into<String>,
    overwrite: bool,
) -> Action {
    Action::FetchPlansByUser {
        user_name: user_name.into(),
        plan_ids: plan_ids.into_iter().collect(),
        overwrite,
    }
}

/// # Errors
/// Returns [`StoreError`] when the plans-by-user slice is not registered.
pub fn get_plans_by_user_name(store: &Store) -> Result<Arc<PlanIdsByUserName>, StoreError> {
    Ok(Arc::clone(&store.slice::<PlansByUserState>(REDUCER_NAME)?.plans_by_user_name))
}

type UserKey = (SliceRef<PlanIdsByUserName>, Option<String>);

/// Resolves a user filter into the plan id restriction for the plan selectors.
#[derive(Debug, Default)]
pub struct PlansByUserSelector {
    memo: Memo<UserKey, Option<Arc<Vec<String>>>>,
}

impl PlansByUserSelector {
    /// `None` when no user filter is active (blank or absent name), otherwise
    /// the user's plan ids; an unknown user yields an empty list.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the plans-by-user slice is not registered.
    pub fn select(
        &self,
        store: &Store,
        user_name: Option<&str>,
    ) -> Result<Option<Arc<Vec<String>>>, StoreError> {
        let user_name = user_name.map(str::trim).filter(|name| !name.is_empty());
        let by_user = get_plans_by_user_name(store)?;
        Ok(self.memo.get_or_compute(
            (SliceRef(by_user), user_name.map(str::to_string)),
            |(SliceRef(by_user), user_name)| {
                user_name.as_ref().map(|user_name| {
                    Arc::new(
                        by_user
                            .get(user_name)
                            .map(|ids| ids.iter().cloned().collect())
                            .unwrap_or_default(),
                    )
                })
            },
        ))
    }

    #[must_use]
    pub fn recomputations(&self) -> u64 {
        self.memo.recomputations()
    }
}

#[must_use]
pub fn make_plans_by_user_names_selector() -> PlansByUserSelector {
    PlansByUserSelector::default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoDataMessage {
    UserHasNoPlanAssignments,
    NoDataFound,
}

impl NoDataMessage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserHasNoPlanAssignments => "User has no plan assignments",
            Self::NoDataFound => "No Data Found",
        }
    }
}

/// Which empty-state message an empty listing should show.
///
/// `user_plan_ids` is the output of [`PlansByUserSelector::select`]; an
/// active user filter with zero assignments gets the specific message.
#[must_use]
pub fn no_data_message(user_plan_ids: Option<&[String]>) -> NoDataMessage {
    match user_plan_ids {
        Some(ids) if ids.is_empty() => NoDataMessage::UserHasNoPlanAssignments,
        _ => NoDataMessage::NoDataFound,
    }
}
