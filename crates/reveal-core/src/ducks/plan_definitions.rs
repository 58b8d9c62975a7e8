use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::{cleared, merge_into, Action};
use crate::entity::{key_by_id, ById, Entity, FiReason, FiStatus, InterventionType, PlanStatus};
use crate::error::StoreError;
use crate::registry::Reducer;
use crate::selector::{matches_any, matches_text, ArraySelector, EntityFilter};
use crate::store::Store;

pub const REDUCER_NAME: &str = "planDefinitions";

pub const REMOVE_PLAN_DEFINITIONS_ACTION: Action = Action::RemovePlanDefinitions;

const INTERVENTION_TYPE_CODE: &str = "interventionType";
const FI_REASON_CODE: &str = "fiReason";
const FI_STATUS_CODE: &str = "fiStatus";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct EffectivePeriod {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UseContext {
    pub code: String,
    pub value_codable_concept: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct JurisdictionCode {
    pub code: String,
}

/// OpenSRP plan definition payload as returned by the `plans` endpoint.
///
/// Actions and goals are carried through untouched; nothing in the cache
/// reads them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanDefinition {
    #[serde(rename = "identifier")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub status: PlanStatus,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub effective_period: Option<EffectivePeriod>,
    #[serde(default)]
    pub use_context: Vec<UseContext>,
    #[serde(default)]
    pub jurisdiction: Vec<JurisdictionCode>,
    #[serde(default)]
    pub action: Vec<Value>,
    #[serde(default)]
    pub goal: Vec<Value>,
    #[serde(default)]
    pub server_version: Option<i64>,
}

impl Entity for PlanDefinition {
    const KIND: &'static str = "plan_definition";

    fn id(&self) -> &str {
        &self.id
    }
}

impl PlanDefinition {
    #[must_use]
    pub fn use_context_value(&self, code: &str) -> Option<&str> {
        self.use_context
            .iter()
            .find(|context| context.code == code)
            .map(|context| context.value_codable_concept.as_str())
    }

    #[must_use]
    pub fn intervention_type(&self) -> Option<InterventionType> {
        self.use_context_value(INTERVENTION_TYPE_CODE)
            .map(|value| InterventionType::from(value.to_string()))
    }

    #[must_use]
    pub fn fi_reason(&self) -> Option<FiReason> {
        self.use_context_value(FI_REASON_CODE).map(|value| FiReason::from(value.to_string()))
    }

    #[must_use]
    pub fn fi_status(&self) -> Option<FiStatus> {
        self.use_context_value(FI_STATUS_CODE).map(|value| FiStatus::from(value.to_string()))
    }

    #[must_use]
    pub fn jurisdiction_ids(&self) -> Vec<String> {
        self.jurisdiction.iter().map(|jurisdiction| jurisdiction.code.clone()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanDefinitionsState {
    pub plan_definitions_by_id: Arc<ById<PlanDefinition>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlanDefinitionsReducer;

impl Reducer for PlanDefinitionsReducer {
    type State = PlanDefinitionsState;

    fn initial_state(&self) -> Self::State {
        PlanDefinitionsState::default()
    }

    fn reduce(&self, state: &Arc<Self::State>, action: &Action) -> Arc<Self::State> {
        let next = match action {
            Action::FetchPlanDefinitions { plan_definitions_by_id, overwrite } => {
                merge_into(&state.plan_definitions_by_id, plan_definitions_by_id, *overwrite)
            }
            Action::RemovePlanDefinitions => cleared(&state.plan_definitions_by_id),
            _ => return Arc::clone(state),
        };
        if Arc::ptr_eq(&next, &state.plan_definitions_by_id) {
            Arc::clone(state)
        } else {
            Arc::new(PlanDefinitionsState { plan_definitions_by_id: next })
        }
    }
}

#[must_use]
pub fn fetch_plan_definitions(
    plan_definitions: impl IntoIterator<Item = PlanDefinition>,
    overwrite: bool,
) -> Action {
    Action::FetchPlanDefinitions { plan_definitions_by_id: key_by_id(plan_definitions), overwrite }
}

/// # Errors
/// Returns [`StoreError`] when the plan definitions slice is not registered.
pub fn get_plan_definitions_by_id(store: &Store) -> Result<Arc<ById<PlanDefinition>>, StoreError> {
    Ok(Arc::clone(&store.slice::<PlanDefinitionsState>(REDUCER_NAME)?.plan_definitions_by_id))
}

/// # Errors
/// Returns [`StoreError`] when the plan definitions slice is not registered.
pub fn get_plan_definition_by_id(
    store: &Store,
    id: &str,
) -> Result<Option<PlanDefinition>, StoreError> {
    Ok(get_plan_definitions_by_id(store)?.get(id).cloned())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanDefinitionFilters {
    pub intervention_types: Option<Vec<InterventionType>>,
    pub status_list: Option<Vec<PlanStatus>>,
    /// Matched against both `title` and `name`.
    pub title: Option<String>,
    pub jurisdiction_ids: Option<Vec<String>>,
    pub plan_ids: Option<Vec<String>>,
}

impl EntityFilter<PlanDefinition> for PlanDefinitionFilters {
    fn matches(&self, plan: &PlanDefinition) -> bool {
        matches_any(plan.intervention_type().as_ref(), self.intervention_types.as_deref())
            && matches_any(Some(&plan.status), self.status_list.as_deref())
            && (matches_text(Some(&plan.title), self.title.as_deref())
                || matches_text(Some(&plan.name), self.title.as_deref()))
            && self.jurisdiction_ids.as_ref().map_or(true, |wanted| {
                plan.jurisdiction.iter().any(|jurisdiction| wanted.contains(&jurisdiction.code))
            })
            && self.plan_ids.as_ref().map_or(true, |ids| ids.contains(&plan.id))
    }
}

#[must_use]
pub fn make_plan_definitions_array_selector() -> ArraySelector<PlanDefinition, PlanDefinitionFilters>
{
    ArraySelector::new(get_plan_definitions_by_id)
}
