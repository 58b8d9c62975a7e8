use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::{cleared, merge_into, Action};
use crate::ducks::plan_definitions::PlanDefinition;
use crate::entity::{key_by_id, ById, Entity, FiReason, FiStatus, InterventionType, PlanStatus};
use crate::error::StoreError;
use crate::registry::Reducer;
use crate::selector::{matches_any, matches_text, path_contains, ArraySelector, EntityFilter};
use crate::store::Store;

pub const REDUCER_NAME: &str = "plans";

pub const REMOVE_PLANS_ACTION: Action = Action::RemovePlans;

/// One plan scoped to one jurisdiction, with that jurisdiction's ancestry.
///
/// Ancestry fields are nullable: legacy rows arrive with `null` paths and are
/// kept as-is. Filters treat a missing path as "not inside any subtree".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Plan {
    pub id: String,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub jurisdiction_id: Option<String>,
    #[serde(default)]
    pub jurisdiction_name: Option<String>,
    #[serde(default)]
    pub jurisdiction_parent_id: Option<String>,
    #[serde(default)]
    pub jurisdiction_depth: Option<u32>,
    #[serde(default)]
    pub jurisdiction_path: Option<Vec<String>>,
    #[serde(default)]
    pub jurisdiction_name_path: Option<Vec<String>>,
    pub plan_status: PlanStatus,
    pub plan_intervention_type: InterventionType,
    #[serde(default)]
    pub plan_fi_reason: Option<FiReason>,
    #[serde(default)]
    pub plan_fi_status: Option<FiStatus>,
    #[serde(default)]
    pub plan_title: String,
    #[serde(default)]
    pub plan_date: Option<String>,
    #[serde(default)]
    pub plan_effective_period_start: Option<String>,
    #[serde(default)]
    pub plan_effective_period_end: Option<String>,
    #[serde(default)]
    pub plan_version: Option<String>,
}

impl Entity for Plan {
    const KIND: &'static str = "plan";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Plan {
    /// Identifier of the underlying plan definition; rows without one use their own id.
    #[must_use]
    pub fn plan_identifier(&self) -> &str {
        self.plan_id.as_deref().unwrap_or(&self.id)
    }

    /// Path, name path and depth all present and the same length.
    #[must_use]
    pub fn has_consistent_ancestry(&self) -> bool {
        match (&self.jurisdiction_path, &self.jurisdiction_name_path, self.jurisdiction_depth) {
            (Some(path), Some(names), Some(depth)) => {
                path.len() == names.len() && usize::try_from(depth).is_ok_and(|d| d == path.len())
            }
            _ => false,
        }
    }
}

/// Flattened plan projection used by list views.
///
/// Shares the plan identifier space; OpenSRP reports the key as `plan_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanRecord {
    #[serde(alias = "plan_id")]
    pub id: String,
    #[serde(default)]
    pub plan_title: String,
    pub plan_status: PlanStatus,
    pub plan_intervention_type: InterventionType,
    #[serde(default)]
    pub plan_fi_reason: Option<FiReason>,
    #[serde(default)]
    pub plan_fi_status: Option<FiStatus>,
    #[serde(default)]
    pub plan_date: Option<String>,
    #[serde(default)]
    pub plan_effective_period_start: Option<String>,
    #[serde(default)]
    pub plan_effective_period_end: Option<String>,
    #[serde(default)]
    pub plan_jurisdictions_ids: Option<Vec<String>>,
    #[serde(default)]
    pub plan_version: Option<String>,
}

impl Entity for PlanRecord {
    const KIND: &'static str = "plan_record";

    fn id(&self) -> &str {
        &self.id
    }
}

impl PlanRecord {
    /// Project a plan definition payload onto the record shape.
    ///
    /// Definitions without an `interventionType` use context are tagged
    /// `Other("")` rather than dropped.
    #[must_use]
    pub fn from_plan_definition(plan: &PlanDefinition) -> Self {
        let period = plan.effective_period.clone().unwrap_or_default();
        Self {
            id: plan.id.clone(),
            plan_title: plan.title.clone(),
            plan_status: plan.status.clone(),
            plan_intervention_type: plan
                .intervention_type()
                .unwrap_or_else(|| InterventionType::Other(String::new())),
            plan_fi_reason: plan.fi_reason(),
            plan_fi_status: plan.fi_status(),
            plan_date: plan.date.clone(),
            plan_effective_period_start: period.start,
            plan_effective_period_end: period.end,
            plan_jurisdictions_ids: Some(plan.jurisdiction_ids()),
            plan_version: plan.version.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlansState {
    pub plans_by_id: Arc<ById<Plan>>,
    pub plan_records_by_id: Arc<ById<PlanRecord>>,
}

impl PlansState {
    fn with(
        state: &Arc<Self>,
        plans_by_id: Arc<ById<Plan>>,
        plan_records_by_id: Arc<ById<PlanRecord>>,
    ) -> Arc<Self> {
        if Arc::ptr_eq(&plans_by_id, &state.plans_by_id)
            && Arc::ptr_eq(&plan_records_by_id, &state.plan_records_by_id)
        {
            return Arc::clone(state);
        }
        Arc::new(Self { plans_by_id, plan_records_by_id })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlansReducer;

impl Reducer for PlansReducer {
    type State = PlansState;

    fn initial_state(&self) -> Self::State {
        PlansState::default()
    }

    fn reduce(&self, state: &Arc<Self::State>, action: &Action) -> Arc<Self::State> {
        match action {
            Action::FetchPlans { plans_by_id, overwrite } => PlansState::with(
                state,
                merge_into(&state.plans_by_id, plans_by_id, *overwrite),
                Arc::clone(&state.plan_records_by_id),
            ),
            Action::FetchPlanRecords { plan_records_by_id, overwrite } => PlansState::with(
                state,
                Arc::clone(&state.plans_by_id),
                merge_into(&state.plan_records_by_id, plan_records_by_id, *overwrite),
            ),
            Action::RemovePlans => PlansState::with(
                state,
                cleared(&state.plans_by_id),
                cleared(&state.plan_records_by_id),
            ),
            _ => Arc::clone(state),
        }
    }
}

#[must_use]
pub fn fetch_plans(plans: impl IntoIterator<Item = Plan>, overwrite: bool) -> Action {
    Action::FetchPlans { plans_by_id: key_by_id(plans), overwrite }
}

#[must_use]
pub fn fetch_plan_records(records: impl IntoIterator<Item = PlanRecord>, overwrite: bool) -> Action {
    Action::FetchPlanRecords { plan_records_by_id: key_by_id(records), overwrite }
}

fn plans_state(store: &Store) -> Result<Arc<PlansState>, StoreError> {
    store.slice::<PlansState>(REDUCER_NAME)
}

/// # Errors
/// Returns [`StoreError`] when the plans slice is not registered.
pub fn get_plans_by_id(store: &Store) -> Result<Arc<ById<Plan>>, StoreError> {
    Ok(Arc::clone(&plans_state(store)?.plans_by_id))
}

/// # Errors
/// Returns [`StoreError`] when the plans slice is not registered.
pub fn get_plan_by_id(store: &Store, id: &str) -> Result<Option<Plan>, StoreError> {
    Ok(get_plans_by_id(store)?.get(id).cloned())
}

/// # Errors
/// Returns [`StoreError`] when the plans slice is not registered.
pub fn get_plans_array(store: &Store) -> Result<Vec<Plan>, StoreError> {
    Ok(get_plans_by_id(store)?.values().cloned().collect())
}

/// Ids of the plans passing `filters`, without memoization.
///
/// # Errors
/// Returns [`StoreError`] when the plans slice is not registered.
pub fn get_plans_id_array(store: &Store, filters: &PlanFilters) -> Result<Vec<String>, StoreError> {
    Ok(get_plans_by_id(store)?
        .values()
        .filter(|plan| EntityFilter::<Plan>::matches(filters, plan))
        .map(|plan| plan.id.clone())
        .collect())
}

/// # Errors
/// Returns [`StoreError`] when the plans slice is not registered.
pub fn get_plan_records_by_id(store: &Store) -> Result<Arc<ById<PlanRecord>>, StoreError> {
    Ok(Arc::clone(&plans_state(store)?.plan_records_by_id))
}

/// # Errors
/// Returns [`StoreError`] when the plans slice is not registered.
pub fn get_plan_record_by_id(store: &Store, id: &str) -> Result<Option<PlanRecord>, StoreError> {
    Ok(get_plan_records_by_id(store)?.get(id).cloned())
}

/// Optional predicates applied conjunctively; `None` switches one off.
///
/// `plan_ids` is where the per-user assignment filter lands: `None` means no
/// user filter, `Some(vec![])` means a user with no assignments and yields
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanFilters {
    pub intervention_types: Option<Vec<InterventionType>>,
    pub status_list: Option<Vec<PlanStatus>>,
    pub reason: Option<FiReason>,
    pub title: Option<String>,
    pub parent_jurisdiction_id: Option<String>,
    pub jurisdiction_ids: Option<Vec<String>>,
    pub plan_ids: Option<Vec<String>>,
}

impl PlanFilters {
    #[must_use]
    pub fn with_intervention_type(mut self, intervention_type: InterventionType) -> Self {
        self.intervention_types = Some(vec![intervention_type]);
        self
    }

    #[must_use]
    pub fn with_status_list(mut self, status_list: Vec<PlanStatus>) -> Self {
        self.status_list = Some(status_list);
        self
    }

    #[must_use]
    pub fn with_reason(mut self, reason: FiReason) -> Self {
        self.reason = Some(reason);
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_parent_jurisdiction(mut self, jurisdiction_id: impl Into<String>) -> Self {
        self.parent_jurisdiction_id = Some(jurisdiction_id.into());
        self
    }

    /// Feed the output of the plans-by-user selector straight in.
    #[must_use]
    pub fn with_plan_ids(mut self, plan_ids: Option<Arc<Vec<String>>>) -> Self {
        self.plan_ids = plan_ids.map(|ids| ids.as_ref().clone());
        self
    }

    fn matches_common(
        &self,
        plan_id: &str,
        status: &PlanStatus,
        intervention_type: &InterventionType,
        reason: Option<&FiReason>,
        title: &str,
    ) -> bool {
        matches_any(Some(intervention_type), self.intervention_types.as_deref())
            && matches_any(Some(status), self.status_list.as_deref())
            && self.reason.as_ref().map_or(true, |wanted| reason == Some(wanted))
            && matches_text(Some(title), self.title.as_deref())
            && self.plan_ids.as_ref().map_or(true, |ids| ids.iter().any(|id| id == plan_id))
    }
}

impl EntityFilter<Plan> for PlanFilters {
    fn matches(&self, plan: &Plan) -> bool {
        self.matches_common(
            plan.plan_identifier(),
            &plan.plan_status,
            &plan.plan_intervention_type,
            plan.plan_fi_reason.as_ref(),
            &plan.plan_title,
        ) && path_contains(plan.jurisdiction_path.as_deref(), self.parent_jurisdiction_id.as_deref())
            && matches_any(plan.jurisdiction_id.as_ref(), self.jurisdiction_ids.as_deref())
    }
}

/// Records carry no ancestry, so both jurisdiction filters look at the
/// record's own jurisdiction list.
impl EntityFilter<PlanRecord> for PlanFilters {
    fn matches(&self, record: &PlanRecord) -> bool {
        let jurisdictions = record.plan_jurisdictions_ids.as_deref();
        self.matches_common(
            &record.id,
            &record.plan_status,
            &record.plan_intervention_type,
            record.plan_fi_reason.as_ref(),
            &record.plan_title,
        ) && path_contains(jurisdictions, self.parent_jurisdiction_id.as_deref())
            && self.jurisdiction_ids.as_ref().map_or(true, |wanted| {
                jurisdictions.is_some_and(|ids| ids.iter().any(|id| wanted.contains(id)))
            })
    }
}

#[must_use]
pub fn make_plans_array_selector() -> ArraySelector<Plan, PlanFilters> {
    ArraySelector::new(get_plans_by_id)
}

#[must_use]
pub fn make_plan_records_array_selector() -> ArraySelector<PlanRecord, PlanFilters> {
    ArraySelector::new(get_plan_records_by_id)
}

#[cfg(test)]
pub(crate) mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::ducks::organizations;
    use crate::ducks::plan_definitions::tests::plan_definition;
    use crate::registry::ReducerRegistry;

    pub(crate) fn plan(
        id: &str,
        status: PlanStatus,
        intervention: InterventionType,
        title: &str,
    ) -> Plan {
        Plan {
            id: id.to_string(),
            plan_id: Some(format!("plan-{id}")),
            jurisdiction_id: Some(format!("jur-{id}")),
            jurisdiction_name: Some(format!("Village {id}")),
            jurisdiction_parent_id: Some("district-1".to_string()),
            jurisdiction_depth: Some(2),
            jurisdiction_path: Some(vec!["country".to_string(), "district-1".to_string()]),
            jurisdiction_name_path: Some(vec!["Zambia".to_string(), "Lusaka".to_string()]),
            plan_status: status,
            plan_intervention_type: intervention,
            plan_fi_reason: Some(FiReason::Routine),
            plan_fi_status: Some(FiStatus::A1),
            plan_title: title.to_string(),
            plan_date: Some("2019-08-09".to_string()),
            plan_effective_period_start: Some("2019-08-09".to_string()),
            plan_effective_period_end: Some("2019-08-29".to_string()),
            plan_version: Some("1".to_string()),
        }
    }

    fn select(store: &Store, filters: &PlanFilters) -> Vec<String> {
        make_plans_array_selector()
            .select(store, filters)
            .unwrap_or_else(|err| panic!("select plans: {err}"))
            .iter()
            .map(|plan| plan.id.clone())
            .collect()
    }

    fn store_with(plans: Vec<Plan>) -> Store {
        let mut store = Store::new(ReducerRegistry::with_default_slices());
        store.dispatch(fetch_plans(plans, false));
        store
    }

    #[test]
    fn filters_apply_conjunctively() {
        let store = store_with(vec![
            plan("1", PlanStatus::Active, InterventionType::Fi, "One"),
            plan("2", PlanStatus::Draft, InterventionType::Fi, "Two"),
            plan("3", PlanStatus::Active, InterventionType::Irs, "Three"),
        ]);
        let filters = PlanFilters::default()
            .with_status_list(vec![PlanStatus::Active])
            .with_intervention_type(InterventionType::Fi);
        assert_eq!(select(&store, &filters), vec!["1"]);
    }

    #[test]
    fn title_filter_ignores_case() {
        let store = store_with(vec![
            plan("1", PlanStatus::Active, InterventionType::Fi, "A Test By Mosh"),
            plan("2", PlanStatus::Active, InterventionType::Fi, "Another plan"),
        ]);
        assert_eq!(select(&store, &PlanFilters::default().with_title("MOSH")), vec!["1"]);
        assert_eq!(select(&store, &PlanFilters::default().with_title("mosh")), vec!["1"]);
        assert_eq!(select(&store, &PlanFilters::default().with_title("")).len(), 2);
    }

    #[test]
    fn reason_and_status_scenario() {
        let store = store_with(vec![plan("1", PlanStatus::Active, InterventionType::Fi, "Routine")]);
        let routine = PlanFilters::default()
            .with_reason(FiReason::Routine)
            .with_status_list(vec![PlanStatus::Active]);
        assert_eq!(select(&store, &routine), vec!["1"]);

        let case_triggered = PlanFilters::default().with_reason(FiReason::from("Case-triggered".to_string()));
        assert!(select(&store, &case_triggered).is_empty());
    }

    #[test]
    fn parent_jurisdiction_filter_skips_rows_without_ancestry() {
        let mut orphan = plan("2", PlanStatus::Active, InterventionType::Fi, "Orphan");
        orphan.jurisdiction_path = None;
        orphan.jurisdiction_name_path = None;
        let store = store_with(vec![plan("1", PlanStatus::Active, InterventionType::Fi, "Kept"), orphan]);

        assert_eq!(select(&store, &PlanFilters::default().with_parent_jurisdiction("district-1")), vec!["1"]);
        assert!(select(&store, &PlanFilters::default().with_parent_jurisdiction("district-9")).is_empty());
        assert_eq!(select(&store, &PlanFilters::default()).len(), 2);
    }

    #[test]
    fn plan_ids_none_versus_empty() {
        let store = store_with(vec![
            plan("1", PlanStatus::Active, InterventionType::Fi, "One"),
            plan("2", PlanStatus::Active, InterventionType::Fi, "Two"),
        ]);
        assert_eq!(select(&store, &PlanFilters::default().with_plan_ids(None)).len(), 2);
        assert!(select(&store, &PlanFilters::default().with_plan_ids(Some(Arc::new(vec![])))).is_empty());
        assert_eq!(
            select(&store, &PlanFilters::default().with_plan_ids(Some(Arc::new(vec!["plan-2".to_string()])))),
            vec!["2"]
        );
    }

    #[test]
    fn id_array_applies_the_same_filters_without_memo() {
        let store = store_with(vec![
            plan("1", PlanStatus::Active, InterventionType::Fi, "One"),
            plan("2", PlanStatus::Retired, InterventionType::Fi, "Two"),
            plan("3", PlanStatus::Active, InterventionType::Irs, "Three"),
        ]);
        let active = PlanFilters::default().with_status_list(vec![PlanStatus::Active]);
        let ids = get_plans_id_array(&store, &active).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(ids, vec!["1".to_string(), "3".to_string()]);
        assert_eq!(ids, select(&store, &active));
        assert!(get_plans_id_array(&store, &PlanFilters::default().with_plan_ids(Some(Arc::new(vec![]))))
            .unwrap_or_else(|err| panic!("{err}"))
            .is_empty());
    }

    #[test]
    fn selector_recomputes_only_for_relevant_changes() {
        let mut store = store_with(vec![plan("1", PlanStatus::Active, InterventionType::Fi, "One")]);
        let selector = make_plans_array_selector();
        let filters = PlanFilters::default().with_status_list(vec![PlanStatus::Active]);

        let first = selector.select(&store, &filters).unwrap_or_else(|err| panic!("{err}"));
        let second = selector.select(&store, &filters.clone()).unwrap_or_else(|err| panic!("{err}"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(selector.recomputations(), 1);

        store.dispatch(organizations::REMOVE_ORGANIZATIONS_ACTION);
        store.dispatch(fetch_plan_records(
            vec![PlanRecord::from_plan_definition(&plan_definition("pd-1", "Def", "IRS"))],
            false,
        ));
        let third = selector.select(&store, &filters).unwrap_or_else(|err| panic!("{err}"));
        assert!(Arc::ptr_eq(&first, &third));
        assert_eq!(selector.recomputations(), 1);

        store.dispatch(fetch_plans(vec![plan("2", PlanStatus::Active, InterventionType::Irs, "Two")], false));
        let fourth = selector.select(&store, &filters).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(fourth.len(), 2);
        assert_eq!(selector.recomputations(), 2);

        let _ = selector.select(&store, &PlanFilters::default().with_title("two"));
        assert_eq!(selector.recomputations(), 3);
    }

    #[test]
    fn unknown_action_returns_same_state() {
        let reducer = PlansReducer;
        let state = Arc::new(reducer.initial_state());
        let next = reducer.reduce(&state, &Action::RemoveFiles);
        assert!(Arc::ptr_eq(&state, &next));
    }

    #[test]
    fn double_registration_applies_fetch_once() {
        let mut registry = ReducerRegistry::new();
        registry.register(REDUCER_NAME, PlansReducer).register(REDUCER_NAME, PlansReducer);
        let mut store = Store::new(registry);

        assert!(store.dispatch(fetch_plans(
            vec![plan("1", PlanStatus::Active, InterventionType::Fi, "One")],
            false
        )));
        assert_eq!(store.version(), 1);
        assert_eq!(get_plans_array(&store).unwrap_or_else(|err| panic!("{err}")).len(), 1);
    }

    #[test]
    fn remove_clears_plans_and_records() {
        let mut store = store_with(vec![plan("1", PlanStatus::Active, InterventionType::Fi, "One")]);
        store.dispatch(fetch_plan_records(
            vec![PlanRecord::from_plan_definition(&plan_definition("pd-1", "Def", "FI"))],
            false,
        ));
        assert!(get_plan_record_by_id(&store, "pd-1").unwrap_or_else(|err| panic!("{err}")).is_some());

        store.dispatch(REMOVE_PLANS_ACTION);
        assert!(get_plans_by_id(&store).unwrap_or_else(|err| panic!("{err}")).is_empty());
        assert!(get_plan_records_by_id(&store).unwrap_or_else(|err| panic!("{err}")).is_empty());
    }

    #[test]
    fn record_filters_use_jurisdiction_list() {
        let mut store = Store::default();
        store.dispatch(fetch_plan_records(
            vec![
                PlanRecord::from_plan_definition(&plan_definition("pd-1", "Def One", "FI")),
                PlanRecord::from_plan_definition(&plan_definition("pd-2", "Def Two", "IRS")),
            ],
            false,
        ));
        let selector = make_plan_records_array_selector();
        let in_3952 = selector
            .select(
                &store,
                &PlanFilters {
                    jurisdiction_ids: Some(vec!["3952".to_string()]),
                    intervention_types: Some(vec![InterventionType::Irs]),
                    ..PlanFilters::default()
                },
            )
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(in_3952.len(), 1);
        assert_eq!(in_3952[0].id, "pd-2");
    }

    #[test]
    fn plan_record_accepts_plan_id_key() {
        let record: PlanRecord = serde_json::from_value(serde_json::json!({
            "plan_id": "356b6b84-fc36-4389-a44a-2b038ed2f38d",
            "plan_title": "A2-Lusaka Akros Test Focus 2",
            "plan_status": "active",
            "plan_intervention_type": "FI",
            "plan_fi_reason": "Case Triggered",
            "plan_date": "2019-08-09",
            "plan_jurisdictions_ids": null
        }))
        .unwrap_or_else(|err| panic!("record should deserialize: {err}"));
        assert_eq!(record.id(), "356b6b84-fc36-4389-a44a-2b038ed2f38d");
        assert_eq!(record.plan_fi_reason, Some(FiReason::CaseTriggered));
        assert!(record.plan_jurisdictions_ids.is_none());
    }

    #[test]
    fn ancestry_consistency_check() {
        let good = plan("1", PlanStatus::Active, InterventionType::Fi, "One");
        assert!(good.has_consistent_ancestry());

        let mut short = good.clone();
        short.jurisdiction_depth = Some(3);
        assert!(!short.has_consistent_ancestry());

        let mut legacy = good;
        legacy.jurisdiction_path = None;
        assert!(!legacy.has_consistent_ancestry());
    }

    fn plans_from_ids(ids: &[String]) -> Vec<Plan> {
        ids.iter().map(|id| plan(id, PlanStatus::Active, InterventionType::Fi, id)).collect()
    }

    proptest! {
        #[test]
        fn property_fetch_twice_equals_fetch_once(ids in prop::collection::vec("[a-h]{1,3}", 0..24)) {
            let plans = plans_from_ids(&ids);
            let mut once = Store::default();
            once.dispatch(fetch_plans(plans.clone(), false));
            let mut twice = Store::default();
            twice.dispatch(fetch_plans(plans.clone(), false));
            twice.dispatch(fetch_plans(plans, false));

            let once_map = get_plans_by_id(&once).unwrap_or_else(|err| panic!("{err}"));
            let twice_map = get_plans_by_id(&twice).unwrap_or_else(|err| panic!("{err}"));
            prop_assert_eq!(once_map.as_ref(), twice_map.as_ref());
        }

        #[test]
        fn property_upsert_never_drops_ids(
            left in prop::collection::btree_set("[a-h]{1,3}", 0..16),
            right in prop::collection::btree_set("[i-p]{1,3}", 0..16),
        ) {
            let left = left.into_iter().collect::<Vec<_>>();
            let right = right.into_iter().collect::<Vec<_>>();
            let mut store = Store::default();
            store.dispatch(fetch_plans(plans_from_ids(&left), false));
            store.dispatch(fetch_plans(plans_from_ids(&right), false));

            let by_id = get_plans_by_id(&store).unwrap_or_else(|err| panic!("{err}"));
            prop_assert_eq!(by_id.len(), left.len() + right.len());
            prop_assert!(left.iter().chain(right.iter()).all(|id| by_id.contains_key(id)));
        }

        #[test]
        fn property_overwrite_keeps_only_latest_batch(
            left in prop::collection::vec("[a-h]{1,3}", 0..16),
            right in prop::collection::vec("[a-h]{1,3}", 0..16),
        ) {
            let mut store = Store::default();
            store.dispatch(fetch_plans(plans_from_ids(&left), true));
            store.dispatch(fetch_plans(plans_from_ids(&right), true));

            let by_id = get_plans_by_id(&store).unwrap_or_else(|err| panic!("{err}"));
            let expected = right.iter().cloned().collect::<std::collections::BTreeSet<_>>();
            prop_assert_eq!(by_id.keys().cloned().collect::<std::collections::BTreeSet<_>>(), expected);
        }
    }
}
