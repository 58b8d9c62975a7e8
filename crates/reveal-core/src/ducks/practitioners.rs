use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::{cleared, merge_into, Action};
use crate::entity::{key_by_id, ById, Entity};
use crate::error::StoreError;
use crate::memo::{Memo, SliceRef};
use crate::registry::Reducer;
use crate::selector::matches_text;
use crate::store::Store;

pub const REDUCER_NAME: &str = "practitioners";

pub const REMOVE_PRACTITIONERS_ACTION: Action = Action::RemovePractitioners;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Practitioner {
    #[serde(rename = "identifier")]
    pub id: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: String,
}

fn default_active() -> bool {
    true
}

impl Entity for Practitioner {
    const KIND: &'static str = "practitioner";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Membership of one practitioner in one organization.
///
/// Ordered organization first, so one organization's members are a
/// contiguous range of the role map.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RoleKey {
    pub organization_id: String,
    pub practitioner_id: String,
}

impl RoleKey {
    #[must_use]
    pub fn new(organization_id: &str, practitioner_id: &str) -> Self {
        Self {
            organization_id: organization_id.to_string(),
            practitioner_id: practitioner_id.to_string(),
        }
    }

    fn organization_start(organization_id: &str) -> Self {
        Self::new(organization_id, "")
    }
}

pub type PractitionerRoles = BTreeMap<RoleKey, Practitioner>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PractitionersState {
    pub practitioners_by_id: Arc<ById<Practitioner>>,
    pub practitioner_roles: Arc<PractitionerRoles>,
}

impl PractitionersState {
    fn with(
        state: &Arc<Self>,
        practitioners_by_id: Arc<ById<Practitioner>>,
        practitioner_roles: Arc<PractitionerRoles>,
    ) -> Arc<Self> {
        if Arc::ptr_eq(&practitioners_by_id, &state.practitioners_by_id)
            && Arc::ptr_eq(&practitioner_roles, &state.practitioner_roles)
        {
            return Arc::clone(state);
        }
        Arc::new(Self { practitioners_by_id, practitioner_roles })
    }
}

fn organization_members<'a>(
    roles: &'a PractitionerRoles,
    organization_id: &'a str,
) -> impl Iterator<Item = (&'a RoleKey, &'a Practitioner)> + 'a {
    roles
        .range(RoleKey::organization_start(organization_id)..)
        .take_while(move |(key, _)| key.organization_id == organization_id)
}

/// Merge (or replace) the members of one organization; other organizations'
/// memberships are never touched.
fn merge_roles(
    current: &Arc<PractitionerRoles>,
    organization_id: &str,
    incoming: &ById<Practitioner>,
    overwrite: bool,
) -> Arc<PractitionerRoles> {
    let mut next = current.as_ref().clone();
    if overwrite {
        next.retain(|key, _| key.organization_id != organization_id);
    }
    next.extend(
        incoming
            .iter()
            .map(|(practitioner_id, practitioner)| {
                (RoleKey::new(organization_id, practitioner_id), practitioner.clone())
            }),
    );
    if next == **current {
        Arc::clone(current)
    } else {
        Arc::new(next)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PractitionersReducer;

impl Reducer for PractitionersReducer {
    type State = PractitionersState;

    fn initial_state(&self) -> Self::State {
        PractitionersState::default()
    }

    fn reduce(&self, state: &Arc<Self::State>, action: &Action) -> Arc<Self::State> {
        match action {
            Action::FetchPractitioners { practitioners_by_id, overwrite } => PractitionersState::with(
                state,
                merge_into(&state.practitioners_by_id, practitioners_by_id, *overwrite),
                Arc::clone(&state.practitioner_roles),
            ),
            Action::FetchPractitionerRoles { organization_id, practitioners_by_id, overwrite } => {
                PractitionersState::with(
                    state,
                    Arc::clone(&state.practitioners_by_id),
                    merge_roles(
                        &state.practitioner_roles,
                        organization_id,
                        practitioners_by_id,
                        *overwrite,
                    ),
                )
            }
            Action::RemovePractitioners => PractitionersState::with(
                state,
                cleared(&state.practitioners_by_id),
                cleared(&state.practitioner_roles),
            ),
            _ => Arc::clone(state),
        }
    }
}

#[must_use]
pub fn fetch_practitioners(
    practitioners: impl IntoIterator<Item = Practitioner>,
    overwrite: bool,
) -> Action {
    Action::FetchPractitioners { practitioners_by_id: key_by_id(practitioners), overwrite }
}

/// Record `practitioners` as members of `organization_id`.
#[must_use]
pub fn fetch_practitioner_roles(
    practitioners: impl IntoIterator<Item = Practitioner>,
    organization_id: impl Into<String>,
    overwrite: bool,
) -> Action {
    Action::FetchPractitionerRoles {
        organization_id: organization_id.into(),
        practitioners_by_id: key_by_id(practitioners),
        overwrite,
    }
}

fn practitioners_state(store: &Store) -> Result<Arc<PractitionersState>, StoreError> {
    store.slice::<PractitionersState>(REDUCER_NAME)
}

/// # Errors
/// Returns [`StoreError`] when the practitioners slice is not registered.
pub fn get_practitioners_by_id(store: &Store) -> Result<Arc<ById<Practitioner>>, StoreError> {
    Ok(Arc::clone(&practitioners_state(store)?.practitioners_by_id))
}

/// # Errors
/// Returns [`StoreError`] when the practitioners slice is not registered.
pub fn get_practitioner_by_id(store: &Store, id: &str) -> Result<Option<Practitioner>, StoreError> {
    Ok(get_practitioners_by_id(store)?.get(id).cloned())
}

/// # Errors
/// Returns [`StoreError`] when the practitioners slice is not registered.
pub fn get_practitioners_array(store: &Store) -> Result<Vec<Practitioner>, StoreError> {
    Ok(get_practitioners_by_id(store)?.values().cloned().collect())
}

/// # Errors
/// Returns [`StoreError`] when the practitioners slice is not registered.
pub fn get_practitioner_roles(store: &Store) -> Result<Arc<PractitionerRoles>, StoreError> {
    Ok(Arc::clone(&practitioners_state(store)?.practitioner_roles))
}

/// Members of one organization, in practitioner id order.
///
/// # Errors
/// Returns [`StoreError`] when the practitioners slice is not registered.
pub fn get_practitioners_by_org_id(
    store: &Store,
    organization_id: &str,
) -> Result<Vec<Practitioner>, StoreError> {
    let roles = get_practitioner_roles(store)?;
    Ok(organization_members(&roles, organization_id).map(|(_, p)| p.clone()).collect())
}

/// Practitioners that belong to no organization at all.
///
/// # Errors
/// Returns [`StoreError`] when the practitioners slice is not registered.
pub fn unassigned_practitioners(store: &Store) -> Result<Vec<Practitioner>, StoreError> {
    let state = practitioners_state(store)?;
    let assigned = state
        .practitioner_roles
        .keys()
        .map(|key| key.practitioner_id.as_str())
        .collect::<std::collections::BTreeSet<_>>();
    Ok(state
        .practitioners_by_id
        .values()
        .filter(|practitioner| !assigned.contains(practitioner.id.as_str()))
        .cloned()
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PractitionerFilters {
    /// Substring of either the display name or the username.
    pub name: Option<String>,
    pub organization_id: Option<String>,
    pub active_only: bool,
}

impl PractitionerFilters {
    fn matches(&self, practitioner: &Practitioner) -> bool {
        (matches_text(Some(&practitioner.name), self.name.as_deref())
            || matches_text(Some(&practitioner.username), self.name.as_deref()))
            && (!self.active_only || practitioner.active)
    }
}

type PractitionersKey =
    (SliceRef<ById<Practitioner>>, SliceRef<PractitionerRoles>, PractitionerFilters);

/// Memoized over both the practitioner map and the role relation, since an
/// organization filter reads the latter.
#[derive(Debug, Default)]
pub struct PractitionersArraySelector {
    memo: Memo<PractitionersKey, Arc<Vec<Practitioner>>>,
}

impl PractitionersArraySelector {
    /// # Errors
    /// Returns [`StoreError`] when the practitioners slice is not registered.
    pub fn select(
        &self,
        store: &Store,
        filters: &PractitionerFilters,
    ) -> Result<Arc<Vec<Practitioner>>, StoreError> {
        let state = practitioners_state(store)?;
        let key = (
            SliceRef(Arc::clone(&state.practitioners_by_id)),
            SliceRef(Arc::clone(&state.practitioner_roles)),
            filters.clone(),
        );
        Ok(self.memo.get_or_compute(key, |(SliceRef(by_id), SliceRef(roles), filters)| {
            let selected: Vec<Practitioner> = match filters.organization_id.as_deref() {
                // Prefer the freshest practitioner record over the copy stored with the role.
                Some(organization_id) => organization_members(roles, organization_id)
                    .map(|(key, member)| by_id.get(&key.practitioner_id).unwrap_or(member))
                    .filter(|practitioner| filters.matches(practitioner))
                    .cloned()
                    .collect(),
                None => by_id.values().filter(|practitioner| filters.matches(practitioner)).cloned().collect(),
            };
            Arc::new(selected)
        }))
    }

    #[must_use]
    pub fn recomputations(&self) -> u64 {
        self.memo.recomputations()
    }
}

#[must_use]
pub fn make_practitioners_array_selector() -> PractitionersArraySelector {
    PractitionersArraySelector::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn practitioner(id: &str, name: &str, username: &str) -> Practitioner {
        Practitioner {
            id: id.to_string(),
            active: true,
            name: name.to_string(),
            user_id: Some(format!("user-{id}")),
            username: username.to_string(),
        }
    }

    fn seeded_store() -> Store {
        let mut store = Store::default();
        store.dispatch(fetch_practitioners(
            vec![
                practitioner("p-1", "Biophics Tester", "biophics"),
                practitioner("p-2", "Lucy Demo", "demo"),
                practitioner("p-3", "Mosh Field", "mosh"),
            ],
            false,
        ));
        store.dispatch(fetch_practitioner_roles(
            vec![practitioner("p-1", "Biophics Tester", "biophics"), practitioner("p-2", "Lucy Demo", "demo")],
            "org-1",
            false,
        ));
        store.dispatch(fetch_practitioner_roles(
            vec![practitioner("p-2", "Lucy Demo", "demo")],
            "org-2",
            false,
        ));
        store
    }

    fn ids(practitioners: &[Practitioner]) -> Vec<&str> {
        practitioners.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn wire_payload_deserializes() {
        let parsed: Practitioner = serde_json::from_value(serde_json::json!({
            "identifier": "437cc699-cfa7-414c-ba27-1668b6b517e6",
            "active": true,
            "name": "tak tak",
            "userId": "cad04f1e-9b05-4eac-92ce-4b38aa478644",
            "username": "tak"
        }))
        .unwrap_or_else(|err| panic!("practitioner fixture: {err}"));
        assert_eq!(parsed.id(), "437cc699-cfa7-414c-ba27-1668b6b517e6");
        assert_eq!(parsed.user_id.as_deref(), Some("cad04f1e-9b05-4eac-92ce-4b38aa478644"));
    }

    #[test]
    fn roles_are_scoped_per_organization() {
        let mut store = seeded_store();
        let org_1 = get_practitioners_by_org_id(&store, "org-1").unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(ids(&org_1), vec!["p-1", "p-2"]);

        // Merge into org-2 leaves org-1 alone.
        store.dispatch(fetch_practitioner_roles(
            vec![practitioner("p-3", "Mosh Field", "mosh")],
            "org-2",
            false,
        ));
        let org_2 = get_practitioners_by_org_id(&store, "org-2").unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(ids(&org_2), vec!["p-2", "p-3"]);
        let org_1 = get_practitioners_by_org_id(&store, "org-1").unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(ids(&org_1), vec!["p-1", "p-2"]);

        // Overwrite replaces org-1's membership only.
        store.dispatch(fetch_practitioner_roles(
            vec![practitioner("p-3", "Mosh Field", "mosh")],
            "org-1",
            true,
        ));
        let org_1 = get_practitioners_by_org_id(&store, "org-1").unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(ids(&org_1), vec!["p-3"]);
        let org_2 = get_practitioners_by_org_id(&store, "org-2").unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(ids(&org_2), vec!["p-2", "p-3"]);
    }

    #[test]
    fn organization_prefix_does_not_leak_into_neighbours() {
        let mut store = Store::default();
        store.dispatch(fetch_practitioner_roles(vec![practitioner("p-1", "A", "a")], "org-1", false));
        store.dispatch(fetch_practitioner_roles(vec![practitioner("p-2", "B", "b")], "org-10", false));
        let org_1 = get_practitioners_by_org_id(&store, "org-1").unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(ids(&org_1), vec!["p-1"]);
        assert!(get_practitioners_by_org_id(&store, "org").unwrap_or_else(|err| panic!("{err}")).is_empty());
    }

    #[test]
    fn unassigned_excludes_any_member() {
        let store = seeded_store();
        let free = unassigned_practitioners(&store).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(ids(&free), vec!["p-3"]);
    }

    #[test]
    fn selector_combines_organization_and_name() {
        let mut store = seeded_store();
        let selector = make_practitioners_array_selector();
        let filters = PractitionerFilters {
            name: Some("DEMO".to_string()),
            organization_id: Some("org-1".to_string()),
            active_only: false,
        };
        let found = selector.select(&store, &filters).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(ids(&found), vec!["p-2"]);

        // Newer practitioner details win over the copy captured with the role.
        let mut renamed = practitioner("p-2", "Lucy Renamed", "demo");
        renamed.active = false;
        store.dispatch(fetch_practitioners(vec![renamed], false));
        let found = selector.select(&store, &filters).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(found[0].name, "Lucy Renamed");
        assert_eq!(selector.recomputations(), 2);

        let active_only = PractitionerFilters { active_only: true, ..filters };
        assert!(selector.select(&store, &active_only).unwrap_or_else(|err| panic!("{err}")).is_empty());
    }

    #[test]
    fn remove_clears_practitioners_and_roles() {
        let mut store = seeded_store();
        store.dispatch(REMOVE_PRACTITIONERS_ACTION);
        assert!(get_practitioners_array(&store).unwrap_or_else(|err| panic!("{err}")).is_empty());
        assert!(get_practitioner_roles(&store).unwrap_or_else(|err| panic!("{err}")).is_empty());
        assert!(get_practitioner_by_id(&store, "p-1").unwrap_or_else(|err| panic!("{err}")).is_none());
    }
}
