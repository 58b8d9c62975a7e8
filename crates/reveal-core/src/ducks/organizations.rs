use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::{cleared, merge_into, Action};
use crate::entity::{key_by_id, ById, Entity};
use crate::error::StoreError;
use crate::registry::Reducer;
use crate::selector::{matches_text, ArraySelector, EntityFilter};
use crate::store::Store;

pub const REDUCER_NAME: &str = "organizations";

pub const REMOVE_ORGANIZATIONS_ACTION: Action = Action::RemoveOrganizations;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Coding {
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct CodeableConcept {
    #[serde(default)]
    pub coding: Vec<Coding>,
}

/// A team of practitioners.
///
/// `id` is the stable UUID (`identifier` on the wire); `server_id` is the
/// numeric row id OpenSRP assigns, which `part_of` refers to.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Organization {
    #[serde(rename = "identifier")]
    pub id: String,
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub organization_type: Option<CodeableConcept>,
    #[serde(rename = "partOf", default, skip_serializing_if = "Option::is_none")]
    pub part_of: Option<u64>,
}

fn default_active() -> bool {
    true
}

impl Entity for Organization {
    const KIND: &'static str = "organization";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrganizationsState {
    pub organizations_by_id: Arc<ById<Organization>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrganizationsReducer;

impl Reducer for OrganizationsReducer {
    type State = OrganizationsState;

    fn initial_state(&self) -> Self::State {
        OrganizationsState::default()
    }

    fn reduce(&self, state: &Arc<Self::State>, action: &Action) -> Arc<Self::State> {
        let next = match action {
            Action::FetchOrganizations { organizations_by_id, overwrite } => {
                merge_into(&state.organizations_by_id, organizations_by_id, *overwrite)
            }
            Action::RemoveOrganizations => cleared(&state.organizations_by_id),
            _ => return Arc::clone(state),
        };
        if Arc::ptr_eq(&next, &state.organizations_by_id) {
            Arc::clone(state)
        } else {
            Arc::new(OrganizationsState { organizations_by_id: next })
        }
    }
}

#[must_use]
pub fn fetch_organizations(
    organizations: impl IntoIterator<Item = Organization>,
    overwrite: bool,
) -> Action {
    Action::FetchOrganizations { organizations_by_id: key_by_id(organizations), overwrite }
}

/// # Errors
/// Returns [`StoreError`] when the organizations slice is not registered.
pub fn get_organizations_by_id(store: &Store) -> Result<Arc<ById<Organization>>, StoreError> {
    Ok(Arc::clone(&store.slice::<OrganizationsState>(REDUCER_NAME)?.organizations_by_id))
}

/// # Errors
/// Returns [`StoreError`] when the organizations slice is not registered.
pub fn get_organization_by_id(store: &Store, id: &str) -> Result<Option<Organization>, StoreError> {
    Ok(get_organizations_by_id(store)?.get(id).cloned())
}

/// # Errors
/// Returns [`StoreError`] when the organizations slice is not registered.
pub fn get_organizations_array(store: &Store) -> Result<Vec<Organization>, StoreError> {
    Ok(get_organizations_by_id(store)?.values().cloned().collect())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationFilters {
    pub name: Option<String>,
    pub ids: Option<Vec<String>>,
    pub active_only: bool,
}

impl EntityFilter<Organization> for OrganizationFilters {
    fn matches(&self, organization: &Organization) -> bool {
        matches_text(Some(&organization.name), self.name.as_deref())
            && self.ids.as_ref().map_or(true, |ids| ids.contains(&organization.id))
            && (!self.active_only || organization.active)
    }
}

#[must_use]
pub fn make_organizations_array_selector() -> ArraySelector<Organization, OrganizationFilters> {
    ArraySelector::new(get_organizations_by_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn organization_json(identifier: &str, id: u64, name: &str, active: bool) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "identifier": identifier,
            "active": active,
            "name": name,
            "partOf": 1,
            "type": {
                "coding": [{
                    "system": "http://terminology.hl7.org/CodeSystem/organization-type",
                    "code": "team",
                    "display": "Team"
                }]
            }
        })
    }

    fn organizations() -> Vec<Organization> {
        [
            organization_json("fcc19470-d599-11e9-bb65-2a2ae2dbcce4", 1, "The Luang", true),
            organization_json("4c506c98-d3a9-11e9-bb65-2a2ae2dbcce4", 2, "Demo Team", true),
            organization_json("d23f7350-d3a8-11e9-bb65-2a2ae2dbcce4", 3, "Disbanded Team", false),
        ]
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).unwrap_or_else(|err| panic!("organization fixture: {err}"))
        })
        .collect()
    }

    #[test]
    fn wire_identifier_becomes_id() {
        let org = &organizations()[0];
        assert_eq!(org.id(), "fcc19470-d599-11e9-bb65-2a2ae2dbcce4");
        assert_eq!(org.server_id, Some(1));
        assert_eq!(org.part_of, Some(1));
        let code = org
            .organization_type
            .as_ref()
            .and_then(|concept| concept.coding.first())
            .and_then(|coding| coding.code.as_deref());
        assert_eq!(code, Some("team"));
    }

    #[test]
    fn refetching_an_edited_team_updates_in_place() {
        let mut store = Store::default();
        store.dispatch(fetch_organizations(organizations(), false));

        let mut renamed = organizations()[1].clone();
        renamed.name = "Demo Team (renamed)".to_string();
        store.dispatch(fetch_organizations(vec![renamed], false));

        let all = get_organizations_array(&store).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(all.len(), 3);
        let edited = get_organization_by_id(&store, "4c506c98-d3a9-11e9-bb65-2a2ae2dbcce4")
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(edited.map(|org| org.name), Some("Demo Team (renamed)".to_string()));
    }

    #[test]
    fn selector_filters_by_name_and_activity() {
        let mut store = Store::default();
        store.dispatch(fetch_organizations(organizations(), false));
        let selector = make_organizations_array_selector();

        let teams = selector
            .select(
                &store,
                &OrganizationFilters { name: Some("TEAM".to_string()), ..OrganizationFilters::default() },
            )
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(teams.len(), 2);

        let active_teams = selector
            .select(
                &store,
                &OrganizationFilters {
                    name: Some("team".to_string()),
                    ids: None,
                    active_only: true,
                },
            )
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(active_teams.len(), 1);
        assert_eq!(active_teams[0].name, "Demo Team");
        assert_eq!(
            format!("{selector:?}"),
            "ArraySelector { recomputations: 2, .. }"
        );
    }

    #[test]
    fn remove_empties_the_slice() {
        let mut store = Store::default();
        store.dispatch(fetch_organizations(organizations(), false));
        assert!(store.dispatch(REMOVE_ORGANIZATIONS_ACTION));
        assert!(get_organizations_by_id(&store).unwrap_or_else(|err| panic!("{err}")).is_empty());
    }
}
