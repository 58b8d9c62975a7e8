use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::ducks::files::ManifestFile;
use crate::ducks::jurisdiction_metadata::{JurisdictionMetadata, MetadataKey};
use crate::ducks::organizations::Organization;
use crate::ducks::plan_definitions::PlanDefinition;
use crate::ducks::plans::{Plan, PlanRecord};
use crate::ducks::practitioners::Practitioner;
use crate::entity::ById;

/// Every state transition the store understands.
///
/// Fetch variants carry an already keyed map; `overwrite` selects between
/// upsert-merge (the default) and full replacement of the target map.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    FetchPlans { plans_by_id: ById<Plan>, overwrite: bool },
    FetchPlanRecords { plan_records_by_id: ById<PlanRecord>, overwrite: bool },
    RemovePlans,
    FetchPlanDefinitions { plan_definitions_by_id: ById<PlanDefinition>, overwrite: bool },
    RemovePlanDefinitions,
    FetchOrganizations { organizations_by_id: ById<Organization>, overwrite: bool },
    RemoveOrganizations,
    FetchPractitioners { practitioners_by_id: ById<Practitioner>, overwrite: bool },
    FetchPractitionerRoles {
        organization_id: String,
        practitioners_by_id: ById<Practitioner>,
        overwrite: bool,
    },
    RemovePractitioners,
    FetchFiles { files_by_id: ById<ManifestFile>, overwrite: bool },
    RemoveFiles,
    FetchJurisdictionsMetadata {
        metadata_by_key: BTreeMap<MetadataKey, JurisdictionMetadata>,
        overwrite: bool,
    },
    RemoveJurisdictionsMetadata,
    FetchPlansByUser { user_name: String, plan_ids: BTreeSet<String>, overwrite: bool },
    RemovePlansByUser,
}

impl Action {
    #[must_use]
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::FetchPlans { .. } => "reveal/plans/PLANS_FETCHED",
            Self::FetchPlanRecords { .. } => "reveal/plans/PLAN_RECORDS_FETCHED",
            Self::RemovePlans => "reveal/plans/REMOVE_PLANS",
            Self::FetchPlanDefinitions { .. } => "reveal/planDefinitions/PLAN_DEFINITIONS_FETCHED",
            Self::RemovePlanDefinitions => "reveal/planDefinitions/REMOVE_PLAN_DEFINITIONS",
            Self::FetchOrganizations { .. } => "reveal/organizations/ORGANIZATIONS_FETCHED",
            Self::RemoveOrganizations => "reveal/organizations/REMOVE_ORGANIZATIONS",
            Self::FetchPractitioners { .. } => "reveal/practitioners/PRACTITIONERS_FETCHED",
            Self::FetchPractitionerRoles { .. } => "reveal/practitioners/PRACTITIONER_ROLES_FETCHED",
            Self::RemovePractitioners => "reveal/practitioners/REMOVE_PRACTITIONERS",
            Self::FetchFiles { .. } => "reveal/files/FILES_FETCHED",
            Self::RemoveFiles => "reveal/files/REMOVE_FILES",
            Self::FetchJurisdictionsMetadata { .. } => {
                "reveal/jurisdictionMetadata/JURISDICTION_METADATA_FETCHED"
            }
            Self::RemoveJurisdictionsMetadata => {
                "reveal/jurisdictionMetadata/REMOVE_JURISDICTION_METADATA"
            }
            Self::FetchPlansByUser { .. } => "reveal/planIdsByUser/PLANS_BY_USER_FETCHED",
            Self::RemovePlansByUser => "reveal/planIdsByUser/REMOVE_PLANS_BY_USER",
        }
    }
}

/// Merge `incoming` into `current` by id, or replace it when `overwrite` is set.
///
/// Last write wins per id; ids absent from `incoming` survive a merge.
#[must_use]
pub fn merge_by_id<K: Ord + Clone, V: Clone>(
    current: &BTreeMap<K, V>,
    incoming: &BTreeMap<K, V>,
    overwrite: bool,
) -> BTreeMap<K, V> {
    if overwrite {
        return incoming.clone();
    }
    let mut merged = current.clone();
    merged.extend(incoming.iter().map(|(key, value)| (key.clone(), value.clone())));
    merged
}

/// Reducer-side merge: returns `current` itself when the result would be equal.
#[must_use]
pub fn merge_into<K: Ord + Clone, V: Clone + PartialEq>(
    current: &Arc<BTreeMap<K, V>>,
    incoming: &BTreeMap<K, V>,
    overwrite: bool,
) -> Arc<BTreeMap<K, V>> {
    let merged = merge_by_id(current, incoming, overwrite);
    if merged == **current {
        Arc::clone(current)
    } else {
        Arc::new(merged)
    }
}

/// Reducer-side clear: an already empty map keeps its pointer.
#[must_use]
pub fn cleared<K: Ord, V>(current: &Arc<BTreeMap<K, V>>) -> Arc<BTreeMap<K, V>> {
    if current.is_empty() {
        Arc::clone(current)
    } else {
        Arc::new(BTreeMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_absent_ids_and_updates_present_ones() {
        let current = BTreeMap::from([("a", 1), ("b", 2)]);
        let incoming = BTreeMap::from([("b", 20), ("c", 3)]);

        let merged = merge_by_id(&current, &incoming, false);
        assert_eq!(merged, BTreeMap::from([("a", 1), ("b", 20), ("c", 3)]));

        let replaced = merge_by_id(&current, &incoming, true);
        assert_eq!(replaced, incoming);
    }

    #[test]
    fn merge_into_reuses_pointer_when_nothing_changes() {
        let current = Arc::new(BTreeMap::from([("a", 1)]));
        let same = merge_into(&current, &BTreeMap::from([("a", 1)]), false);
        assert!(Arc::ptr_eq(&current, &same));

        let changed = merge_into(&current, &BTreeMap::from([("a", 2)]), false);
        assert!(!Arc::ptr_eq(&current, &changed));

        let empty: Arc<BTreeMap<&str, i32>> = Arc::new(BTreeMap::new());
        assert!(Arc::ptr_eq(&empty, &cleared(&empty)));
        assert!(cleared(&current).is_empty());
    }

    #[test]
    fn remove_actions_have_stable_types() {
        assert_eq!(Action::RemovePlans.action_type(), "reveal/plans/REMOVE_PLANS");
        assert_ne!(
            Action::RemoveOrganizations.action_type(),
            Action::RemovePractitioners.action_type()
        );
    }
}
