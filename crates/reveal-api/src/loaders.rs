//! Fetch-then-dispatch helpers: list from a [`Service`], decode, and hand the
//! batch to the store. A failed or cancelled load leaves the store untouched.

use anyhow::{Context, Result};
use reveal_core::ducks::files::{fetch_files, ManifestFile};
use reveal_core::ducks::jurisdiction_metadata::{fetch_jurisdictions_metadata, JurisdictionSetting};
use reveal_core::ducks::organizations::{fetch_organizations, Organization};
use reveal_core::ducks::plan_definitions::{fetch_plan_definitions, PlanDefinition};
use reveal_core::ducks::plans::{fetch_plan_records, fetch_plans, Plan, PlanRecord};
use reveal_core::ducks::plans_by_user::fetch_plans_by_user;
use reveal_core::ducks::practitioners::{
    fetch_practitioner_roles, fetch_practitioners, Practitioner,
};
use reveal_core::{Entity, Store};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::service::{CancellationToken, ListParams, Service};

/// What a loader did with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Number of entities handed to the store.
    Dispatched(usize),
    /// The token was cancelled while the request was in flight.
    Cancelled,
}

impl LoadOutcome {
    #[must_use]
    pub fn count(self) -> Option<usize> {
        match self {
            Self::Dispatched(count) => Some(count),
            Self::Cancelled => None,
        }
    }
}

/// List rows and stop early when the caller has gone away.
fn list_rows(
    service: &dyn Service,
    params: &ListParams,
    kind: &str,
    cancel: &CancellationToken,
) -> Result<Option<Vec<Value>>> {
    if cancel.is_cancelled() {
        tracing::warn!(kind, endpoint = service.endpoint(), "load cancelled before request");
        return Ok(None);
    }
    let rows = service.list(params).map_err(|err| {
        tracing::warn!(kind, endpoint = service.endpoint(), error = %err, "load failed");
        err
    })?;
    if cancel.is_cancelled() {
        tracing::warn!(kind, endpoint = service.endpoint(), rows = rows.len(), "load cancelled, response discarded");
        return Ok(None);
    }
    Ok(Some(rows))
}

/// Decode the whole batch or none of it.
fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>, kind: &str) -> Result<Vec<T>> {
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            serde_json::from_value(row).with_context(|| format!("failed to decode {kind} row {index}"))
        })
        .collect::<Result<Vec<T>>>()
        .map_err(|err| {
            tracing::warn!(kind, error = %err, "load failed");
            err
        })
}

fn load_entities<T: Entity>(
    service: &dyn Service,
    cancel: &CancellationToken,
) -> Result<Option<Vec<T>>> {
    let Some(rows) = list_rows(service, &ListParams::new(), T::KIND, cancel)? else {
        return Ok(None);
    };
    decode_rows(rows, T::KIND).map(Some)
}

fn dispatched(store: &mut Store, kind: &str, count: usize, action: reveal_core::Action) -> LoadOutcome {
    store.dispatch(action);
    tracing::info!(kind, count, "loaded");
    LoadOutcome::Dispatched(count)
}

/// # Errors
/// Service or decode failure; nothing is dispatched.
pub fn load_plans(
    service: &dyn Service,
    store: &mut Store,
    overwrite: bool,
    cancel: &CancellationToken,
) -> Result<LoadOutcome> {
    let Some(plans) = load_entities::<Plan>(service, cancel)? else {
        return Ok(LoadOutcome::Cancelled);
    };
    let count = plans.len();
    Ok(dispatched(store, Plan::KIND, count, fetch_plans(plans, overwrite)))
}

/// Loads plan definitions and derives their records for the list views.
///
/// # Errors
/// Service or decode failure; nothing is dispatched.
pub fn load_plan_definitions(
    service: &dyn Service,
    store: &mut Store,
    overwrite: bool,
    cancel: &CancellationToken,
) -> Result<LoadOutcome> {
    let Some(definitions) = load_entities::<PlanDefinition>(service, cancel)? else {
        return Ok(LoadOutcome::Cancelled);
    };
    let records = definitions.iter().map(PlanRecord::from_plan_definition).collect::<Vec<_>>();
    store.dispatch(fetch_plan_records(records, overwrite));
    let count = definitions.len();
    Ok(dispatched(store, PlanDefinition::KIND, count, fetch_plan_definitions(definitions, overwrite)))
}

/// # Errors
/// Service or decode failure; nothing is dispatched.
pub fn load_organizations(
    service: &dyn Service,
    store: &mut Store,
    overwrite: bool,
    cancel: &CancellationToken,
) -> Result<LoadOutcome> {
    let Some(organizations) = load_entities::<Organization>(service, cancel)? else {
        return Ok(LoadOutcome::Cancelled);
    };
    let count = organizations.len();
    Ok(dispatched(store, Organization::KIND, count, fetch_organizations(organizations, overwrite)))
}

/// # Errors
/// Service or decode failure; nothing is dispatched.
pub fn load_practitioners(
    service: &dyn Service,
    store: &mut Store,
    overwrite: bool,
    cancel: &CancellationToken,
) -> Result<LoadOutcome> {
    let Some(practitioners) = load_entities::<Practitioner>(service, cancel)? else {
        return Ok(LoadOutcome::Cancelled);
    };
    let count = practitioners.len();
    Ok(dispatched(store, Practitioner::KIND, count, fetch_practitioners(practitioners, overwrite)))
}

/// Replaces the membership of `organization_id` with the listed practitioners.
///
/// # Errors
/// Service or decode failure; nothing is dispatched.
pub fn load_practitioner_roles(
    service: &dyn Service,
    store: &mut Store,
    organization_id: &str,
    cancel: &CancellationToken,
) -> Result<LoadOutcome> {
    let Some(practitioners) = load_entities::<Practitioner>(service, cancel)? else {
        return Ok(LoadOutcome::Cancelled);
    };
    let count = practitioners.len();
    Ok(dispatched(
        store,
        "practitioner_role",
        count,
        fetch_practitioner_roles(practitioners, organization_id, true),
    ))
}

/// Plan ids from an assignment response: plan payloads carrying
/// `identifier`, `plan_id` or `id`, or bare id strings. Any other row fails
/// the batch, so an unreadable response is never mistaken for a user with
/// no assignments.
fn assigned_plan_ids(rows: &[Value]) -> Result<Vec<String>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let id = match row {
                Value::String(id) => Some(id.as_str()),
                Value::Object(fields) => ["identifier", "plan_id", "id"]
                    .iter()
                    .find_map(|key| fields.get(*key).and_then(Value::as_str)),
                _ => None,
            };
            id.map(str::to_string)
                .filter(|id| !id.trim().is_empty())
                .with_context(|| format!("failed to decode plans_by_user row {index}: no plan id in {row}"))
        })
        .collect()
}

/// Replaces `user_name`'s assignment set. Zero assignments are recorded too.
///
/// # Errors
/// Service failure or an assignment row without a plan id; nothing is
/// dispatched.
pub fn load_plans_by_user(
    service: &dyn Service,
    store: &mut Store,
    user_name: &str,
    cancel: &CancellationToken,
) -> Result<LoadOutcome> {
    let Some(rows) = list_rows(service, &ListParams::new(), "plans_by_user", cancel)? else {
        return Ok(LoadOutcome::Cancelled);
    };
    let plan_ids = assigned_plan_ids(&rows).map_err(|err| {
        tracing::warn!(user_name, error = %err, "plans_by_user load failed");
        err
    })?;
    let count = plan_ids.len();
    Ok(dispatched(store, "plans_by_user", count, fetch_plans_by_user(plan_ids, user_name, true)))
}

/// # Errors
/// Service or decode failure; nothing is dispatched.
pub fn load_files(
    service: &dyn Service,
    store: &mut Store,
    overwrite: bool,
    cancel: &CancellationToken,
) -> Result<LoadOutcome> {
    let Some(files) = load_entities::<ManifestFile>(service, cancel)? else {
        return Ok(LoadOutcome::Cancelled);
    };
    let count = files.len();
    Ok(dispatched(store, ManifestFile::KIND, count, fetch_files(files, overwrite)))
}

/// Setting documents nest their rows under `settings` and carry the metric
/// name once as `identifier`; flatten them into standalone rows.
#[must_use]
pub fn flatten_settings(rows: Vec<Value>) -> Vec<Value> {
    let mut flat = Vec::with_capacity(rows.len());
    for row in rows {
        let Value::Object(mut document) = row else {
            flat.push(row);
            continue;
        };
        let Some(Value::Array(settings)) = document.remove("settings") else {
            flat.push(Value::Object(document));
            continue;
        };
        let identifier = document.get("identifier").cloned();
        for setting in settings {
            match (setting, &identifier) {
                (Value::Object(mut fields), Some(identifier)) => {
                    if !fields.contains_key("settingIdentifier") {
                        fields.insert("settingIdentifier".to_string(), identifier.clone());
                    }
                    flat.push(Value::Object(fields));
                }
                (other, _) => flat.push(other),
            }
        }
    }
    flat
}

/// Zero rows is a valid outcome, reported as `Dispatched(0)`.
///
/// # Errors
/// Service or decode failure; nothing is dispatched.
pub fn load_jurisdictions_metadata(
    service: &dyn Service,
    store: &mut Store,
    overwrite: bool,
    cancel: &CancellationToken,
) -> Result<LoadOutcome> {
    let Some(rows) = list_rows(service, &ListParams::new(), "jurisdiction_metadata", cancel)?
    else {
        return Ok(LoadOutcome::Cancelled);
    };
    let settings = decode_rows::<JurisdictionSetting>(flatten_settings(rows), "jurisdiction_metadata")?;
    let count = settings.len();
    Ok(dispatched(
        store,
        "jurisdiction_metadata",
        count,
        fetch_jurisdictions_metadata(settings, overwrite),
    ))
}
