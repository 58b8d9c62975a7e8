use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::{cleared, merge_into, Action};
use crate::error::StoreError;
use crate::memo::{Memo, SliceRef};
use crate::registry::Reducer;
use crate::store::Store;

pub const REDUCER_NAME: &str = "jurisdictionMetadata";

pub const REMOVE_JURISDICTIONS_METADATA_ACTION: Action = Action::RemoveJurisdictionsMetadata;

const SETTING_IDENTIFIER_PREFIX: &str = "jurisdiction_metadata-";

/// One row of the `settings` endpoint for a jurisdiction metadata upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JurisdictionSetting {
    /// The jurisdiction id.
    pub key: String,
    pub value: MetricValue,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub setting_identifier: String,
    /// Older uploads carry the identifier here; newer ones use it for the
    /// row kind (`"Setting"`) alongside `settingIdentifier`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub setting_type: Option<String>,
}

impl JurisdictionSetting {
    /// `settingIdentifier` when present, else a prefixed `type`.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        let explicit = self.setting_identifier.trim();
        if !explicit.is_empty() {
            return Some(explicit);
        }
        self.setting_type
            .as_deref()
            .map(str::trim)
            .filter(|kind| kind.starts_with(SETTING_IDENTIFIER_PREFIX))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetricValue {
    Numeric(f64),
    Categorical(String),
}

impl MetricValue {
    /// Settings store every value as a string; numeric-looking strings are
    /// promoted so consumers can compare them.
    #[must_use]
    pub fn normalized(self) -> Self {
        match self {
            Self::Categorical(raw) => match raw.trim().parse::<f64>() {
                Ok(number) if number.is_finite() => Self::Numeric(number),
                _ => Self::Categorical(raw),
            },
            numeric @ Self::Numeric(_) => numeric,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(number) => Some(*number),
            Self::Categorical(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(number) => write!(f, "{number}"),
            Self::Categorical(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MetadataKey {
    pub jurisdiction_id: String,
    pub metric: String,
}

impl MetadataKey {
    #[must_use]
    pub fn new(jurisdiction_id: &str, metric: &str) -> Self {
        Self { jurisdiction_id: jurisdiction_id.to_string(), metric: metric.to_string() }
    }
}

/// A single metric (risk, population, coverage, ...) for one jurisdiction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JurisdictionMetadata {
    pub jurisdiction_id: String,
    pub metric: String,
    pub value: MetricValue,
}

impl JurisdictionMetadata {
    /// Returns `None` for rows that name no metric.
    #[must_use]
    pub fn from_setting(setting: JurisdictionSetting) -> Option<Self> {
        let identifier = setting.identifier()?;
        let metric =
            identifier.strip_prefix(SETTING_IDENTIFIER_PREFIX).unwrap_or(identifier).trim().to_string();
        if metric.is_empty() || setting.key.trim().is_empty() {
            return None;
        }
        Some(Self { jurisdiction_id: setting.key, metric, value: setting.value.normalized() })
    }

    #[must_use]
    pub fn key(&self) -> MetadataKey {
        MetadataKey::new(&self.jurisdiction_id, &self.metric)
    }
}

pub type MetadataByKey = BTreeMap<MetadataKey, JurisdictionMetadata>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JurisdictionMetadataState {
    pub metadata_by_key: Arc<MetadataByKey>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JurisdictionMetadataReducer;

impl Reducer for JurisdictionMetadataReducer {
    type State = JurisdictionMetadataState;

    fn initial_state(&self) -> Self::State {
        JurisdictionMetadataState::default()
    }

    fn reduce(&self, state: &Arc<Self::State>, action: &Action) -> Arc<Self::State> {
        let next = match action {
            Action::FetchJurisdictionsMetadata { metadata_by_key, overwrite } => {
                merge_into(&state.metadata_by_key, metadata_by_key, *overwrite)
            }
            Action::RemoveJurisdictionsMetadata => cleared(&state.metadata_by_key),
            _ => return Arc::clone(state),
        };
        if Arc::ptr_eq(&next, &state.metadata_by_key) {
            Arc::clone(state)
        } else {
            Arc::new(JurisdictionMetadataState { metadata_by_key: next })
        }
    }
}

/// Normalize settings rows and key them by `(jurisdiction, metric)`.
#[must_use]
pub fn fetch_jurisdictions_metadata(
    settings: impl IntoIterator<Item = JurisdictionSetting>,
    overwrite: bool,
) -> Action {
    let mut metadata_by_key = MetadataByKey::new();
    for setting in settings {
        let identifier = setting.identifier().unwrap_or_default().to_string();
        match JurisdictionMetadata::from_setting(setting) {
            Some(metadata) => {
                metadata_by_key.insert(metadata.key(), metadata);
            }
            None => tracing::warn!(setting_identifier = %identifier, "skipping metadata row without jurisdiction or metric"),
        }
    }
    Action::FetchJurisdictionsMetadata { metadata_by_key, overwrite }
}

/// # Errors
/// Returns [`StoreError`] when the metadata slice is not registered.
pub fn get_jurisdictions_metadata_by_key(store: &Store) -> Result<Arc<MetadataByKey>, StoreError> {
    Ok(Arc::clone(&store.slice::<JurisdictionMetadataState>(REDUCER_NAME)?.metadata_by_key))
}

/// # Errors
/// Returns [`StoreError`] when the metadata slice is not registered.
pub fn get_jurisdictions_metadata_array(
    store: &Store,
) -> Result<Vec<JurisdictionMetadata>, StoreError> {
    Ok(get_jurisdictions_metadata_by_key(store)?.values().cloned().collect())
}

/// Every metric recorded for one jurisdiction, in metric order.
///
/// # Errors
/// Returns [`StoreError`] when the metadata slice is not registered.
pub fn get_metadata_for_jurisdiction(
    store: &Store,
    jurisdiction_id: &str,
) -> Result<Vec<JurisdictionMetadata>, StoreError> {
    let by_key = get_jurisdictions_metadata_by_key(store)?;
    Ok(by_key
        .range(MetadataKey::new(jurisdiction_id, "")..)
        .take_while(|(key, _)| key.jurisdiction_id == jurisdiction_id)
        .map(|(_, metadata)| metadata.clone())
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilters {
    pub metric: Option<String>,
    pub jurisdiction_ids: Option<Vec<String>>,
}

impl MetadataFilters {
    fn matches(&self, metadata: &JurisdictionMetadata) -> bool {
        self.metric.as_deref().map_or(true, |metric| metadata.metric.eq_ignore_ascii_case(metric))
            && self
                .jurisdiction_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&metadata.jurisdiction_id))
    }
}

#[derive(Debug, Default)]
pub struct JurisdictionsMetadataSelector {
    memo: Memo<(SliceRef<MetadataByKey>, MetadataFilters), Arc<Vec<JurisdictionMetadata>>>,
}

impl JurisdictionsMetadataSelector {
    /// An empty result is a valid answer (no metadata uploaded yet), not an error.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the metadata slice is not registered.
    pub fn select(
        &self,
        store: &Store,
        filters: &MetadataFilters,
    ) -> Result<Arc<Vec<JurisdictionMetadata>>, StoreError> {
        let by_key = get_jurisdictions_metadata_by_key(store)?;
        Ok(self.memo.get_or_compute((SliceRef(by_key), filters.clone()), |(SliceRef(by_key), filters)| {
            Arc::new(by_key.values().filter(|metadata| filters.matches(metadata)).cloned().collect())
        }))
    }

    #[must_use]
    pub fn recomputations(&self) -> u64 {
        self.memo.recomputations()
    }
}

#[must_use]
pub fn make_jurisdictions_metadata_selector() -> JurisdictionsMetadataSelector {
    JurisdictionsMetadataSelector::default()
}
