use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::{cleared, merge_into, Action};
use crate::entity::{key_by_id, ById, Entity};
use crate::error::StoreError;
use crate::registry::Reducer;
use crate::selector::{matches_text, ArraySelector, EntityFilter};
use crate::store::Store;

pub const REDUCER_NAME: &str = "files";

pub const REMOVE_FILES_ACTION: Action = Action::RemoveFiles;

/// An uploaded manifest or client list.
///
/// Older upload endpoints report `lastUpdated`/`providerID`; both spellings
/// land on the same fields.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFile {
    #[serde(rename = "identifier")]
    pub id: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default, alias = "lastUpdated")]
    pub upload_date: Option<String>,
    #[serde(default, alias = "providerID")]
    pub owner: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<String>,
}

impl Entity for ManifestFile {
    const KIND: &'static str = "file";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilesState {
    pub files_by_id: Arc<ById<ManifestFile>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilesReducer;

impl Reducer for FilesReducer {
    type State = FilesState;

    fn initial_state(&self) -> Self::State {
        FilesState::default()
    }

    fn reduce(&self, state: &Arc<Self::State>, action: &Action) -> Arc<Self::State> {
        let next = match action {
            Action::FetchFiles { files_by_id, overwrite } => {
                merge_into(&state.files_by_id, files_by_id, *overwrite)
            }
            Action::RemoveFiles => cleared(&state.files_by_id),
            _ => return Arc::clone(state),
        };
        if Arc::ptr_eq(&next, &state.files_by_id) {
            Arc::clone(state)
        } else {
            Arc::new(FilesState { files_by_id: next })
        }
    }
}

#[must_use]
pub fn fetch_files(files: impl IntoIterator<Item = ManifestFile>, overwrite: bool) -> Action {
    Action::FetchFiles { files_by_id: key_by_id(files), overwrite }
}

/// # Errors
/// Returns [`StoreError`] when the files slice is not registered.
pub fn get_files_by_id(store: &Store) -> Result<Arc<ById<ManifestFile>>, StoreError> {
    Ok(Arc::clone(&store.slice::<FilesState>(REDUCER_NAME)?.files_by_id))
}

/// # Errors
/// Returns [`StoreError`] when the files slice is not registered.
pub fn get_file_by_id(store: &Store, id: &str) -> Result<Option<ManifestFile>, StoreError> {
    Ok(get_files_by_id(store)?.get(id).cloned())
}

/// # Errors
/// Returns [`StoreError`] when the files slice is not registered.
pub fn get_files_array(store: &Store) -> Result<Vec<ManifestFile>, StoreError> {
    Ok(get_files_by_id(store)?.values().cloned().collect())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilters {
    pub file_name: Option<String>,
}

impl EntityFilter<ManifestFile> for FileFilters {
    fn matches(&self, file: &ManifestFile) -> bool {
        matches_text(Some(&file.file_name), self.file_name.as_deref())
    }
}

#[must_use]
pub fn make_files_array_selector() -> ArraySelector<ManifestFile, FileFilters> {
    ArraySelector::new(get_files_by_id)
}
