#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum StoreError {
    #[error("slice `{0}` is not registered; register its reducer before creating the store")]
    SliceNotRegistered(String),
    #[error("slice `{slice}` does not hold state of type {expected}")]
    SliceTypeMismatch { slice: String, expected: &'static str },
}
