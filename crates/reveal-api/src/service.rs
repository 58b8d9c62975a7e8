use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

/// Query-string parameters for [`Service::list`].
pub type ListParams = BTreeMap<String, String>;

/// CRUD access to one remote endpoint, in raw JSON.
///
/// The store never talks to the network directly; loaders go through this
/// trait so tests can substitute an in-memory implementation.
pub trait Service {
    /// The endpoint path this service is bound to, for logging.
    fn endpoint(&self) -> &str;

    /// # Errors
    /// Transport failures, non-success statuses and undecodable bodies.
    fn list(&self, params: &ListParams) -> Result<Vec<Value>>;

    /// # Errors
    /// Transport failures, non-success statuses and undecodable bodies.
    fn read(&self, id: &str) -> Result<Value>;

    /// # Errors
    /// Transport failures, non-success statuses and undecodable bodies.
    fn create(&self, payload: &Value) -> Result<Value>;

    /// # Errors
    /// Transport failures, non-success statuses and undecodable bodies.
    fn update(&self, payload: &Value) -> Result<Value>;

    /// # Errors
    /// Transport failures and non-success statuses.
    fn delete(&self, payload: &Value) -> Result<()>;
}

/// Shared flag telling an in-flight load to drop its response.
///
/// Cloning shares the flag; cancelling any clone cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
