//! Normalized client-side cache for Reveal field-operations data.
//!
//! Entities fetched from OpenSRP are kept in per-slice by-id maps owned by a
//! [`Store`]. Each slice is driven by a [`Reducer`] registered up front in a
//! [`ReducerRegistry`], and read back through memoized selectors that only
//! recompute when the map they read or their filter criteria change.

pub mod action;
pub mod ducks;
pub mod entity;
pub mod error;
pub mod memo;
pub mod registry;
pub mod selector;
pub mod sort;
pub mod store;

pub use action::Action;
pub use entity::{key_by_id, ById, Entity, FiReason, FiStatus, InterventionType, PlanStatus};
pub use error::StoreError;
pub use memo::{Memo, SliceRef};
pub use registry::{Reducer, ReducerRegistry};
pub use selector::{ArraySelector, EntityFilter};
pub use store::{Store, StoreChange, SubscriptionId};
