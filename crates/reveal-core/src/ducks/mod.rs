//! One module per cached resource, each holding its entity type, action
//! creators, slice reducer and selectors side by side.

pub mod files;
pub mod jurisdiction_metadata;
pub mod organizations;
pub mod plan_definitions;
pub mod plans;
pub mod plans_by_user;
pub mod practitioners;
