//! OpenSRP access for the Reveal store: the [`Service`] contract, its HTTP
//! implementation, and loaders that fetch a resource and dispatch it.

pub mod config;
pub mod http;
pub mod loaders;
pub mod service;

pub use config::{ApiConfig, Endpoints};
pub use http::{OpenSrpClient, OpenSrpService};
pub use loaders::{
    flatten_settings, load_files, load_jurisdictions_metadata, load_organizations,
    load_plan_definitions, load_plans, load_plans_by_user, load_practitioner_roles,
    load_practitioners, LoadOutcome,
};
pub use service::{CancellationToken, ListParams, Service};
