//! Organisation hierarchy service for an HRMS: companies, zones, branches,
//! departments, sub-departments, designations and employee levels, with
//! ordered siblings, cycle-safe re-parenting and guarded deletion.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod hierarchy;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::{build_router, AppState, Application};
